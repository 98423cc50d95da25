// SPDX-License-Identifier: MIT OR Apache-2.0
//! Share node trees as compact, versioned text.
//!
//! This crate turns a live node tree into a portable string and back:
//! - Property extraction from host objects into sparse documents
//! - JSON documents with nodes, links, groups and interface items
//! - A `NS<format>B<version>!` container around deflated, base64 payloads
//! - Socket index migrations between host versions
//! - Best-effort reconstruction through a host sink
//!
//! ## Architecture
//!
//! The host is reached only through traits: [`HostTree`]/[`HostNode`] to
//! read a live tree and [`GraphSink`] to build one. Everything between is
//! plain data:
//!
//! ```text
//! host -> extract -> TreeDocument -> container -> text
//! text -> container -> TreeDocument -> compat::fix -> builder -> host
//! ```
//!
//! Hard failures are limited to decoding ([`DecodeError`]). Migration and
//! build problems with single items are collected into [`FixReport`] and
//! [`BuildReport`] while the rest of the document goes through.

pub mod builder;
pub mod channel;
pub mod compat;
pub mod container;
pub mod document;
pub mod error;
pub mod extract;
pub mod settings;
pub mod share;
pub mod value;

#[cfg(test)]
mod test_support;

pub use builder::{build, BuildReport, BuildTarget, GraphBuilder, GraphSink};
pub use channel::{Clipboard, FileChannel, TextChannel};
pub use compat::{fix, CompatFixer, FixReport, HostVersion, Migration, MIGRATIONS};
pub use container::{decode, encode, DecodeLimits, EncodeOptions};
pub use document::{ColorRamp, ColorStop, CurveMapping, LinkTarget, NodeDocument, TreeDocument};
pub use error::{
    BuildIssue, DecodeError, EncodeError, FormatError, MigrationError, ReferenceError, Result, SchemaError,
    ShareError, SinkError,
};
pub use extract::{extract_material, extract_tree, HostNode, HostTree, InterfaceItemView, LinkView, SocketView};
pub use settings::ShareSettings;
pub use share::{
    copy_material, copy_tree, decode_text, export_json, export_material, export_tree, import, paste, Decoded,
    Imported,
};
pub use value::{HostValue, ObjectRef, Value};
