// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory node graph host for nodeshare.
//!
//! This crate provides a live node graph that the share codec can read
//! from and build into:
//! - Typed sockets with default values
//! - Connections, parent frames and group trees
//! - Color ramps, curve mappings and tree interfaces
//! - Node catalogs laid out like specific host releases
//!
//! ## Architecture
//!
//! [`MemoryHost`] owns every tree. [`TreeView`] and [`NodeView`] implement
//! the codec's read traits over it, and `MemoryHost` itself implements
//! [`nodeshare_graph::GraphSink`], so a tree can be exported from one host
//! and imported into another of a different version.

pub mod catalog;
pub mod connection;
pub mod graph;
pub mod host;
pub mod node;
pub mod socket;

pub use catalog::Catalog;
pub use connection::{Connection, ConnectionId};
pub use graph::{InOut, InterfaceItem, MemoryTree, TreeError, TreeId};
pub use host::{MemoryHost, NodeRef, NodeView, TreeView};
pub use node::{Node, NodeBehavior, NodeCategory, NodeId, NodeRegistry, NodeType};
pub use socket::{Socket, SocketDirection, SocketKind};
