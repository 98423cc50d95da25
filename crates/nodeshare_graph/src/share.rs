// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export and import pipeline.
//!
//! Export: host tree -> document -> container text.
//! Import: text -> document -> version fix -> host tree.

use crate::builder::{BuildReport, BuildTarget, GraphBuilder, GraphSink};
use crate::channel::TextChannel;
use crate::compat::{self, FixReport, HostVersion};
use crate::container::{self, DecodeLimits};
use crate::document::TreeDocument;
use crate::error::{DecodeError, EncodeError, Result};
use crate::extract::{extract_material, extract_tree, HostTree};
use crate::settings::ShareSettings;

/// Container text for a node tree.
pub fn export_tree<T: HostTree>(tree: &T, producer: HostVersion, settings: &ShareSettings) -> Result<String> {
    let document = extract_tree(tree);
    Ok(container::encode(&document, producer, settings.encode_options())?)
}

/// Container text for the node tree of a material.
pub fn export_material<T: HostTree>(
    name: &str,
    tree: &T,
    producer: HostVersion,
    settings: &ShareSettings,
) -> Result<String> {
    let document = extract_material(name, tree);
    Ok(container::encode(&document, producer, settings.encode_options())?)
}

/// Bare JSON document for a node tree, indented when `pretty`.
pub fn export_json<T: HostTree>(tree: &T, pretty: bool) -> Result<String> {
    let document = extract_tree(tree);
    let text = if pretty {
        document.to_json_pretty()
    } else {
        document.to_json_compact()
    };
    Ok(text.map_err(EncodeError::from)?)
}

/// A decoded document and the version that wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Producer version; bare JSON documents carry none
    pub producer: Option<HostVersion>,
    /// The document as written
    pub document: TreeDocument,
}

/// Decode a container or a bare JSON document.
pub fn decode_text(text: &str, limits: DecodeLimits) -> std::result::Result<Decoded, DecodeError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        let document = TreeDocument::from_json(trimmed)?;
        return Ok(Decoded {
            producer: None,
            document,
        });
    }
    let (producer, document) = container::decode(trimmed, limits)?;
    Ok(Decoded {
        producer: Some(producer),
        document,
    })
}

/// Result of an import.
#[derive(Debug)]
pub struct Imported<T> {
    /// Version that wrote the document, if known
    pub producer: Option<HostVersion>,
    /// What the version fix did
    pub fix: FixReport,
    /// The built top-level tree
    pub tree: T,
    /// What the build did
    pub build: BuildReport,
}

/// Decode `text`, fix it for `settings.host_version` and build it.
pub fn import<S: GraphSink>(
    text: &str,
    settings: &ShareSettings,
    sink: &mut S,
    target: BuildTarget<S::Tree>,
) -> Result<Imported<S::Tree>> {
    let Decoded { producer, mut document } = decode_text(text, settings.decode_limits())?;

    let fix = match producer {
        Some(producer) => compat::fix(producer, settings.host_version, &mut document),
        None => {
            tracing::debug!("Document {:?} has no producer version, not migrating", document.name);
            FixReport::default()
        }
    };
    for skipped in &fix.skipped {
        tracing::warn!("{}", skipped);
    }

    let (tree, build) = GraphBuilder::new(sink)
        .clear_target(settings.clear_target)
        .build(&document, target)?;
    Ok(Imported {
        producer,
        fix,
        tree,
        build,
    })
}

/// Export a node tree into a text channel.
pub fn copy_tree<T: HostTree, C: TextChannel>(
    tree: &T,
    producer: HostVersion,
    settings: &ShareSettings,
    channel: &mut C,
) -> Result<()> {
    let text = export_tree(tree, producer, settings)?;
    channel.write_text(&text)?;
    Ok(())
}

/// Export a material's node tree into a text channel.
pub fn copy_material<T: HostTree, C: TextChannel>(
    name: &str,
    tree: &T,
    producer: HostVersion,
    settings: &ShareSettings,
    channel: &mut C,
) -> Result<()> {
    let text = export_material(name, tree, producer, settings)?;
    channel.write_text(&text)?;
    Ok(())
}

/// Import whatever a text channel holds into a new tree.
pub fn paste<S: GraphSink, C: TextChannel>(
    channel: &mut C,
    settings: &ShareSettings,
    sink: &mut S,
) -> Result<Imported<S::Tree>> {
    let text = channel.read_text()?;
    import(&text, settings, sink, BuildTarget::New)
}
