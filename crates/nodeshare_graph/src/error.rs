// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for encoding, decoding, migrating and rebuilding node trees.
//!
//! Decoding has exactly two hard failure domains, [`FormatError`] and
//! [`SchemaError`]. Everything that can go wrong while migrating or
//! rebuilding a single item is soft: it is collected into a report
//! ([`MigrationError`] inside a fix report, [`BuildIssue`] inside a build
//! report) and the rest of the batch carries on.

use thiserror::Error;

/// The container text could not be unwrapped into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The text does not start with the `NS` tag.
    #[error("invalid magic: expected text starting with \"NS\", found {found:?}")]
    InvalidMagic {
        /// First characters of the rejected text
        found: String,
    },

    /// The `NS<format>B<version>!` header is malformed.
    #[error("malformed container prefix {prefix:?}: {reason}")]
    MalformedPrefix {
        /// The prefix as far as it could be isolated
        prefix: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// The payload is not valid base64.
    #[error("payload is not valid base64: {0}")]
    Base64(String),

    /// The payload is not a valid zlib stream.
    #[error("payload could not be inflated: {0}")]
    Inflate(String),

    /// The inflated payload exceeds the configured limit.
    #[error("inflated payload exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Limit in bytes
        limit: usize,
    },

    /// The inflated payload is not UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(String),

    /// The payload is not syntactically valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(String),
}

/// The JSON parsed, but it is not a node tree document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A required field is absent.
    #[error("document is missing required field `{field}`")]
    MissingField {
        /// Field name
        field: String,
    },

    /// A field has the wrong shape (type or structure).
    #[error("document field has the wrong shape: {0}")]
    WrongShape(String),

    /// A node was stored with an empty name.
    #[error("node in tree {tree:?} has an empty name")]
    EmptyName {
        /// Owning tree
        tree: String,
    },

    /// A node is stored under a key other than its own name.
    #[error("node {name:?} in tree {tree:?} is stored under key {key:?}")]
    NodeKeyMismatch {
        /// Owning tree
        tree: String,
        /// Key in the `nodes` map
        key: String,
        /// The node's `name` field
        name: String,
    },
}

/// Hard failure of the decode path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Container/framing failure
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Document shape failure
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failure while producing a container.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The document could not be serialized.
    #[error("document could not be serialized: {0}")]
    Json(#[from] serde_json::Error),

    /// The zlib stream could not be written.
    #[error("payload could not be deflated: {0}")]
    Deflate(#[from] std::io::Error),
}

/// A migration could not be applied to one node; the node is left as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// The node holds a slot the migration does not expect to exist.
    #[error("{migration}: node {node:?} has input slot {slot}, expected fewer than {expected}")]
    SlotOutOfRange {
        /// Migration name
        migration: &'static str,
        /// Node name
        node: String,
        /// Offending slot
        slot: usize,
        /// Number of slots the migration expects
        expected: usize,
    },

    /// A link pointed at a slot that does not exist in the older layout.
    #[error("{migration}: dropped link {from:?}[{output}] -> {to:?}[{slot}], slot removed")]
    RemovedSlotLinked {
        /// Migration name
        migration: &'static str,
        /// Source node
        from: String,
        /// Source output index
        output: usize,
        /// Target node
        to: String,
        /// Removed target slot
        slot: usize,
    },
}

/// What a host sink reports when one operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The node type is unknown to the host.
    #[error("unknown node type {0:?}")]
    UnknownType(String),

    /// The socket index does not exist on the node.
    #[error("no socket at index {0}")]
    NoSuchSocket(usize),

    /// The attribute cannot be written.
    #[error("attribute {0:?} is read-only")]
    ReadOnly(String),

    /// The value does not fit the target.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Any other refusal.
    #[error("{0}")]
    Rejected(String),
}

/// A name reference could not be resolved during a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// A link points at a node that was not built.
    #[error("link {from:?}[{output}] -> {to:?}[{input}] targets an unknown node")]
    LinkTarget {
        /// Source node
        from: String,
        /// Source output
        output: usize,
        /// Missing target node
        to: String,
        /// Target input
        input: usize,
    },

    /// A link comes from a node that was not built.
    #[error("link source {from:?} was not built")]
    LinkSource {
        /// Missing source node
        from: String,
    },

    /// A parent frame is absent.
    #[error("node {node:?} names parent {parent:?}, which does not exist")]
    Parent {
        /// Child node
        node: String,
        /// Missing parent
        parent: String,
    },

    /// A group node names a subtree that was not built.
    #[error("node {node:?} names group {group:?}, which does not exist")]
    Group {
        /// Group node
        node: String,
        /// Missing group
        group: String,
    },
}

/// A value could not be applied to a built node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{target} on {node:?}: {source}")]
pub struct PropertyApplyError {
    /// Node (or tree, for interface items) the value belongs to
    pub node: String,
    /// What was being set, e.g. `inputs[3]` or `attribute label`
    pub target: String,
    /// Host refusal
    pub source: SinkError,
}

/// One skipped item in a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildIssue {
    /// Unresolved name reference
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Value the host refused
    #[error(transparent)]
    PropertyApply(#[from] PropertyApplyError),

    /// A node (or tree) could not be created at all
    #[error("could not create {what} {name:?}: {source}")]
    Create {
        /// `node` or `group`
        what: &'static str,
        /// Name from the document
        name: String,
        /// Host refusal
        source: SinkError,
    },

    /// A link the host refused
    #[error("link {from:?}[{output}] -> {to:?}[{input}] failed: {source}")]
    Link {
        /// Source node
        from: String,
        /// Source output
        output: usize,
        /// Target node
        to: String,
        /// Target input
        input: usize,
        /// Host refusal
        source: SinkError,
    },
}

/// Failure of a text channel (clipboard or file).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Underlying I/O failure
    #[error("text channel I/O failed for {path}: {source}")]
    Io {
        /// Path involved
        path: String,
        /// Cause
        source: std::io::Error,
    },

    /// The clipboard holds nothing.
    #[error("clipboard is empty")]
    Empty,
}

/// Failure loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying I/O failure
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// RON syntax or shape failure
    #[error("settings could not be parsed: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization failure
    #[error("settings could not be written: {0}")]
    Write(#[from] ron::Error),

    /// The file was written by a newer version of this crate
    #[error("settings version {found} is newer than supported version {supported}")]
    NewerFormat {
        /// Version in the file
        found: u32,
        /// Newest version this crate reads
        supported: u32,
    },
}

/// Top-level error of the export/import pipeline.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Decode failure
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Encode failure
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Channel failure
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The target tree could not be created
    #[error(transparent)]
    Build(#[from] BuildIssue),
}

impl From<FormatError> for ShareError {
    fn from(e: FormatError) -> Self {
        Self::Decode(DecodeError::Format(e))
    }
}

impl From<SchemaError> for ShareError {
    fn from(e: SchemaError) -> Self {
        Self::Decode(DecodeError::Schema(e))
    }
}

/// Result type for the share pipeline
pub type Result<T> = std::result::Result<T, ShareError>;
