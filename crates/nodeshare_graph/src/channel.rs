// SPDX-License-Identifier: MIT OR Apache-2.0
//! Text channels: where encoded documents are read from and written to.

use std::path::{Path, PathBuf};

use crate::error::ChannelError;

/// A place a text blob can be written to and read back from.
pub trait TextChannel {
    /// Read the whole blob.
    fn read_text(&mut self) -> Result<String, ChannelError>;

    /// Replace the blob.
    fn write_text(&mut self, text: &str) -> Result<(), ChannelError>;
}

/// A text file.
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    /// Channel over `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ChannelError {
        ChannelError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl TextChannel for FileChannel {
    fn read_text(&mut self) -> Result<String, ChannelError> {
        std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))
    }

    fn write_text(&mut self, text: &str) -> Result<(), ChannelError> {
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))?;
        tracing::info!("Wrote {} bytes to {}", text.len(), self.path.display());
        Ok(())
    }
}

/// An in-process clipboard.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    contents: Option<String>,
}

impl Clipboard {
    /// An empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, if any.
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl TextChannel for Clipboard {
    fn read_text(&mut self) -> Result<String, ChannelError> {
        self.contents.clone().ok_or(ChannelError::Empty)
    }

    fn write_text(&mut self, text: &str) -> Result<(), ChannelError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
