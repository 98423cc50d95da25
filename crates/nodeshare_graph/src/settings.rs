// SPDX-License-Identifier: MIT OR Apache-2.0
//! Share settings.
//!
//! Persisted as RON. Every field has a default, so a settings file only
//! needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compat::HostVersion;
use crate::container::{DecodeLimits, EncodeOptions, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_PAYLOAD};
use crate::error::SettingsError;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "nodeshare.ron";

/// Host version assumed when none is configured.
pub const DEFAULT_HOST_VERSION: HostVersion = HostVersion::new(3, 0, 0);

/// Options of the export and import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSettings {
    /// Settings format version
    pub version: u32,
    /// Version of the host that imports documents
    pub host_version: HostVersion,
    /// zlib level used for containers, 0 to 9
    pub compression_level: u32,
    /// Remove the target tree's nodes before building into it
    pub clear_target: bool,
    /// Largest inflated payload accepted, in bytes
    pub max_payload_size: usize,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            host_version: DEFAULT_HOST_VERSION,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            clear_target: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ShareSettings {
    /// Default settings for a given host.
    pub fn for_host(host_version: HostVersion) -> Self {
        Self {
            host_version,
            ..Self::default()
        }
    }

    /// Container encoding options.
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            compression_level: self.compression_level.min(9),
        }
    }

    /// Container decoding limits.
    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_payload_size: self.max_payload_size,
        }
    }

    /// Parse settings from RON text.
    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(text)?;
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::NewerFormat {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Serialize to pretty RON.
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::debug!("Saved share settings to {}", path.display());
        Ok(())
    }
}
