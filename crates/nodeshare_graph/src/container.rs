// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container text format.
//!
//! A container is `prefix + payload`:
//!
//! ```text
//! NS0B<major><minor><patch>!<base64(zlib(compact json))>
//! NS1B<major>.<minor>.<patch>!<base64(zlib(compact json))>
//! ```
//!
//! Format 0 concatenates the version digits and is read back as "first
//! digit major, last digit patch, the rest minor". That only works while
//! major and patch are single digits, so the encoder switches to format 1,
//! which separates the components, whenever format 0 would not read back.

use std::fmt;
use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::compat::HostVersion;
use crate::document::TreeDocument;
use crate::error::{DecodeError, EncodeError, FormatError};

/// Container magic tag.
pub const MAGIC: &str = "NS";

/// Default limit on the inflated payload size (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Default zlib compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// How the producer version is written in the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixFormat {
    /// Digits concatenated, `NS0B301!`
    Packed,
    /// Dot separated, `NS1B3.10.2!`
    Dotted,
}

impl PrefixFormat {
    fn digit(self) -> char {
        match self {
            Self::Packed => '0',
            Self::Dotted => '1',
        }
    }
}

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerPrefix {
    /// Version field layout
    pub format: PrefixFormat,
    /// Host version that produced the payload
    pub version: HostVersion,
}

impl ContainerPrefix {
    /// The prefix the encoder writes for `version`.
    pub fn for_version(version: HostVersion) -> Self {
        let packed = Self {
            format: PrefixFormat::Packed,
            version,
        };
        let format = match unpack_version(&packed.version_field()) {
            Some(read_back) if read_back == version => PrefixFormat::Packed,
            _ => PrefixFormat::Dotted,
        };
        Self { format, version }
    }

    fn version_field(&self) -> String {
        let v = self.version;
        match self.format {
            PrefixFormat::Packed => format!("{}{}{}", v.major, v.minor, v.patch),
            PrefixFormat::Dotted => v.to_string(),
        }
    }

    /// Split `text` into its prefix and payload.
    pub fn split(text: &str) -> Result<(Self, &str), FormatError> {
        let Some(rest) = text.strip_prefix(MAGIC) else {
            return Err(FormatError::InvalidMagic {
                found: text.chars().take(MAGIC.len()).collect(),
            });
        };
        let Some(end) = rest.find('!') else {
            return Err(malformed(text, "missing '!' terminator"));
        };
        let (header, payload) = (&rest[..end], &rest[end + 1..]);
        let prefix = &text[..MAGIC.len() + end + 1];

        let Some((format, version)) = header.split_once('B') else {
            return Err(malformed(prefix, "missing 'B' separator"));
        };
        let format = match format {
            "0" => PrefixFormat::Packed,
            "1" => PrefixFormat::Dotted,
            _ => return Err(malformed(prefix, "unknown format version")),
        };
        let version = match format {
            PrefixFormat::Packed => unpack_version(version),
            PrefixFormat::Dotted if version.matches('.').count() == 2 => version.parse().ok(),
            PrefixFormat::Dotted => None,
        };
        let Some(version) = version else {
            return Err(malformed(prefix, "unreadable host version"));
        };
        Ok((Self { format, version }, payload))
    }
}

impl fmt::Display for ContainerPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}B{}!", MAGIC, self.format.digit(), self.version_field())
    }
}

fn malformed(prefix: &str, reason: &'static str) -> FormatError {
    FormatError::MalformedPrefix {
        prefix: prefix.to_string(),
        reason,
    }
}

/// Read a packed version field: first digit major, last digit patch.
fn unpack_version(digits: &str) -> Option<HostVersion> {
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let last = digits.len() - 1;
    Some(HostVersion::new(
        digits[..1].parse().ok()?,
        digits[1..last].parse().ok()?,
        digits[last..].parse().ok()?,
    ))
}

/// Options for encoding containers.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// zlib level, 0 to 9
    pub compression_level: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Limits applied while decoding.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Largest inflated payload accepted, in bytes
    pub max_payload_size: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Wrap `document` in a container tagged with `producer`.
pub fn encode(document: &TreeDocument, producer: HostVersion, options: EncodeOptions) -> Result<String, EncodeError> {
    let json = document.to_json_compact()?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(options.compression_level.min(9)));
    encoder.write_all(json.as_bytes())?;
    let compressed = encoder.finish()?;

    let prefix = ContainerPrefix::for_version(producer);
    let text = format!("{}{}", prefix, STANDARD.encode(&compressed));
    tracing::debug!(
        "Encoded {:?}: {} bytes json, {} bytes deflated, {} chars",
        document.name,
        json.len(),
        compressed.len(),
        text.len()
    );
    Ok(text)
}

/// Unwrap a container into its prefix and the document JSON text.
pub fn unwrap_payload(text: &str, limits: DecodeLimits) -> Result<(ContainerPrefix, String), FormatError> {
    let (prefix, payload) = ContainerPrefix::split(text.trim())?;

    let compressed = STANDARD
        .decode(payload.trim())
        .map_err(|e| FormatError::Base64(e.to_string()))?;

    // read one byte past the limit to tell "at the limit" from "over it"
    let mut inflated = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take((limits.max_payload_size as u64).saturating_add(1))
        .read_to_end(&mut inflated)
        .map_err(|e| FormatError::Inflate(e.to_string()))?;
    if inflated.len() > limits.max_payload_size {
        return Err(FormatError::PayloadTooLarge {
            limit: limits.max_payload_size,
        });
    }

    let json = String::from_utf8(inflated).map_err(|e| FormatError::Utf8(e.to_string()))?;
    Ok((prefix, json))
}

/// Decode a container into its producer version and document.
pub fn decode(text: &str, limits: DecodeLimits) -> Result<(HostVersion, TreeDocument), DecodeError> {
    let (prefix, json) = unwrap_payload(text, limits)?;
    let document = TreeDocument::from_json(&json)?;
    Ok((prefix.version, document))
}
