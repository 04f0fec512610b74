//! Resource descriptors: what to materialize locally and how to obtain its bytes.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use serde::Deserialize;

use crate::MirrorError;

/// AES-128 key material for one encrypted segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentKey {
    pub bytes: [u8; 16],
    pub iv: [u8; 16],
}

impl SegmentKey {
    pub fn new(bytes: [u8; 16], iv: [u8; 16]) -> Self {
        Self { bytes, iv }
    }

    /// Parses hex-encoded key and IV, each optionally prefixed with `0x`.
    pub fn from_hex(bytes: &str, iv: &str) -> Result<Self, String> {
        Ok(Self {
            bytes: parse_hex_block(bytes).map_err(|e| format!("key: {e}"))?,
            iv: parse_hex_block(iv).map_err(|e| format!("iv: {e}"))?,
        })
    }
}

fn parse_hex_block(value: &str) -> Result<[u8; 16], String> {
    let trimmed = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let mut block = [0u8; 16];
    hex::decode_to_slice(trimmed, &mut block)
        .map_err(|e| format!("failed to parse '{value}': {e}"))?;
    Ok(block)
}

/// Where the bytes of a resource come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Content already in hand (typically a rewritten manifest).
    Inline(Bytes),
    /// Remote content that is decrypted with `key` when decryption is enabled.
    Encrypted { uri: String, key: SegmentKey },
    /// Remote content stored as fetched.
    Plain { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Path relative to the output root
    pub destination: PathBuf,
    pub source: ResourceSource,
}

impl ResourceDescriptor {
    pub fn inline(destination: impl Into<PathBuf>, content: impl Into<Bytes>) -> Self {
        Self {
            destination: destination.into(),
            source: ResourceSource::Inline(content.into()),
        }
    }

    pub fn encrypted(
        destination: impl Into<PathBuf>,
        uri: impl Into<String>,
        key: SegmentKey,
    ) -> Self {
        Self {
            destination: destination.into(),
            source: ResourceSource::Encrypted {
                uri: uri.into(),
                key,
            },
        }
    }

    pub fn plain(destination: impl Into<PathBuf>, uri: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            source: ResourceSource::Plain { uri: uri.into() },
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match &self.source {
            ResourceSource::Inline(_) => None,
            ResourceSource::Encrypted { uri, .. } | ResourceSource::Plain { uri } => Some(uri),
        }
    }

    /// Resolves the destination under `output_root`.
    ///
    /// Only plain relative paths are accepted so a resource can never land
    /// outside the output root.
    pub fn resolve(&self, output_root: &Path) -> Result<PathBuf, MirrorError> {
        let mut resolved = output_root.to_path_buf();
        let mut has_name = false;
        for component in self.destination.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    has_name = true;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(MirrorError::invalid_destination(
                        &self.destination,
                        "parent directory components are not allowed",
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(MirrorError::invalid_destination(
                        &self.destination,
                        "destination must be relative",
                    ));
                }
            }
        }
        if !has_name {
            return Err(MirrorError::invalid_destination(
                &self.destination,
                "destination names no file",
            ));
        }
        Ok(resolved)
    }
}

/// A resource as emitted by the manifest resolver.
///
/// Exactly which fields are set decides the source: non-empty `content`
/// wins, then `uri` with `key`, then `uri` alone.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRecord {
    pub file: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub key: Option<KeyRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyRecord {
    pub bytes: String,
    pub iv: String,
}

impl TryFrom<ResourceRecord> for ResourceDescriptor {
    type Error = MirrorError;

    fn try_from(record: ResourceRecord) -> Result<Self, Self::Error> {
        let ResourceRecord {
            file,
            content,
            uri,
            key,
        } = record;

        let content = content.filter(|c| !c.is_empty());
        let source = match (content, uri, key) {
            (Some(content), _, _) => ResourceSource::Inline(Bytes::from(content)),
            (None, Some(uri), Some(key)) => {
                let key = SegmentKey::from_hex(&key.bytes, &key.iv)
                    .map_err(|reason| MirrorError::invalid_resource(&file, reason))?;
                ResourceSource::Encrypted { uri, key }
            }
            (None, Some(uri), None) => ResourceSource::Plain { uri },
            (None, None, _) => {
                return Err(MirrorError::invalid_resource(
                    &file,
                    "record has neither content nor uri",
                ));
            }
        };

        Ok(Self {
            destination: PathBuf::from(file),
            source,
        })
    }
}
