//! Protobuf decoder for GTFS Realtime feeds.

use prost::Message;

use crate::error::DecodeError;
use crate::gtfs_rt;
use crate::model::FeedMessage;

/// Versions of the GTFS-RT specification the decoder accepts.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "2.0"];

/// Decodes raw feed bytes into a [`FeedMessage`].
///
/// Build one at startup and share it by reference; it holds no mutable
/// state, so decoding the trips and alerts feeds in parallel is fine.
/// Unknown fields and vendor extensions are skipped.
#[derive(Debug, Clone)]
pub struct FeedDecoder {
    versions: Vec<String>,
}

impl Default for FeedDecoder {
    fn default() -> Self {
        Self::new(SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect())
    }
}

impl FeedDecoder {
    pub fn new(versions: Vec<String>) -> Self {
        Self { versions }
    }

    /// # Errors
    ///
    /// Returns [`DecodeError`] if the bytes are not a valid `FeedMessage`,
    /// the header carries no version, the version is not accepted, or an
    /// entity has no id.
    pub fn decode(&self, bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
        let raw = gtfs_rt::FeedMessage::decode(bytes)?;

        let version = raw.header.gtfs_realtime_version.as_str();
        if version.is_empty() {
            return Err(DecodeError::MissingVersion);
        }
        // Minor revisions ("2.1") are read as their major version.
        let major = version.split('.').next().unwrap_or(version);
        if !self
            .versions
            .iter()
            .any(|v| v == version || v.split('.').next() == Some(major))
        {
            return Err(DecodeError::UnsupportedVersion(version.to_string()));
        }

        if let Some(index) = raw.entity.iter().position(|e| e.id.is_empty()) {
            return Err(DecodeError::MissingEntityId(index));
        }

        Ok(raw.into())
    }
}

/// Decodes a feed with the default [`FeedDecoder`].
///
/// # Errors
///
/// See [`FeedDecoder::decode`].
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
    FeedDecoder::default().decode(bytes)
}
