//! Snapshot codec
//!
//! Turns a fiber into an opaque blob and back.
//!
//! Blob layout:
//! ```text
//! +-------+---------+------------------------------+
//! | PRLY  | version | gzip(serde_json(Fiber))      |
//! | 4 B   | 1 B     | ...                          |
//! +-------+---------+------------------------------+
//! ```
//! The gzip trailer's CRC guards the payload, so truncated or damaged blobs
//! fail to decode instead of yielding a different stack. The blob holds a
//! single gzip member and nothing after it.

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

use crate::config::SnapshotConfig;
use crate::dialog::DialogRegistry;
use crate::fiber::Fiber;

pub const MAGIC: &[u8; 4] = b"PRLY";
pub const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is too short to hold a header ({len} bytes)")]
    Truncated { len: usize },

    #[error("snapshot does not start with the expected magic bytes")]
    BadMagic,

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("snapshot of {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("snapshot compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("failed to serialize fiber: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("snapshot has {len} unexpected bytes after the compressed payload")]
    TrailingData { len: usize },

    #[error("snapshot payload is malformed: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("snapshot references dialog '{0}', which is not registered")]
    UnknownDialog(String),
}

/// Serializes fibers for storage between turns
#[derive(Debug, Clone)]
pub struct SnapshotCodec {
    compression: Compression,
    max_blob_bytes: Option<usize>,
}

impl Default for SnapshotCodec {
    fn default() -> Self {
        Self::new(&SnapshotConfig::default())
    }
}

impl SnapshotCodec {
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            compression: Compression::new(config.compression_level.min(9)),
            max_blob_bytes: config.max_blob_bytes,
        }
    }

    pub fn encode(&self, fiber: &Fiber) -> Result<Vec<u8>, SnapshotError> {
        let payload = serde_json::to_vec(fiber).map_err(SnapshotError::Encode)?;

        let mut blob = Vec::with_capacity(HEADER_LEN + payload.len() / 2);
        blob.extend_from_slice(MAGIC);
        blob.push(FORMAT_VERSION);

        let mut encoder = GzEncoder::new(blob, self.compression);
        encoder
            .write_all(&payload)
            .map_err(SnapshotError::Compression)?;
        let blob = encoder.finish().map_err(SnapshotError::Compression)?;

        self.check_size(blob.len())?;
        Ok(blob)
    }

    /// Decode a blob, binding it to the dialogs known in this turn
    ///
    /// Every frame must name a dialog present in `registry`; a blob written
    /// by a build with different dialogs is rejected here rather than
    /// failing part-way through a turn.
    pub fn decode(&self, blob: &[u8], registry: &DialogRegistry) -> Result<Fiber, SnapshotError> {
        self.check_size(blob.len())?;

        if blob.len() < HEADER_LEN {
            return Err(SnapshotError::Truncated { len: blob.len() });
        }
        let (header, body) = blob.split_at(HEADER_LEN);
        if &header[..MAGIC.len()] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let version = header[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let mut payload = Vec::new();
        let mut decoder = GzDecoder::new(body);
        decoder
            .read_to_end(&mut payload)
            .map_err(SnapshotError::Compression)?;
        let rest = decoder.into_inner();
        if !rest.is_empty() {
            return Err(SnapshotError::TrailingData { len: rest.len() });
        }

        let fiber: Fiber = serde_json::from_slice(&payload).map_err(SnapshotError::Malformed)?;

        if let Some(frame) = fiber
            .frames
            .iter()
            .find(|frame| !registry.contains(&frame.dialog.kind))
        {
            return Err(SnapshotError::UnknownDialog(frame.dialog.kind.clone()));
        }

        Ok(fiber)
    }

    fn check_size(&self, size: usize) -> Result<(), SnapshotError> {
        match self.max_blob_bytes {
            Some(limit) if size > limit => Err(SnapshotError::TooLarge { size, limit }),
            _ => Ok(()),
        }
    }
}
