//! Payload compression.
//!
//! Compressed payloads are gzip streams stored as a hex-encoded JSON string,
//! so every payload file in the cache stays valid JSON.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::CacheError;

/// Compresses `data` and wraps it as a JSON string literal.
pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(compression_error)?;
    let gz = encoder.finish().map_err(compression_error)?;
    serde_json::to_vec(&hex::encode(gz)).map_err(CacheError::serialization)
}

/// Reverses [`compress`].
pub(crate) fn decompress(stored: &[u8]) -> Result<Vec<u8>, CacheError> {
    let wrapped: String = serde_json::from_slice(stored).map_err(CacheError::serialization)?;
    let gz = hex::decode(wrapped).map_err(compression_error)?;
    let mut out = Vec::new();
    GzDecoder::new(gz.as_slice())
        .read_to_end(&mut out)
        .map_err(compression_error)?;
    Ok(out)
}

fn compression_error(err: impl std::fmt::Display) -> CacheError {
    CacheError::Compression {
        reason: err.to_string(),
    }
}
