//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Stale, expired and corrupted entries are not errors: they surface as
/// [`CacheLookup::Miss`](crate::CacheLookup::Miss). This enum covers the
/// failures a caller has to see, chiefly filesystem errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// A compressed payload could not be encoded or decoded.
    #[error("compression error: {reason}")]
    Compression {
        /// Description of the compression failure.
        reason: String,
    },

    /// A manifest was written with an unsupported format version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The file path.
        path: PathBuf,
        /// The expected format version.
        expected: String,
        /// The version found in the file.
        actual: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
