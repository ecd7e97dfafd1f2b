//! Tunables for the persistent build cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cache directory name, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".holo-cache";

/// Configuration for a [`BuildCache`](crate::BuildCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Root directory of the cache.
    pub cache_dir: PathBuf,
    /// Maximum total payload size in bytes before eviction runs.
    pub max_size: u64,
    /// Maximum entry age regardless of access.
    pub ttl: Duration,
    /// Serialized payloads larger than this are compressed.
    pub compression_threshold: usize,
    /// Whether compression is enabled at all.
    pub compress: bool,
    /// Cache format version; entries and indices from other versions are discarded.
    pub version: String,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_size: 500 * 1024 * 1024,
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            compression_threshold: 10 * 1024,
            compress: true,
            version: "1.0.0".to_string(),
        }
    }
}

impl CacheOptions {
    /// Default options rooted at `cache_dir`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            ..Self::default()
        }
    }
}
