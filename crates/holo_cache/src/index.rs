//! On-disk index of the persistent build cache.
//!
//! The index is read fully at open and rewritten wholesale after every
//! mutating operation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::CacheEntryMeta;
use crate::error::CacheError;
use crate::store::write_atomic;

/// Name of the index file within the cache directory.
pub const INDEX_FILE: &str = "cache-index.json";

/// All entry metadata of a cache directory, keyed by cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndex {
    /// Cache format version that wrote the index.
    pub version: String,
    /// Entry metadata keyed by cache key.
    pub entries: BTreeMap<String, CacheEntryMeta>,
}

impl CacheIndex {
    /// Creates an empty index for the given cache version.
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the index from the cache directory, returning `None` if it is
    /// missing or unparsable.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(INDEX_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Writes the index to the cache directory.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(self).map_err(CacheError::serialization)?;
        write_atomic(&cache_dir.join(INDEX_FILE), &json)
    }

    /// Sum of the recorded payload sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::entry::ArtifactKind;

    fn meta(key: &str, size: u64) -> CacheEntryMeta {
        let now = Utc::now();
        CacheEntryMeta {
            key: key.to_string(),
            kind: ArtifactKind::Ast,
            source_hash: "abc".to_string(),
            source_path: "/p/a.holo".to_string(),
            source_mtime: now,
            created_at: now,
            accessed_at: now,
            access_count: 0,
            size,
            compressed: false,
            version: "1.0.0".to_string(),
            dependencies: None,
            tags: Some(vec!["scene".to_string()]),
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = CacheIndex::new("1.0.0");
        index.entries.insert("k1".to_string(), meta("k1", 10));
        index.entries.insert("k2".to_string(), meta("k2", 32));
        index.save(dir.path()).unwrap();

        let loaded = CacheIndex::load(dir.path()).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.total_size(), 42);
    }

    #[test]
    fn index_uses_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = CacheIndex::new("1.0.0");
        index.entries.insert("k1".to_string(), meta("k1", 1));
        index.save(dir.path()).unwrap();
        let raw = std::fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        assert!(raw.contains("\"sourceMtime\""));
        assert!(raw.contains("\"accessCount\""));
        assert!(!raw.contains("\"dependencies\""));
    }

    #[test]
    fn load_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CacheIndex::load(dir.path()).is_none());
    }

    #[test]
    fn load_corrupt_json_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{{{ nope").unwrap();
        assert!(CacheIndex::load(dir.path()).is_none());
    }
}
