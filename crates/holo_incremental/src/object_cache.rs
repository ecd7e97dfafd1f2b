//! In-memory cache of compiled object output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compiled output of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Content hash of the object when it was compiled.
    pub hash: String,
    /// Output of the compile callback.
    pub compiled_code: String,
    /// Explicit dependencies of the object at compile time.
    pub dependencies: Vec<String>,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
}

/// Compiled output keyed by object name.
///
/// Entries are never invalidated explicitly: a lookup with a different
/// content hash simply misses, and the next compile overwrites the entry.
#[derive(Debug, Clone, Default)]
pub struct ObjectCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl ObjectCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `name` if it was compiled from content `hash`.
    pub fn get(&self, name: &str, hash: &str) -> Option<&CacheEntry> {
        self.entries.get(name).filter(|entry| entry.hash == hash)
    }

    /// Stores (or overwrites) the entry for `name`.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        hash: impl Into<String>,
        compiled_code: impl Into<String>,
        dependencies: Vec<String>,
    ) {
        self.entries.insert(
            name.into(),
            CacheEntry {
                hash: hash.into(),
                compiled_code: compiled_code.into(),
                dependencies,
                timestamp: Utc::now(),
            },
        );
    }

    /// Drops the entry for `name`.
    pub fn remove(&mut self, name: &str) -> Option<CacheEntry> {
        self.entries.remove(name)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by object name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    pub(crate) fn insert_entry(&mut self, name: String, entry: CacheEntry) {
        self.entries.insert(name, entry);
    }
}
