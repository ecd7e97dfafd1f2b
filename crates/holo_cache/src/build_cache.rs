//! Persistent, size and TTL bounded build artifact cache.
//!
//! Layout of a cache directory:
//!
//! ```text
//! <cache_dir>/
//!   cache-index.json
//!   ast/<key>.json
//!   compiled/<key>.json
//!   bundle/<key>.json
//!   sourcemap/<key>.json
//!   metadata/<key>.json
//! ```
//!
//! Each payload file holds the JSON serialization of a cached value, or a
//! hex-wrapped gzip stream of it when the entry is marked compressed. An entry
//! is only served while its cache version matches, its TTL has not elapsed,
//! its source file still exists, and that file has not been modified since
//! the entry was written.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compression::{compress, decompress};
use crate::entry::{ArtifactKind, CacheEntryMeta, CacheLookup, MissReason};
use crate::error::CacheError;
use crate::hasher::{cache_key, hash_file, path_key};
use crate::index::{CacheIndex, INDEX_FILE};
use crate::options::CacheOptions;
use crate::store::{remove_if_exists, write_atomic};

/// Optional metadata attached to an entry by [`BuildCache::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Files this artifact was built from besides its own source.
    pub dependencies: Vec<PathBuf>,
    /// Tags for grouped invalidation.
    pub tags: Vec<String>,
}

impl SetOptions {
    /// Adds a dependency path.
    pub fn with_dependency(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Snapshot of cache occupancy and session hit/miss counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of indexed entries.
    pub entries: usize,
    /// Sum of recorded payload sizes in bytes.
    pub total_size: u64,
    /// Entry count per artifact kind.
    pub by_kind: BTreeMap<ArtifactKind, usize>,
    /// Hits served since the cache was opened.
    pub hits: u64,
    /// Misses of any reason since the cache was opened.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or `0.0` when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of [`BuildCache::warm_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
    /// Files already cached.
    pub hits: usize,
    /// Files that were computed and stored.
    pub computed: usize,
}

/// Persistent build cache backed by a directory on disk.
///
/// Single-process only: the index is held in memory and rewritten on every
/// mutation, with no locking against other writers.
#[derive(Debug)]
pub struct BuildCache {
    options: CacheOptions,
    index: CacheIndex,
    hits: u64,
    misses: u64,
}

impl BuildCache {
    /// Opens the cache directory, creating it if needed.
    ///
    /// An index written by a different cache version, or one that cannot be
    /// parsed, is discarded together with all payload files.
    pub fn open(options: CacheOptions) -> Result<Self, CacheError> {
        let dir = options.cache_dir.clone();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let index_path = dir.join(INDEX_FILE);
        let mut cache = Self {
            index: CacheIndex::new(&options.version),
            options,
            hits: 0,
            misses: 0,
        };

        match CacheIndex::load(&dir) {
            Some(index) if index.version == cache.options.version => {
                debug!(entries = index.entries.len(), dir = %dir.display(), "loaded cache index");
                cache.index = index;
            }
            Some(index) => {
                warn!(
                    found = %index.version,
                    expected = %cache.options.version,
                    "cache version changed, resetting cache"
                );
                cache.reset()?;
            }
            None if index_path.exists() => {
                warn!(path = %index_path.display(), "unreadable cache index, resetting cache");
                cache.reset()?;
            }
            None => {}
        }

        cache.ensure_dirs()?;
        Ok(cache)
    }

    /// Options the cache was opened with.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Looks up the artifact of `kind` built from `source`.
    ///
    /// Invalid entries are removed and reported as [`MissReason::Stale`]. A
    /// payload that fails to decode is reported as [`MissReason::Corrupted`]
    /// and its entry is kept. Only filesystem failures are errors.
    pub fn get<T: DeserializeOwned>(
        &mut self,
        source: &Path,
        kind: ArtifactKind,
    ) -> Result<CacheLookup<T>, CacheError> {
        let key = cache_key(kind, source);
        let Some(meta) = self.index.entries.get(&key) else {
            return Ok(self.miss(MissReason::NotFound));
        };

        let compressed = meta.compressed;
        if let Some(reason) = self.invalid_reason(meta) {
            debug!(source = %meta.source_path, %kind, reason, "dropping stale cache entry");
            self.remove_entry(&key)?;
            self.save_index()?;
            return Ok(self.miss(MissReason::Stale));
        }

        let payload_path = self.payload_path(kind, &key);
        let stored = match fs::read(&payload_path) {
            Ok(stored) => stored,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %payload_path.display(), "cache payload missing");
                self.index.entries.remove(&key);
                self.save_index()?;
                return Ok(self.miss(MissReason::NotFound));
            }
            Err(e) => return Err(CacheError::io(payload_path, e)),
        };

        let data = match decode_payload::<T>(&stored, compressed) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %payload_path.display(), error = %err, "corrupted cache payload");
                return Ok(self.miss(MissReason::Corrupted));
            }
        };

        let Some(meta) = self.index.entries.get_mut(&key) else {
            return Ok(self.miss(MissReason::NotFound));
        };
        meta.accessed_at = Utc::now();
        meta.access_count += 1;
        let meta = meta.clone();
        self.hits += 1;
        debug!(source = %meta.source_path, %kind, "cache hit");
        Ok(CacheLookup::Hit { data, meta })
    }

    /// Stores `data` as the artifact of `kind` built from `source`.
    ///
    /// The source file must exist: its content hash and modification time
    /// are recorded for later validation. Runs eviction afterwards.
    pub fn set<T: Serialize>(
        &mut self,
        source: &Path,
        kind: ArtifactKind,
        data: &T,
        opts: SetOptions,
    ) -> Result<CacheEntryMeta, CacheError> {
        let json = serde_json::to_vec(data).map_err(CacheError::serialization)?;
        let compressed = self.options.compress && json.len() > self.options.compression_threshold;
        let payload = if compressed { compress(&json)? } else { json };

        let source_meta = fs::metadata(source).map_err(|e| CacheError::io(source, e))?;
        let modified = source_meta
            .modified()
            .map_err(|e| CacheError::io(source, e))?;
        let source_hash = hash_file(source)?;

        let key = cache_key(kind, source);
        write_atomic(&self.payload_path(kind, &key), &payload)?;

        let now = Utc::now();
        let meta = CacheEntryMeta {
            key: key.clone(),
            kind,
            source_hash,
            source_path: path_key(source),
            source_mtime: DateTime::<Utc>::from(modified),
            created_at: now,
            accessed_at: now,
            access_count: 0,
            size: payload.len() as u64,
            compressed,
            version: self.options.version.clone(),
            dependencies: (!opts.dependencies.is_empty())
                .then(|| opts.dependencies.iter().map(|p| path_key(p)).collect()),
            tags: (!opts.tags.is_empty()).then_some(opts.tags),
        };
        debug!(source = %meta.source_path, %kind, size = meta.size, compressed, "cache set");

        self.index.entries.insert(key, meta.clone());
        self.save_index()?;
        self.evict()?;
        Ok(meta)
    }

    /// Returns `true` if a valid entry with a payload file exists. Does not
    /// count as a lookup and does not remove invalid entries.
    pub fn has(&self, source: &Path, kind: ArtifactKind) -> bool {
        let key = cache_key(kind, source);
        self.index.entries.get(&key).is_some_and(|meta| {
            self.invalid_reason(meta).is_none() && self.payload_path(kind, &key).is_file()
        })
    }

    /// Removes the entries of `source` for the given kinds, or for every kind
    /// when `kinds` is `None`. Returns the number of entries removed.
    pub fn invalidate(
        &mut self,
        source: &Path,
        kinds: Option<&[ArtifactKind]>,
    ) -> Result<usize, CacheError> {
        let kinds = kinds.unwrap_or(&ArtifactKind::ALL);
        let keys: Vec<String> = kinds.iter().map(|k| cache_key(*k, source)).collect();
        self.remove_keys(&keys, "invalidate")
    }

    /// Removes every entry tagged with `tag`.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> Result<usize, CacheError> {
        let keys: Vec<String> = self
            .index
            .entries
            .values()
            .filter(|meta| meta.has_tag(tag))
            .map(|meta| meta.key.clone())
            .collect();
        self.remove_keys(&keys, "invalidate_by_tag")
    }

    /// Removes every entry that lists `source` among its dependencies.
    pub fn invalidate_dependents(&mut self, source: &Path) -> Result<usize, CacheError> {
        let dependency = path_key(source);
        let keys: Vec<String> = self
            .index
            .entries
            .values()
            .filter(|meta| meta.depends_on(&dependency))
            .map(|meta| meta.key.clone())
            .collect();
        self.remove_keys(&keys, "invalidate_dependents")
    }

    /// Removes entries whose TTL elapsed or whose source file is gone.
    pub fn prune(&mut self) -> Result<usize, CacheError> {
        let keys: Vec<String> = self
            .index
            .entries
            .values()
            .filter(|meta| self.is_expired(meta) || !Path::new(&meta.source_path).exists())
            .map(|meta| meta.key.clone())
            .collect();
        self.remove_keys(&keys, "prune")
    }

    /// Removes every entry and payload file.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        let removed = self.index.entries.len();
        self.reset()?;
        self.ensure_dirs()?;
        info!(removed, "cache cleared");
        Ok(())
    }

    /// Persists access metadata recorded by [`get`](Self::get).
    pub fn flush(&self) -> Result<(), CacheError> {
        self.save_index()
    }

    /// Current occupancy and counters.
    pub fn stats(&self) -> CacheStats {
        let mut by_kind = BTreeMap::new();
        for meta in self.index.entries.values() {
            *by_kind.entry(meta.kind).or_insert(0) += 1;
        }
        CacheStats {
            entries: self.index.entries.len(),
            total_size: self.index.total_size(),
            by_kind,
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Metadata of every indexed entry, ordered by key.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntryMeta> {
        self.index.entries.values()
    }

    /// Ensures each of `files` is cached as `kind`, computing missing ones
    /// with `compute`. Files are processed one at a time.
    pub fn warm_cache<T, E, F>(
        &mut self,
        files: &[PathBuf],
        kind: ArtifactKind,
        mut compute: F,
    ) -> Result<WarmReport, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnMut(&Path) -> Result<T, E>,
    {
        let mut report = WarmReport::default();
        for file in files {
            if self.get::<T>(file, kind)?.is_hit() {
                report.hits += 1;
                continue;
            }
            let value = compute(file)?;
            self.set(file, kind, &value, SetOptions::default())?;
            report.computed += 1;
        }
        info!(hits = report.hits, computed = report.computed, %kind, "cache warmed");
        Ok(report)
    }

    /// Evicts least recently accessed entries once the total size exceeds
    /// the maximum, until it is at most 80% of the maximum.
    fn evict(&mut self) -> Result<usize, CacheError> {
        let mut total = self.index.total_size();
        if total <= self.options.max_size {
            return Ok(0);
        }
        let target = (u128::from(self.options.max_size) * 8 / 10) as u64;

        let mut by_access: Vec<(DateTime<Utc>, String, u64)> = self
            .index
            .entries
            .values()
            .map(|meta| (meta.accessed_at, meta.key.clone(), meta.size))
            .collect();
        by_access.sort();

        let mut evicted = 0;
        for (_, key, size) in by_access {
            if total <= target {
                break;
            }
            self.remove_entry(&key)?;
            total = total.saturating_sub(size);
            evicted += 1;
        }
        self.save_index()?;
        info!(evicted, total_size = total, max_size = self.options.max_size, "cache eviction");
        Ok(evicted)
    }

    fn miss<T>(&mut self, reason: MissReason) -> CacheLookup<T> {
        self.misses += 1;
        CacheLookup::Miss(reason)
    }

    fn invalid_reason(&self, meta: &CacheEntryMeta) -> Option<&'static str> {
        if meta.version != self.options.version {
            return Some("version mismatch");
        }
        if self.is_expired(meta) {
            return Some("ttl elapsed");
        }
        let modified = match fs::metadata(&meta.source_path).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return Some("source missing"),
        };
        if modified > meta.source_mtime {
            return Some("source modified");
        }
        None
    }

    fn is_expired(&self, meta: &CacheEntryMeta) -> bool {
        let age = (Utc::now() - meta.created_at).to_std().unwrap_or_default();
        age > self.options.ttl
    }

    fn payload_path(&self, kind: ArtifactKind, key: &str) -> PathBuf {
        self.options
            .cache_dir
            .join(kind.as_str())
            .join(format!("{key}.json"))
    }

    fn remove_entry(&mut self, key: &str) -> Result<bool, CacheError> {
        let Some(meta) = self.index.entries.remove(key) else {
            return Ok(false);
        };
        remove_if_exists(&self.payload_path(meta.kind, key))?;
        Ok(true)
    }

    fn remove_keys(&mut self, keys: &[String], op: &str) -> Result<usize, CacheError> {
        let mut removed = 0;
        for key in keys {
            if self.remove_entry(key)? {
                removed += 1;
            }
        }
        if removed > 0 {
            self.save_index()?;
        }
        debug!(op, removed, "cache entries removed");
        Ok(removed)
    }

    fn save_index(&self) -> Result<(), CacheError> {
        self.index.save(&self.options.cache_dir)
    }

    fn ensure_dirs(&self) -> Result<(), CacheError> {
        for kind in ArtifactKind::ALL {
            let dir = self.options.cache_dir.join(kind.as_str());
            fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), CacheError> {
        for kind in ArtifactKind::ALL {
            let dir = self.options.cache_dir.join(kind.as_str());
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(dir, e)),
            }
        }
        self.index = CacheIndex::new(&self.options.version);
        self.save_index()
    }
}

fn decode_payload<T: DeserializeOwned>(stored: &[u8], compressed: bool) -> Result<T, CacheError> {
    if compressed {
        let json = decompress(stored)?;
        serde_json::from_slice(&json).map_err(CacheError::serialization)
    } else {
        serde_json::from_slice(stored).map_err(CacheError::serialization)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::thread::sleep;
    use std::time::{Duration, SystemTime};

    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
        cache: BuildCache,
    }

    impl Fixture {
        fn new(configure: impl FnOnce(&mut CacheOptions)) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut options = CacheOptions::new(&dir.path().join("cache"));
            configure(&mut options);
            let cache = BuildCache::open(options).unwrap();
            Self { dir, cache }
        }

        fn source(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn open_creates_layout() {
        let fx = Fixture::new(|_| {});
        let root = fx.dir.path().join("cache");
        for kind in ArtifactKind::ALL {
            assert!(root.join(kind.as_str()).is_dir());
        }
    }

    #[test]
    fn set_then_get_hits() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        fx.cache
            .set(&src, ArtifactKind::Compiled, &"compiled a".to_string(), SetOptions::default())
            .unwrap();

        let lookup = fx.cache.get::<String>(&src, ArtifactKind::Compiled).unwrap();
        match lookup {
            CacheLookup::Hit { data, meta } => {
                assert_eq!(data, "compiled a");
                assert_eq!(meta.access_count, 1);
                assert!(!meta.compressed);
            }
            CacheLookup::Miss(reason) => panic!("unexpected miss: {reason}"),
        }
        assert_eq!(fx.cache.stats().hits, 1);
    }

    #[test]
    fn get_absent_is_not_found() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        let lookup = fx.cache.get::<String>(&src, ArtifactKind::Ast).unwrap();
        assert_eq!(lookup.miss_reason(), Some(MissReason::NotFound));
        assert_eq!(fx.cache.stats().misses, 1);
    }

    #[test]
    fn kinds_are_independent() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        fx.cache
            .set(&src, ArtifactKind::Ast, &1u32, SetOptions::default())
            .unwrap();
        assert!(fx.cache.has(&src, ArtifactKind::Ast));
        assert!(!fx.cache.has(&src, ArtifactKind::Bundle));
    }

    #[test]
    fn touched_source_is_stale_and_dropped() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        fx.cache
            .set(&src, ArtifactKind::Ast, &"tree".to_string(), SetOptions::default())
            .unwrap();

        let file = File::options().write(true).open(&src).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let lookup = fx.cache.get::<String>(&src, ArtifactKind::Ast).unwrap();
        assert_eq!(lookup.miss_reason(), Some(MissReason::Stale));
        assert_eq!(fx.cache.stats().entries, 0);
        let reloaded = CacheIndex::load(&fx.dir.path().join("cache")).unwrap();
        assert!(reloaded.entries.is_empty());
    }

    #[test]
    fn deleted_source_is_stale() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        fx.cache
            .set(&src, ArtifactKind::Ast, &0u8, SetOptions::default())
            .unwrap();
        fs::remove_file(&src).unwrap();
        let lookup = fx.cache.get::<u8>(&src, ArtifactKind::Ast).unwrap();
        assert_eq!(lookup.miss_reason(), Some(MissReason::Stale));
    }

    #[test]
    fn elapsed_ttl_is_stale() {
        let mut fx = Fixture::new(|o| o.ttl = Duration::from_millis(20));
        let src = fx.source("a.holo", "orb a {}");
        fx.cache
            .set(&src, ArtifactKind::Ast, &0u8, SetOptions::default())
            .unwrap();
        sleep(Duration::from_millis(60));
        let lookup = fx.cache.get::<u8>(&src, ArtifactKind::Ast).unwrap();
        assert_eq!(lookup.miss_reason(), Some(MissReason::Stale));
    }

    #[test]
    fn missing_payload_is_not_found_and_dropped() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        let meta = fx
            .cache
            .set(&src, ArtifactKind::Ast, &0u8, SetOptions::default())
            .unwrap();
        fs::remove_file(fx.cache.payload_path(ArtifactKind::Ast, &meta.key)).unwrap();

        let lookup = fx.cache.get::<u8>(&src, ArtifactKind::Ast).unwrap();
        assert_eq!(lookup.miss_reason(), Some(MissReason::NotFound));
        assert_eq!(fx.cache.stats().entries, 0);
    }

    #[test]
    fn corrupted_payload_keeps_entry() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        let meta = fx
            .cache
            .set(&src, ArtifactKind::Ast, &"tree".to_string(), SetOptions::default())
            .unwrap();
        fs::write(
            fx.cache.payload_path(ArtifactKind::Ast, &meta.key),
            "not json {{",
        )
        .unwrap();

        let lookup = fx.cache.get::<String>(&src, ArtifactKind::Ast).unwrap();
        assert_eq!(lookup.miss_reason(), Some(MissReason::Corrupted));
        assert_eq!(fx.cache.stats().entries, 1);
    }

    #[test]
    fn large_payload_is_compressed() {
        let mut fx = Fixture::new(|o| o.compression_threshold = 64);
        let src = fx.source("a.holo", "orb a {}");
        let big = "x".repeat(4096);
        let meta = fx
            .cache
            .set(&src, ArtifactKind::Bundle, &big, SetOptions::default())
            .unwrap();
        assert!(meta.compressed);
        assert!(meta.size < 4096);

        let data = fx
            .cache
            .get::<String>(&src, ArtifactKind::Bundle)
            .unwrap()
            .data()
            .unwrap();
        assert_eq!(data, big);
    }

    #[test]
    fn compression_disabled_stores_plain_json() {
        let mut fx = Fixture::new(|o| {
            o.compression_threshold = 8;
            o.compress = false;
        });
        let src = fx.source("a.holo", "orb a {}");
        let meta = fx
            .cache
            .set(&src, ArtifactKind::Bundle, &"y".repeat(100), SetOptions::default())
            .unwrap();
        assert!(!meta.compressed);
        assert_eq!(meta.size, 102);
    }

    #[test]
    fn invalidate_selected_kinds() {
        let mut fx = Fixture::new(|_| {});
        let src = fx.source("a.holo", "orb a {}");
        for kind in [ArtifactKind::Ast, ArtifactKind::Compiled, ArtifactKind::Sourcemap] {
            fx.cache.set(&src, kind, &0u8, SetOptions::default()).unwrap();
        }

        let removed = fx
            .cache
            .invalidate(&src, Some(&[ArtifactKind::Compiled]))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(fx.cache.has(&src, ArtifactKind::Ast));
        assert!(!fx.cache.has(&src, ArtifactKind::Compiled));

        assert_eq!(fx.cache.invalidate(&src, None).unwrap(), 2);
        assert_eq!(fx.cache.stats().entries, 0);
    }

    #[test]
    fn invalidate_by_tag_only_hits_tagged() {
        let mut fx = Fixture::new(|_| {});
        let a = fx.source("a.holo", "orb a {}");
        let b = fx.source("b.holo", "orb b {}");
        fx.cache
            .set(&a, ArtifactKind::Ast, &0u8, SetOptions::default().with_tag("lobby"))
            .unwrap();
        fx.cache
            .set(&b, ArtifactKind::Ast, &0u8, SetOptions::default().with_tag("arena"))
            .unwrap();

        assert_eq!(fx.cache.invalidate_by_tag("lobby").unwrap(), 1);
        assert!(!fx.cache.has(&a, ArtifactKind::Ast));
        assert!(fx.cache.has(&b, ArtifactKind::Ast));
    }

    #[test]
    fn invalidate_dependents_leaves_unrelated() {
        let mut fx = Fixture::new(|_| {});
        let shared = fx.source("shared.holo", "template Base {}");
        let a = fx.source("a.holo", "orb a using Base {}");
        let b = fx.source("b.holo", "orb b using Base {}");
        let c = fx.source("c.holo", "orb c {}");
        for src in [&a, &b] {
            fx.cache
                .set(
                    src,
                    ArtifactKind::Compiled,
                    &0u8,
                    SetOptions::default().with_dependency(&shared),
                )
                .unwrap();
        }
        fx.cache
            .set(&c, ArtifactKind::Compiled, &0u8, SetOptions::default())
            .unwrap();

        assert_eq!(fx.cache.invalidate_dependents(&shared).unwrap(), 2);
        assert!(!fx.cache.has(&a, ArtifactKind::Compiled));
        assert!(!fx.cache.has(&b, ArtifactKind::Compiled));
        assert!(fx.cache.has(&c, ArtifactKind::Compiled));
    }

    #[test]
    fn eviction_removes_least_recently_accessed() {
        let mut fx = Fixture::new(|o| {
            o.max_size = 1000;
            o.compress = false;
        });
        // Each payload is a 240 character string, 242 bytes of JSON.
        let payload = "p".repeat(240);
        let names = ["a", "b", "c", "d", "e"];
        let sources: Vec<PathBuf> = names
            .iter()
            .map(|n| fx.source(&format!("{n}.holo"), n))
            .collect();

        for src in &sources[..3] {
            fx.cache
                .set(src, ArtifactKind::Compiled, &payload, SetOptions::default())
                .unwrap();
            sleep(Duration::from_millis(5));
        }
        assert!(fx.cache.get::<String>(&sources[0], ArtifactKind::Compiled).unwrap().is_hit());
        sleep(Duration::from_millis(5));
        fx.cache
            .set(&sources[3], ArtifactKind::Compiled, &payload, SetOptions::default())
            .unwrap();
        assert_eq!(fx.cache.stats().entries, 4);
        sleep(Duration::from_millis(5));

        fx.cache
            .set(&sources[4], ArtifactKind::Compiled, &payload, SetOptions::default())
            .unwrap();

        let stats = fx.cache.stats();
        assert!(stats.total_size <= 800);
        assert_eq!(stats.entries, 3);
        assert!(fx.cache.has(&sources[0], ArtifactKind::Compiled));
        assert!(!fx.cache.has(&sources[1], ArtifactKind::Compiled));
        assert!(!fx.cache.has(&sources[2], ArtifactKind::Compiled));
        assert!(fx.cache.has(&sources[3], ArtifactKind::Compiled));
        assert!(fx.cache.has(&sources[4], ArtifactKind::Compiled));
    }

    #[test]
    fn prune_removes_missing_sources() {
        let mut fx = Fixture::new(|_| {});
        let a = fx.source("a.holo", "orb a {}");
        let b = fx.source("b.holo", "orb b {}");
        fx.cache.set(&a, ArtifactKind::Ast, &0u8, SetOptions::default()).unwrap();
        fx.cache.set(&b, ArtifactKind::Ast, &0u8, SetOptions::default()).unwrap();
        fs::remove_file(&b).unwrap();

        assert_eq!(fx.cache.prune().unwrap(), 1);
        assert!(fx.cache.has(&a, ArtifactKind::Ast));
    }

    #[test]
    fn clear_empties_everything() {
        let mut fx = Fixture::new(|_| {});
        let a = fx.source("a.holo", "orb a {}");
        fx.cache.set(&a, ArtifactKind::Ast, &0u8, SetOptions::default()).unwrap();
        fx.cache.clear().unwrap();
        assert_eq!(fx.cache.stats().entries, 0);
        assert!(fx.dir.path().join("cache").join("ast").is_dir());
        assert!(!fx.cache.has(&a, ArtifactKind::Ast));
    }

    #[test]
    fn version_change_resets_cache() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.holo");
        fs::write(&src, "orb a {}").unwrap();
        let cache_dir = dir.path().join("cache");

        let mut v1 = BuildCache::open(CacheOptions::new(&cache_dir)).unwrap();
        let meta = v1.set(&src, ArtifactKind::Ast, &0u8, SetOptions::default()).unwrap();
        drop(v1);

        let mut options = CacheOptions::new(&cache_dir);
        options.version = "2.0.0".to_string();
        let v2 = BuildCache::open(options).unwrap();
        assert_eq!(v2.stats().entries, 0);
        assert!(!cache_dir.join("ast").join(format!("{}.json", meta.key)).exists());
    }

    #[test]
    fn corrupt_index_resets_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        fs::create_dir_all(&cache_dir).unwrap();
        fs::write(cache_dir.join(INDEX_FILE), "garbage").unwrap();

        let cache = BuildCache::open(CacheOptions::new(&cache_dir)).unwrap();
        assert_eq!(cache.stats().entries, 0);
        assert!(CacheIndex::load(&cache_dir).is_some());
    }

    #[test]
    fn warm_cache_computes_only_misses() {
        let mut fx = Fixture::new(|_| {});
        let a = fx.source("a.holo", "orb a {}");
        let b = fx.source("b.holo", "orb b {}");
        fx.cache
            .set(&a, ArtifactKind::Ast, &"cached".to_string(), SetOptions::default())
            .unwrap();

        let mut computed = Vec::new();
        let report = fx
            .cache
            .warm_cache(&[a.clone(), b.clone()], ArtifactKind::Ast, |path| {
                computed.push(path.to_path_buf());
                Ok::<_, CacheError>(format!("ast of {}", path.display()))
            })
            .unwrap();

        assert_eq!(report, WarmReport { hits: 1, computed: 1 });
        assert_eq!(computed, vec![b.clone()]);
        assert!(fx.cache.has(&b, ArtifactKind::Ast));
    }

    #[test]
    fn hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
