//! Content-addressable store.
//!
//! Blobs are stored under `<root>/<first-2-hash-chars>/<full-hash>` where the
//! hash is the SHA-256 of the content, so identical content is stored once.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CacheError;
use crate::hasher::hash_bytes;

/// Writes `data` to `path` through a sibling temp file and a rename, so a
/// crash never leaves a half-written file under the final name.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| CacheError::io(&temp_path, e))?;
    file.write_all(data)
        .map_err(|e| CacheError::io(&temp_path, e))?;
    file.sync_all().map_err(|e| CacheError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| CacheError::io(path, e))
}

/// Removes a file, treating "already gone" as success.
///
/// Returns `true` if a file was actually removed.
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Sharded, deduplicating blob store keyed by content hash.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn new(root: &Path) -> Result<Self, CacheError> {
        fs::create_dir_all(root).map_err(|e| CacheError::io(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        let shard = hash.get(..2).unwrap_or(hash);
        self.root.join(shard).join(hash)
    }

    /// Stores `content` and returns its hash. Storing content that is
    /// already present does not touch the disk.
    pub fn store(&self, content: &[u8]) -> Result<String, CacheError> {
        let hash = hash_bytes(content);
        let path = self.blob_path(&hash);
        if path.exists() {
            debug!(hash = %hash, "content already stored");
            return Ok(hash);
        }
        write_atomic(&path, content)?;
        debug!(hash = %hash, size = content.len(), "stored content");
        Ok(hash)
    }

    /// Reads a file and stores its content.
    pub fn store_file(&self, path: &Path) -> Result<String, CacheError> {
        let content = fs::read(path).map_err(|e| CacheError::io(path, e))?;
        self.store(&content)
    }

    /// Returns the content stored under `hash`, or `None` if absent.
    pub fn retrieve(&self, hash: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.blob_path(hash);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Returns `true` if content with `hash` is stored.
    pub fn has(&self, hash: &str) -> bool {
        self.blob_path(hash).is_file()
    }

    /// Removes the content stored under `hash`. Returns `false` if it was
    /// not present.
    pub fn remove(&self, hash: &str) -> Result<bool, CacheError> {
        remove_if_exists(&self.blob_path(hash))
    }

    /// Total size in bytes of all stored blobs.
    pub fn size(&self) -> Result<u64, CacheError> {
        let mut total = 0;
        let shards = fs::read_dir(&self.root).map_err(|e| CacheError::io(&self.root, e))?;
        for shard in shards {
            let shard = shard.map_err(|e| CacheError::io(&self.root, e))?;
            let shard_path = shard.path();
            if !shard_path.is_dir() {
                continue;
            }
            let blobs = fs::read_dir(&shard_path).map_err(|e| CacheError::io(&shard_path, e))?;
            for blob in blobs {
                let blob = blob.map_err(|e| CacheError::io(&shard_path, e))?;
                let meta = blob.metadata().map_err(|e| CacheError::io(blob.path(), e))?;
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(&dir.path().join("cas")).unwrap();
        (dir, store)
    }

    #[test]
    fn store_and_retrieve() {
        let (_dir, store) = make_store();
        let hash = store.store(b"orb ball {}").unwrap();
        assert_eq!(hash.len(), 64);
        assert!(store.has(&hash));
        assert_eq!(store.retrieve(&hash).unwrap().unwrap(), b"orb ball {}");
    }

    #[test]
    fn blobs_are_sharded_by_prefix() {
        let (_dir, store) = make_store();
        let hash = store.store(b"sharded").unwrap();
        let expected = store.root().join(&hash[..2]).join(&hash);
        assert!(expected.is_file());
    }

    #[test]
    fn duplicate_content_is_stored_once() {
        let (_dir, store) = make_store();
        let a = store.store(b"same").unwrap();
        let b = store.store(b"same").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.size().unwrap(), 4);
    }

    #[test]
    fn retrieve_missing_returns_none() {
        let (_dir, store) = make_store();
        assert!(store.retrieve(&"0".repeat(64)).unwrap().is_none());
        assert!(!store.has(&"0".repeat(64)));
    }

    #[test]
    fn remove_reports_presence() {
        let (_dir, store) = make_store();
        let hash = store.store(b"gone soon").unwrap();
        assert!(store.remove(&hash).unwrap());
        assert!(!store.has(&hash));
        assert!(!store.remove(&hash).unwrap());
    }

    #[test]
    fn store_file_hashes_content() {
        let (dir, store) = make_store();
        let src = dir.path().join("scene.holo");
        fs::write(&src, "composition Demo {}").unwrap();
        let hash = store.store_file(&src).unwrap();
        assert_eq!(hash, hash_bytes(b"composition Demo {}"));
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("payload.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!path.with_extension("tmp").exists());
    }
}
