//! Cryptographic source hashing and change detection.
//!
//! Everything that ends up in a file name or is compared across sessions is
//! hashed with SHA-256 so unrelated codebases sharing a cache directory do
//! not collide.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::entry::ArtifactKind;
use crate::error::CacheError;

/// Number of hex characters kept from the SHA-256 digest for cache file names.
const CACHE_KEY_LEN: usize = 32;

/// Returns the lowercase hex SHA-256 digest of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Reads a file and returns its SHA-256 digest.
pub fn hash_file(path: &Path) -> Result<String, CacheError> {
    let content = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
    Ok(hash_bytes(&content))
}

/// Makes a path absolute and removes `.` and `..` components lexically.
///
/// The file does not have to exist, so a deleted source still maps to the
/// same cache key it was stored under.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalized path rendered with forward slashes, used as the stored
/// source path and for dependency matching.
pub(crate) fn path_key(path: &Path) -> String {
    normalize_path(path).to_string_lossy().replace('\\', "/")
}

/// Derives the cache file stem for an artifact of `kind` built from `source`.
pub fn cache_key(kind: ArtifactKind, source: &Path) -> String {
    let digest = hash_bytes(format!("{}:{}", kind.as_str(), path_key(source)).as_bytes());
    digest[..CACHE_KEY_LEN].to_string()
}

/// Result of comparing current source hashes against recorded ones.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Files that were not recorded before.
    pub new_files: Vec<PathBuf>,

    /// Files whose content hash differs from the recorded one.
    pub modified_files: Vec<PathBuf>,

    /// Recorded files that are no longer present or readable.
    pub deleted_files: Vec<PathBuf>,

    /// Files whose content hash matches.
    pub unchanged_files: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if there are no new, modified or deleted files.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns the number of files that need reprocessing (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }
}

/// Utility for hashing batches of source files and detecting drift.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes SHA-256 hashes for multiple files.
    ///
    /// Files that cannot be read are skipped; they show up as deleted in
    /// [`detect_changes`](Self::detect_changes).
    pub fn hash_files(paths: &[PathBuf]) -> HashMap<PathBuf, String> {
        let mut hashes = HashMap::with_capacity(paths.len());
        for path in paths {
            if let Ok(hash) = hash_file(path) {
                hashes.insert(path.clone(), hash);
            }
        }
        hashes
    }

    /// Compares current hashes against recorded ones.
    pub fn detect_changes(
        current: &HashMap<PathBuf, String>,
        recorded: &BTreeMap<PathBuf, String>,
    ) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (path, hash) in current {
            match recorded.get(path) {
                Some(old) if old == hash => changes.unchanged_files.push(path.clone()),
                Some(_) => changes.modified_files.push(path.clone()),
                None => changes.new_files.push(path.clone()),
            }
        }

        changes.deleted_files = recorded
            .keys()
            .filter(|p| !current.contains_key(*p))
            .cloned()
            .collect();

        // Sort for deterministic ordering in tests
        changes.new_files.sort();
        changes.modified_files.sort();
        changes.unchanged_files.sort();
        changes.deleted_files.sort();
        changes
    }
}
