//! Cache entry metadata and lookup results.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of artifact stored in the persistent cache.
///
/// Each kind is stored in its own subdirectory of the cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Parsed scene graph.
    Ast,
    /// Generated target code.
    Compiled,
    /// Bundled output.
    Bundle,
    /// Source map.
    Sourcemap,
    /// Free-form build metadata.
    Metadata,
}

impl ArtifactKind {
    /// All artifact kinds, in directory creation order.
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Ast,
        ArtifactKind::Compiled,
        ArtifactKind::Bundle,
        ArtifactKind::Sourcemap,
        ArtifactKind::Metadata,
    ];

    /// Name used for the subdirectory and in cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Ast => "ast",
            ArtifactKind::Compiled => "compiled",
            ArtifactKind::Bundle => "bundle",
            ArtifactKind::Sourcemap => "sourcemap",
            ArtifactKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown artifact kind '{s}'"))
    }
}

/// Index record describing one cached payload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryMeta {
    /// File stem of the payload, derived from kind and source path.
    pub key: String,
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// SHA-256 of the source file content when the entry was written.
    pub source_hash: String,
    /// Normalized source path.
    pub source_path: String,
    /// Source modification time when the entry was written.
    pub source_mtime: DateTime<Utc>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// When the entry was last read or written.
    pub accessed_at: DateTime<Utc>,
    /// Number of successful reads.
    pub access_count: u64,
    /// Stored payload size in bytes.
    pub size: u64,
    /// Whether the payload is gzip-compressed.
    pub compressed: bool,
    /// Cache format version the entry was written with.
    pub version: String,
    /// Normalized paths this artifact depends on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    /// Free-form tags for grouped invalidation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl CacheEntryMeta {
    /// Returns `true` if the entry carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }

    /// Returns `true` if the entry lists `path` (normalized) as a dependency.
    pub fn depends_on(&self, path: &str) -> bool {
        self.dependencies
            .as_ref()
            .is_some_and(|deps| deps.iter().any(|d| d == path))
    }
}

/// Why a lookup did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// No entry, or the payload file disappeared.
    NotFound,
    /// The entry failed validation (source changed or missing, TTL elapsed,
    /// or written by another cache version) and was dropped.
    Stale,
    /// The payload could not be decoded. The entry is kept.
    Corrupted,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissReason::NotFound => "not_found",
            MissReason::Stale => "stale",
            MissReason::Corrupted => "corrupted",
        })
    }
}

/// Result of [`BuildCache::get`](crate::BuildCache::get).
#[derive(Debug, Clone)]
pub enum CacheLookup<T> {
    /// The entry was valid and decoded.
    Hit {
        /// Decoded payload.
        data: T,
        /// Entry metadata after the access was recorded.
        meta: CacheEntryMeta,
    },
    /// The entry could not be used.
    Miss(MissReason),
}

impl<T> CacheLookup<T> {
    /// Returns `true` for a hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }

    /// Returns the payload of a hit.
    pub fn data(self) -> Option<T> {
        match self {
            CacheLookup::Hit { data, .. } => Some(data),
            CacheLookup::Miss(_) => None,
        }
    }

    /// Returns the miss reason, if this is a miss.
    pub fn miss_reason(&self) -> Option<MissReason> {
        match self {
            CacheLookup::Hit { .. } => None,
            CacheLookup::Miss(reason) => Some(*reason),
        }
    }
}
