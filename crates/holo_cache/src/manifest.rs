//! Build manifests.
//!
//! A manifest binds the SHA-256 hashes of a build's source files to the
//! artifacts produced from them. Re-validating it later tells whether those
//! artifacts can still be trusted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::entry::ArtifactKind;
use crate::error::CacheError;
use crate::hasher::{hash_bytes, hash_file, path_key, SourceHasher};
use crate::store::write_atomic;

/// Current build manifest format version.
pub const MANIFEST_VERSION: &str = "1";

/// One artifact produced by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArtifact {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// SHA-256 of the artifact content.
    pub hash: String,
    /// Artifact size in bytes.
    pub size: u64,
    /// When the artifact was produced.
    pub timestamp: DateTime<Utc>,
    /// Normalized paths of the sources that contributed to it.
    pub sources: Vec<String>,
}

impl BuildArtifact {
    /// Describes an artifact from its content.
    pub fn from_bytes(kind: ArtifactKind, data: &[u8], sources: &[PathBuf]) -> Self {
        Self {
            kind,
            hash: hash_bytes(data),
            size: data.len() as u64,
            timestamp: Utc::now(),
            sources: sources.iter().map(|p| path_key(p)).collect(),
        }
    }
}

/// Record of a completed build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    /// Manifest format version.
    pub version: String,
    /// Identifier derived from the creation time and source hashes.
    pub build_id: String,
    /// When the manifest was created.
    pub created_at: DateTime<Utc>,
    /// SHA-256 per normalized source path.
    pub source_hashes: BTreeMap<String, String>,
    /// Produced artifacts.
    pub artifacts: Vec<BuildArtifact>,
    /// Free-form build metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl BuildManifest {
    /// Writes the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(self).map_err(CacheError::serialization)?;
        write_atomic(path, &json)
    }

    /// Reads a manifest, rejecting unknown format versions.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
        let manifest: Self = serde_json::from_str(&content).map_err(CacheError::serialization)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: MANIFEST_VERSION.to_string(),
                actual: manifest.version,
            });
        }
        Ok(manifest)
    }
}

/// Outcome of [`validate_build_manifest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestValidation {
    /// `true` when every recorded source still has its recorded hash.
    pub valid: bool,
    /// Sources whose content changed.
    pub changed_files: Vec<PathBuf>,
    /// Sources that no longer exist or cannot be read.
    pub missing_files: Vec<PathBuf>,
}

/// Hashes `source_files` and bundles them with `artifacts` into a manifest.
///
/// Every source file must be readable.
pub fn create_build_manifest(
    source_files: &[PathBuf],
    artifacts: Vec<BuildArtifact>,
    metadata: BTreeMap<String, Value>,
) -> Result<BuildManifest, CacheError> {
    let mut source_hashes = BTreeMap::new();
    for path in source_files {
        source_hashes.insert(path_key(path), hash_file(path)?);
    }

    let created_at = Utc::now();
    let mut seed = created_at.to_rfc3339();
    for (path, hash) in &source_hashes {
        seed.push_str(&format!(";{path}={hash}"));
    }
    let build_id = hash_bytes(seed.as_bytes())[..16].to_string();

    debug!(build_id = %build_id, sources = source_hashes.len(), artifacts = artifacts.len(), "created build manifest");
    Ok(BuildManifest {
        version: MANIFEST_VERSION.to_string(),
        build_id,
        created_at,
        source_hashes,
        artifacts,
        metadata,
    })
}

/// Re-hashes every source recorded in `manifest` and reports drift.
pub fn validate_build_manifest(manifest: &BuildManifest) -> ManifestValidation {
    let recorded: BTreeMap<PathBuf, String> = manifest
        .source_hashes
        .iter()
        .map(|(path, hash)| (PathBuf::from(path), hash.clone()))
        .collect();
    let paths: Vec<PathBuf> = recorded.keys().cloned().collect();
    let current = SourceHasher::hash_files(&paths);
    let changes = SourceHasher::detect_changes(&current, &recorded);

    ManifestValidation {
        valid: changes.is_empty(),
        changed_files: changes.modified_files,
        missing_files: changes.deleted_files,
    }
}
