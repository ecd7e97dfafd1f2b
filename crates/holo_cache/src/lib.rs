//! Persistent build cache for the HoloScript compiler.
//!
//! This crate provides the cross-session side of incremental builds: a
//! size- and TTL-bounded artifact cache keyed by source path and artifact
//! kind, a sharded content-addressable store, and build manifests that
//! record which source hashes produced which artifacts.

#![warn(missing_docs)]

pub mod build_cache;
mod compression;
pub mod entry;
pub mod error;
pub mod hasher;
pub mod index;
pub mod manifest;
pub mod options;
pub mod store;

pub use build_cache::{BuildCache, CacheStats, SetOptions, WarmReport};
pub use entry::{ArtifactKind, CacheEntryMeta, CacheLookup, MissReason};
pub use error::CacheError;
pub use hasher::{cache_key, hash_bytes, hash_file, normalize_path, ChangeSet, SourceHasher};
pub use index::CacheIndex;
pub use manifest::{
    create_build_manifest, validate_build_manifest, BuildArtifact, BuildManifest,
    ManifestValidation,
};
pub use options::CacheOptions;
pub use store::ContentStore;
