//! Shared foundational types for the HoloScript incremental build core.
//!
//! This crate provides the fast in-session content hash used for change
//! detection and the order-independent configuration hash used by trait usages.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{hash_config, hash_content, ConfigMap, ContentHash};
