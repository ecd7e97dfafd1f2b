//! Content hashing for in-session change detection.
//!
//! These hashes are fast and non-cryptographic. They are only compared within
//! one build session (or against state that the same toolchain version wrote),
//! so an accidental collision costs at worst a skipped recompilation of one
//! object. Anything persisted across unrelated codebases uses the SHA-256
//! hashing in `holo_cache` instead.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A trait configuration record: string keys mapped to arbitrary JSON values.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// A 128-bit content hash computed using XXH3.
///
/// Two inputs with the same `ContentHash` are assumed to be identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a content hash of a UTF-8 string.
    pub fn from_str_content(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Hashes a string and returns the hash as 32 lowercase hex characters.
///
/// Deterministic across runs and platforms for the same input.
pub fn hash_content(content: &str) -> String {
    ContentHash::from_str_content(content).to_string()
}

/// Hashes a configuration record independently of key insertion order.
///
/// Keys are sorted, each pair is rendered as `key:JSON(value)`, the pairs are
/// joined with `,` and the result is passed to [`hash_content`]. Accepts any
/// iterator of key/value pairs so callers holding unordered maps get the same
/// hash as callers holding a [`ConfigMap`].
pub fn hash_config<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a serde_json::Value)>,
{
    let mut pairs: Vec<(&String, &serde_json::Value)> = entries.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let rendered: Vec<String> = pairs
        .into_iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect();
    hash_content(&rendered.join(","))
}
