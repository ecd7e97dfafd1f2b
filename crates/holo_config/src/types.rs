//! Configuration types deserialized from `holo.toml`.

use std::path::Path;
use std::time::Duration;

use holo_cache::options::DEFAULT_CACHE_DIR;
use holo_cache::CacheOptions;
use holo_incremental::CompileOptions;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level project configuration parsed from `holo.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Persistent build cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Incremental recompilation settings.
    #[serde(default)]
    pub incremental: IncrementalConfig,
}

/// Core project metadata required in every `holo.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: Option<String>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache directory, relative to the project root unless absolute.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Maximum total payload size: a byte count or a string such as `"500MiB"`.
    #[serde(default = "default_max_size", deserialize_with = "deserialize_size")]
    pub max_size: u64,
    /// Maximum entry age in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Payloads larger than this many bytes are compressed.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,
    /// Whether payload compression is enabled.
    #[serde(default = "default_true")]
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            max_size: default_max_size(),
            ttl_secs: default_ttl_secs(),
            compression_threshold: default_compression_threshold(),
            compress: true,
        }
    }
}

impl CacheConfig {
    /// Builds cache options with the directory resolved against `project_root`.
    pub fn to_options(&self, project_root: &Path) -> CacheOptions {
        CacheOptions {
            cache_dir: project_root.join(&self.dir),
            max_size: self.max_size,
            ttl: Duration::from_secs(self.ttl_secs),
            compression_threshold: self.compression_threshold,
            compress: self.compress,
            ..CacheOptions::default()
        }
    }
}

/// `[incremental]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IncrementalConfig {
    /// Serve unchanged objects from the cache.
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,
    /// Hand saved runtime state back after each compile.
    #[serde(default)]
    pub preserve_state: bool,
    /// Objects that are always recompiled.
    #[serde(default)]
    pub force_recompile: Vec<String>,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            skip_unchanged: true,
            preserve_state: false,
            force_recompile: Vec::new(),
        }
    }
}

impl IncrementalConfig {
    /// Builds planner compile options.
    pub fn to_options(&self) -> CompileOptions {
        CompileOptions {
            preserve_state: self.preserve_state,
            force_recompile: self.force_recompile.clone(),
            skip_unchanged: self.skip_unchanged,
        }
    }
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_max_size() -> u64 {
    CacheOptions::default().max_size
}

fn default_ttl_secs() -> u64 {
    CacheOptions::default().ttl.as_secs()
}

fn default_compression_threshold() -> usize {
    CacheOptions::default().compression_threshold
}

fn default_true() -> bool {
    true
}

/// Parses `"512"`, `"10KB"`, `"10KiB"`, `"500MiB"`, `"2GB"` (case-insensitive).
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "kib" => 1 << 10,
        "mb" => 1_000_000,
        "mib" => 1 << 20,
        "gb" => 1_000_000_000,
        "gib" => 1 << 30,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

/// Deserializes a size given either as an integer byte count or a string
/// with a unit suffix.
fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SizeVisitor;

    impl Visitor<'_> for SizeVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a byte count or a size string like \"500MiB\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v).map_err(|_| E::custom("size must not be negative"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_size(v).ok_or_else(|| E::custom(format!("invalid size '{v}'")))
        }
    }

    deserializer.deserialize_any(SizeVisitor)
}
