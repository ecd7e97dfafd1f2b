//! Error types for `holo.toml` loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a `holo.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML was malformed, a section had the wrong shape, or a size
    /// string could not be understood.
    #[error("invalid {file}: {reason}")]
    Parse {
        /// File name or path the content came from.
        file: String,
        /// Parser message, including line and column.
        reason: String,
    },

    /// A required key is absent or empty.
    #[error("missing required key `{field}`")]
    MissingField {
        /// Dotted key, e.g. `project.name`.
        field: &'static str,
    },

    /// A key is present but its value cannot be used.
    #[error("`{field}` {reason}")]
    InvalidValue {
        /// Dotted key, e.g. `cache.max_size`.
        field: &'static str,
        /// What is wrong with the value.
        reason: &'static str,
    },
}
