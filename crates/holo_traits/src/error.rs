//! Error types for trait graph persistence.

/// Errors that can occur while serializing or restoring a trait graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The document could not be encoded or decoded.
    #[error("trait graph serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// The document was written with an unsupported format version.
    #[error("trait graph version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The version this build understands.
        expected: u32,
        /// The version found in the document.
        actual: u64,
    },
}
