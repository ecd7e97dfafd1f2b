//! Error types for the recompilation planner.

use holo_traits::GraphError;

/// Errors produced when persisting or restoring planner state.
///
/// Compiling never fails: whatever the compile callback returns is used.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// The compiler cache document could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// The compiler cache document has an unsupported format version.
    #[error("compiler cache version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The supported version.
        expected: u32,
        /// The version found in the document.
        actual: u64,
    },

    /// The embedded trait graph could not be restored.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PlannerError {
    pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
