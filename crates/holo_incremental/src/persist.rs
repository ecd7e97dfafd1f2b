//! Persisting planner state as a single JSON document.
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [["ball", { "hash": "...", "compiledCode": "...", ... }]],
//!   "dependencies": [["ball", ["floor"]]],
//!   "traitGraph": { "version": 1, ... },
//!   "timestamp": "2026-01-01T00:00:00Z",
//!   "previousSnapshot": { "name": "Demo", ... }
//! }
//! ```

use chrono::{DateTime, Utc};
use holo_scene::Composition;
use holo_traits::TraitDependencyGraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::PlannerError;
use crate::object_cache::CacheEntry;
use crate::planner::IncrementalCompiler;

/// Format version written by [`IncrementalCompiler::serialize`].
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerializedCompilerCache {
    version: u32,
    entries: Vec<(String, CacheEntry)>,
    dependencies: Vec<(String, Vec<String>)>,
    trait_graph: Value,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_snapshot: Option<Composition>,
}

impl IncrementalCompiler {
    /// Serializes cached output, explicit dependencies, the trait graph and
    /// the retained baseline snapshot. Saved runtime state is not included.
    pub fn serialize(&self) -> Result<String, PlannerError> {
        let doc = SerializedCompilerCache {
            version: CACHE_FORMAT_VERSION,
            entries: self
                .cache
                .iter()
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect(),
            dependencies: self
                .dependencies
                .iter()
                .map(|(name, deps)| (name.clone(), deps.clone()))
                .collect(),
            trait_graph: self.graph.to_value()?,
            timestamp: Utc::now(),
            previous_snapshot: self.previous.clone(),
        };
        serde_json::to_string(&doc).map_err(PlannerError::serialization)
    }

    /// Restores a planner from a document produced by
    /// [`serialize`](Self::serialize).
    ///
    /// Fails with [`PlannerError::VersionMismatch`] when the document version
    /// is not supported, and with [`PlannerError::Graph`] when the embedded
    /// trait graph has an unsupported version.
    pub fn deserialize(json: &str) -> Result<Self, PlannerError> {
        let value: Value = serde_json::from_str(json).map_err(PlannerError::serialization)?;
        match value.get("version").and_then(Value::as_u64) {
            Some(v) if v == u64::from(CACHE_FORMAT_VERSION) => {}
            Some(v) => {
                return Err(PlannerError::VersionMismatch {
                    expected: CACHE_FORMAT_VERSION,
                    actual: v,
                })
            }
            None => {
                return Err(PlannerError::Serialization {
                    reason: "missing or non-numeric `version`".to_string(),
                })
            }
        }

        let doc: SerializedCompilerCache =
            serde_json::from_value(value).map_err(PlannerError::serialization)?;
        let graph = TraitDependencyGraph::from_value(doc.trait_graph)?;

        let mut planner = IncrementalCompiler::new(graph);
        for (name, entry) in doc.entries {
            planner.cache.insert_entry(name, entry);
        }
        for (name, deps) in doc.dependencies {
            planner.update_dependencies(&name, deps);
        }
        planner.previous = doc.previous_snapshot;

        debug!(
            entries = planner.cache.len(),
            saved_at = %doc.timestamp,
            "restored compiler cache"
        );
        Ok(planner)
    }
}
