//! Runtime state carried across hot reloads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A timestamped copy of per-object runtime state.
///
/// The map is deep-copied on capture, so later mutation of the caller's
/// values (at any nesting depth) does not affect the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Runtime values keyed by object name.
    pub state: BTreeMap<String, Value>,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl StateSnapshot {
    /// Copies `state` and stamps it with the current time.
    pub fn capture(state: &BTreeMap<String, Value>) -> Self {
        Self {
            state: state.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Runtime value saved for an object.
    pub fn get(&self, object: &str) -> Option<&Value> {
        self.state.get(object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn capture_is_a_deep_copy() {
        let mut live = BTreeMap::new();
        live.insert("counter".to_string(), json!({ "clicks": { "total": 3 } }));
        let snapshot = StateSnapshot::capture(&live);

        live.get_mut("counter").unwrap()["clicks"]["total"] = json!(99);
        assert_eq!(snapshot.get("counter").unwrap()["clicks"]["total"], json!(3));
    }
}
