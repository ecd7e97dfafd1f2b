//! Change records produced by the differ.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The node exists only in the new snapshot.
    Added,
    /// The node exists only in the old snapshot.
    Removed,
    /// The node exists in both snapshots with different content.
    Modified,
    /// The node exists in both snapshots with identical content.
    Unchanged,
}

/// Which part of the scene graph a change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A whole object.
    Object,
    /// A single property of an object.
    Property,
    /// A trait usage of an object.
    Trait,
    /// An opaque logic block.
    Logic,
    /// The composition root itself.
    Composition,
}

/// A single change between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstChange {
    /// What happened to the node.
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Names from the composition root to the changed node.
    pub path: Vec<String>,
    /// Which kind of node changed.
    pub node_type: NodeKind,
    /// Value in the old snapshot, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// Value in the new snapshot, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// Extra classification, e.g. `config_changed` for trait reconfiguration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AstChange {
    pub(crate) fn new(change_type: ChangeType, path: Vec<String>, node_type: NodeKind) -> Self {
        Self {
            change_type,
            path,
            node_type,
            old_value: None,
            new_value: None,
            detail: None,
        }
    }

    pub(crate) fn with_old(mut self, value: Option<Value>) -> Self {
        self.old_value = value;
        self
    }

    pub(crate) fn with_new(mut self, value: Option<Value>) -> Self {
        self.new_value = value;
        self
    }

    pub(crate) fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    /// Name of the changed node (last path element).
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

/// Aggregate result of diffing two snapshots.
///
/// Object name lists are in pre-order of the snapshot they come from
/// (the new snapshot, except `removed_objects`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// `true` if at least one change was recorded.
    pub has_changes: bool,
    /// All changes, deduplicated by path, node kind and change type.
    pub changes: Vec<AstChange>,
    /// Objects present only in the new snapshot.
    pub added_objects: Vec<String>,
    /// Objects present only in the old snapshot.
    pub removed_objects: Vec<String>,
    /// Objects present in both with at least one change.
    pub modified_objects: Vec<String>,
    /// Objects present in both with no change.
    pub unchanged_objects: Vec<String>,
}

impl DiffResult {
    /// Changes of the given node kind.
    pub fn changes_of(&self, kind: NodeKind) -> impl Iterator<Item = &AstChange> + '_ {
        self.changes.iter().filter(move |c| c.node_type == kind)
    }

    /// Number of objects that need recompilation because of this diff.
    pub fn dirty_count(&self) -> usize {
        self.added_objects.len() + self.modified_objects.len()
    }
}
