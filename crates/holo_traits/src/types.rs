//! Records stored in and produced by the trait dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use holo_common::ConfigMap;
use holo_scene::TraitUsage;
use serde::{Deserialize, Serialize};

/// Dependency and conflict rules for one trait.
///
/// Conflicts are recorded for callers that validate scenes; the graph itself
/// never enforces them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDefinition {
    /// Trait name.
    pub name: String,
    /// Traits this trait requires.
    pub requires: BTreeSet<String>,
    /// Traits this trait cannot be combined with.
    pub conflicts: BTreeSet<String>,
}

/// Registration of one object's trait usages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTraitInfo {
    /// Object name.
    pub object_name: String,
    /// Identifier of the source file that declares the object.
    pub source_id: String,
    /// Trait usages; missing config hashes are filled in on registration.
    pub traits: Vec<TraitUsage>,
    /// Template the object extends, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl ObjectTraitInfo {
    /// Creates a registration with no template.
    pub fn new(
        object_name: impl Into<String>,
        source_id: impl Into<String>,
        traits: Vec<TraitUsage>,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            source_id: source_id.into(),
            traits,
            template: None,
        }
    }

    /// Sets the template this object extends.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

/// How a trait usage changed between two captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitChangeType {
    /// The trait was not used before.
    Added,
    /// The trait is no longer used.
    Removed,
    /// Same trait, different configuration hash.
    ConfigChanged,
}

/// One trait-level change on one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitChangeInfo {
    /// Object whose trait usage changed.
    pub object_name: String,
    /// Trait that changed.
    pub trait_name: String,
    /// Kind of change.
    pub change_type: TraitChangeType,
    /// Configuration before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_config: Option<ConfigMap>,
    /// Configuration after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_config: Option<ConfigMap>,
}

impl TraitChangeInfo {
    /// Creates a change record without configuration payloads.
    pub fn new(
        object_name: impl Into<String>,
        trait_name: impl Into<String>,
        change_type: TraitChangeType,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            trait_name: trait_name.into(),
            change_type,
            old_config: None,
            new_config: None,
        }
    }
}

/// Objects and sources affected by a batch of trait changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedSet {
    /// Objects that must be recompiled.
    pub objects: BTreeSet<String>,
    /// Source ids owning at least one affected object.
    pub sources: BTreeSet<String>,
    /// First reason recorded for each affected object.
    pub reasons: BTreeMap<String, String>,
}

impl AffectedSet {
    pub(crate) fn add(&mut self, object: &str, reason: impl FnOnce() -> String) {
        if self.objects.insert(object.to_string()) {
            self.reasons.insert(object.to_string(), reason());
        }
    }

    /// Returns `true` if nothing is affected.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
