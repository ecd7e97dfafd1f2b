//! The trait dependency graph and its reverse indices.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use holo_scene::TraitUsage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;
use crate::types::{
    AffectedSet, ObjectTraitInfo, TraitChangeInfo, TraitChangeType, TraitDefinition,
};

/// Format version written by [`TraitDependencyGraph::serialize`].
pub const GRAPH_FORMAT_VERSION: u32 = 1;

type Index = BTreeMap<String, BTreeSet<String>>;

/// Registry of trait rules and of the objects currently using each trait.
///
/// One instance is owned by each recompilation planner; there is no global
/// registry. Use [`TraitDependencyGraph::with_builtin_traits`] for the default
/// rule set.
#[derive(Debug, Clone, Default)]
pub struct TraitDependencyGraph {
    /// trait -> traits it requires
    dependencies: Index,
    /// trait -> traits it conflicts with
    conflicts: Index,
    objects: BTreeMap<String, ObjectTraitInfo>,
    trait_to_objects: Index,
    source_to_objects: Index,
    template_to_objects: Index,
    /// Trait usages captured by `save_snapshot`, keyed by object name.
    snapshots: BTreeMap<String, Vec<TraitUsage>>,
}

/// Counts describing the current graph contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Traits with at least one dependency or conflict rule.
    pub trait_rules: usize,
    /// Registered objects.
    pub objects: usize,
    /// Distinct traits in use.
    pub traits_in_use: usize,
    /// Distinct source ids.
    pub sources: usize,
    /// Distinct templates extended by at least one object.
    pub templates: usize,
}

#[derive(Serialize, Deserialize)]
struct SerializedGraph {
    version: u32,
    dependencies: Vec<(String, Vec<String>)>,
    conflicts: Vec<(String, Vec<String>)>,
    objects: Vec<ObjectTraitInfo>,
}

impl TraitDependencyGraph {
    /// Creates an empty graph with no trait rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers dependency and conflict rules for a trait.
    ///
    /// Idempotent: rules are union-merged with any already registered.
    pub fn register_trait<R, C>(&mut self, name: &str, requires: R, conflicts: C)
    where
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let deps = self.dependencies.entry(name.to_string()).or_default();
        deps.extend(requires.into_iter().map(Into::into));
        let confl = self.conflicts.entry(name.to_string()).or_default();
        confl.extend(conflicts.into_iter().map(Into::into));
    }

    /// Returns the rules registered for a trait.
    pub fn trait_definition(&self, name: &str) -> Option<TraitDefinition> {
        if !self.dependencies.contains_key(name) && !self.conflicts.contains_key(name) {
            return None;
        }
        Some(TraitDefinition {
            name: name.to_string(),
            requires: self.dependencies.get(name).cloned().unwrap_or_default(),
            conflicts: self.conflicts.get(name).cloned().unwrap_or_default(),
        })
    }

    /// Registers (or overwrites) an object's trait usages.
    ///
    /// Missing config hashes are computed. Reverse-index entries from a
    /// previous registration under the same name are NOT removed; call
    /// [`unregister_object`](Self::unregister_object) first when the trait
    /// set may have changed.
    pub fn register_object(&mut self, mut info: ObjectTraitInfo) {
        info.traits = info
            .traits
            .into_iter()
            .map(TraitUsage::with_computed_hash)
            .collect();

        let name = info.object_name.clone();
        for usage in &info.traits {
            self.trait_to_objects
                .entry(usage.name.clone())
                .or_default()
                .insert(name.clone());
        }
        self.source_to_objects
            .entry(info.source_id.clone())
            .or_default()
            .insert(name.clone());
        if let Some(template) = &info.template {
            self.template_to_objects
                .entry(template.clone())
                .or_default()
                .insert(name.clone());
        }
        self.objects.insert(name, info);
    }

    /// Removes an object and all of its reverse-index entries.
    pub fn unregister_object(&mut self, name: &str) -> Option<ObjectTraitInfo> {
        let info = self.objects.remove(name)?;
        for usage in &info.traits {
            remove_from_index(&mut self.trait_to_objects, &usage.name, name);
        }
        remove_from_index(&mut self.source_to_objects, &info.source_id, name);
        if let Some(template) = &info.template {
            remove_from_index(&mut self.template_to_objects, template, name);
        }
        Some(info)
    }

    /// Returns an object's registration.
    pub fn object(&self, name: &str) -> Option<&ObjectTraitInfo> {
        self.objects.get(name)
    }

    /// Objects currently registered as using a trait.
    pub fn get_objects_using_trait(&self, trait_name: &str) -> BTreeSet<String> {
        self.trait_to_objects.get(trait_name).cloned().unwrap_or_default()
    }

    /// Objects declared in a source.
    pub fn get_objects_in_source(&self, source_id: &str) -> BTreeSet<String> {
        self.source_to_objects.get(source_id).cloned().unwrap_or_default()
    }

    /// Objects extending a template.
    pub fn get_template_instances(&self, template: &str) -> BTreeSet<String> {
        self.template_to_objects.get(template).cloned().unwrap_or_default()
    }

    /// Traits required by a trait.
    pub fn get_required_traits(&self, trait_name: &str) -> BTreeSet<String> {
        self.dependencies.get(trait_name).cloned().unwrap_or_default()
    }

    /// Traits a trait conflicts with.
    pub fn get_conflicting_traits(&self, trait_name: &str) -> BTreeSet<String> {
        self.conflicts.get(trait_name).cloned().unwrap_or_default()
    }

    /// Traits whose `requires` set contains `trait_name`.
    pub fn get_dependent_traits(&self, trait_name: &str) -> BTreeSet<String> {
        self.dependencies
            .iter()
            .filter(|(_, requires)| requires.contains(trait_name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Captures an object's current trait usages for later comparison by
    /// [`detect_trait_changes`](Self::detect_trait_changes).
    pub fn save_snapshot(&mut self, object_name: &str, traits: &[TraitUsage]) {
        let traits = traits
            .iter()
            .cloned()
            .map(TraitUsage::with_computed_hash)
            .collect();
        self.snapshots.insert(object_name.to_string(), traits);
    }

    /// Compares `new_traits` with the last snapshot saved for the object.
    ///
    /// Without a snapshot every trait is reported as added.
    pub fn detect_trait_changes(
        &self,
        object_name: &str,
        new_traits: &[TraitUsage],
    ) -> Vec<TraitChangeInfo> {
        let old: BTreeMap<&str, &TraitUsage> = self
            .snapshots
            .get(object_name)
            .map(|traits| traits.iter().map(|t| (t.name.as_str(), t)).collect())
            .unwrap_or_default();
        let new: Vec<TraitUsage> = new_traits
            .iter()
            .cloned()
            .map(TraitUsage::with_computed_hash)
            .collect();

        let mut changes = Vec::new();
        for usage in &new {
            match old.get(usage.name.as_str()) {
                None => {
                    let mut change =
                        TraitChangeInfo::new(object_name, &usage.name, TraitChangeType::Added);
                    change.new_config = Some(usage.config.clone());
                    changes.push(change);
                }
                Some(prev) if prev.config_hash != usage.config_hash => {
                    let mut change = TraitChangeInfo::new(
                        object_name,
                        &usage.name,
                        TraitChangeType::ConfigChanged,
                    );
                    change.old_config = Some(prev.config.clone());
                    change.new_config = Some(usage.config.clone());
                    changes.push(change);
                }
                Some(_) => {}
            }
        }
        for (name, prev) in &old {
            if !new.iter().any(|t| t.name == *name) {
                let mut change = TraitChangeInfo::new(object_name, *name, TraitChangeType::Removed);
                change.old_config = Some(prev.config.clone());
                changes.push(change);
            }
        }
        changes
    }

    /// Computes the objects and sources affected by trait changes.
    ///
    /// For each change this collects the object that changed, every object
    /// using the changed trait, and every object using a trait that directly
    /// requires the changed trait. Propagation stops after that single hop.
    pub fn calculate_affected_set(&self, changes: &[TraitChangeInfo]) -> AffectedSet {
        let mut affected = AffectedSet::default();

        for change in changes {
            let trait_name = &change.trait_name;
            affected.add(&change.object_name, || {
                format!("trait @{trait_name} {} on this object", describe(change.change_type))
            });

            if let Some(users) = self.trait_to_objects.get(trait_name) {
                for object in users {
                    affected.add(object, || {
                        format!(
                            "uses trait @{trait_name} which {} on {}",
                            describe(change.change_type),
                            change.object_name
                        )
                    });
                }
            }

            for dependent in self.get_dependent_traits(trait_name) {
                if let Some(users) = self.trait_to_objects.get(&dependent) {
                    for object in users {
                        affected.add(object, || {
                            format!("uses trait @{dependent} which requires @{trait_name}")
                        });
                    }
                }
            }
        }

        for object in &affected.objects {
            if let Some(info) = self.objects.get(object) {
                affected.sources.insert(info.source_id.clone());
            }
        }

        debug!(
            changes = changes.len(),
            objects = affected.objects.len(),
            sources = affected.sources.len(),
            "computed trait affected set"
        );
        affected
    }

    /// Expands a set of changed objects through template inheritance.
    ///
    /// Every object extending a changed template is added, transitively, so
    /// a template extending another template propagates to all instances.
    /// Trait-level fan-out is handled separately by
    /// [`calculate_affected_set`](Self::calculate_affected_set).
    pub fn calculate_recompilation_set<I, S>(&self, changed_objects: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = BTreeSet::new();
        let mut queue = VecDeque::new();
        for name in changed_objects {
            let name = name.as_ref().to_string();
            if result.insert(name.clone()) {
                queue.push_back(name);
            }
        }

        while let Some(name) = queue.pop_front() {
            if let Some(instances) = self.template_to_objects.get(&name) {
                for instance in instances {
                    if result.insert(instance.clone()) {
                        queue.push_back(instance.clone());
                    }
                }
            }
        }
        result
    }

    /// Removes all objects, snapshots and rules.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Removes all objects and snapshots but keeps the trait rules.
    pub fn clear_objects(&mut self) {
        self.objects.clear();
        self.trait_to_objects.clear();
        self.source_to_objects.clear();
        self.template_to_objects.clear();
        self.snapshots.clear();
    }

    /// Returns counts describing the graph.
    pub fn stats(&self) -> GraphStats {
        let rule_names: BTreeSet<&String> =
            self.dependencies.keys().chain(self.conflicts.keys()).collect();
        GraphStats {
            trait_rules: rule_names.len(),
            objects: self.objects.len(),
            traits_in_use: self.trait_to_objects.len(),
            sources: self.source_to_objects.len(),
            templates: self.template_to_objects.len(),
        }
    }

    /// Encodes rules and registrations as a JSON value (`version: 1`).
    ///
    /// Trait snapshots are session state and are not included.
    pub fn to_value(&self) -> Result<serde_json::Value, GraphError> {
        let doc = SerializedGraph {
            version: GRAPH_FORMAT_VERSION,
            dependencies: flatten_index(&self.dependencies),
            conflicts: flatten_index(&self.conflicts),
            objects: self.objects.values().cloned().collect(),
        };
        serde_json::to_value(doc).map_err(|e| GraphError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Restores a graph from a JSON value produced by [`to_value`](Self::to_value).
    ///
    /// Fails with [`GraphError::VersionMismatch`] before looking at anything
    /// else when the document version is not the supported one.
    pub fn from_value(value: serde_json::Value) -> Result<Self, GraphError> {
        let version = value.get("version").and_then(serde_json::Value::as_u64);
        match version {
            Some(v) if v == u64::from(GRAPH_FORMAT_VERSION) => {}
            Some(v) => {
                return Err(GraphError::VersionMismatch {
                    expected: GRAPH_FORMAT_VERSION,
                    actual: v,
                })
            }
            None => {
                return Err(GraphError::Serialization {
                    reason: "missing or non-numeric `version`".to_string(),
                })
            }
        }

        let doc: SerializedGraph =
            serde_json::from_value(value).map_err(|e| GraphError::Serialization {
                reason: e.to_string(),
            })?;

        let mut graph = Self::new();
        for (name, requires) in doc.dependencies {
            graph.register_trait(&name, requires, Vec::<String>::new());
        }
        for (name, conflicts) in doc.conflicts {
            graph.register_trait(&name, Vec::<String>::new(), conflicts);
        }
        for info in doc.objects {
            graph.register_object(info);
        }
        Ok(graph)
    }

    /// Serializes the graph to a JSON string.
    pub fn serialize(&self) -> Result<String, GraphError> {
        let value = self.to_value()?;
        serde_json::to_string(&value).map_err(|e| GraphError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Restores a graph from a JSON string produced by [`serialize`](Self::serialize).
    pub fn deserialize(json: &str) -> Result<Self, GraphError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| GraphError::Serialization {
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }
}

fn remove_from_index(index: &mut Index, key: &str, object: &str) {
    if let Some(set) = index.get_mut(key) {
        set.remove(object);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

fn flatten_index(index: &Index) -> Vec<(String, Vec<String>)> {
    index
        .iter()
        .map(|(key, set)| (key.clone(), set.iter().cloned().collect()))
        .collect()
}

fn describe(change: TraitChangeType) -> &'static str {
    match change {
        TraitChangeType::Added => "was added",
        TraitChangeType::Removed => "was removed",
        TraitChangeType::ConfigChanged => "changed configuration",
    }
}
