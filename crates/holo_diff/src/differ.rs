//! Snapshot and object comparison.

use std::collections::{BTreeMap, HashSet};

use holo_scene::{Composition, ObjectDecl, ObjectIndex, Property, TraitUsage};
use serde_json::Value;
use tracing::debug;

use crate::change::{AstChange, ChangeType, DiffResult, NodeKind};

/// Diffs two composition snapshots.
///
/// With no old snapshot every object in `new` is reported as added and no
/// property or trait changes are computed. Otherwise objects are matched by
/// name across both snapshots; there is no identity beyond the name, so a
/// rename shows up as one removal plus one addition.
pub fn diff(old: Option<&Composition>, new: &Composition) -> DiffResult {
    let new_index = ObjectIndex::build(new);
    let mut result = DiffResult::default();
    let mut changes = ChangeCollector::default();

    let Some(old) = old else {
        for entry in new_index.iter() {
            result.added_objects.push(entry.object.name.clone());
            changes.push(
                AstChange::new(ChangeType::Added, entry.path.to_vec(), NodeKind::Object)
                    .with_new(object_value(entry.object)),
            );
        }
        return finish(result, changes);
    };

    let old_index = ObjectIndex::build(old);
    let scope = Scope {
        old: Some(&old_index),
        new: Some(&new_index),
    };

    if old.name != new.name {
        changes.push(
            AstChange::new(ChangeType::Modified, vec![new.name.clone()], NodeKind::Composition)
                .with_old(Some(Value::String(old.name.clone())))
                .with_new(Some(Value::String(new.name.clone()))),
        );
    }
    if old.logic != new.logic {
        changes.push(
            AstChange::new(
                ChangeType::Modified,
                vec![new.name.clone(), "logic".to_string()],
                NodeKind::Logic,
            )
            .with_old(old.logic.clone())
            .with_new(new.logic.clone()),
        );
    }

    for entry in new_index.iter() {
        let name = &entry.object.name;
        match old_index.get(name) {
            None => {
                result.added_objects.push(name.clone());
                changes.push(
                    AstChange::new(ChangeType::Added, entry.path.to_vec(), NodeKind::Object)
                        .with_new(object_value(entry.object)),
                );
            }
            Some(old_entry) => {
                let object_changes =
                    compare_objects(old_entry.object, entry.object, entry.path, scope);
                if object_changes.is_empty() {
                    result.unchanged_objects.push(name.clone());
                } else {
                    result.modified_objects.push(name.clone());
                    changes.extend(object_changes);
                }
            }
        }
    }

    for entry in old_index.iter() {
        if !new_index.contains(&entry.object.name) {
            result.removed_objects.push(entry.object.name.clone());
            changes.push(
                AstChange::new(ChangeType::Removed, entry.path.to_vec(), NodeKind::Object)
                    .with_old(object_value(entry.object)),
            );
        }
    }

    finish(result, changes)
}

/// Diffs two versions of the same object.
///
/// `path` is the path of the object itself; emitted changes extend it with the
/// property key, trait name, `logic`, or child name. Children present in both
/// versions are compared recursively; a child present only on one side is
/// reported once as an added or removed object without expanding its subtree.
pub fn diff_object(old: &ObjectDecl, new: &ObjectDecl, path: &[String]) -> Vec<AstChange> {
    compare_objects(old, new, path, Scope::default())
}

/// Where names can be found outside the pair of objects being compared.
///
/// Inside a full snapshot diff a child that disappears from one parent but
/// still exists elsewhere has moved, not been removed.
#[derive(Clone, Copy, Default)]
struct Scope<'s> {
    old: Option<&'s ObjectIndex<'s>>,
    new: Option<&'s ObjectIndex<'s>>,
}

impl Scope<'_> {
    fn in_old(&self, name: &str) -> bool {
        self.old.is_some_and(|index| index.contains(name))
    }

    fn in_new(&self, name: &str) -> bool {
        self.new.is_some_and(|index| index.contains(name))
    }
}

fn compare_objects(
    old: &ObjectDecl,
    new: &ObjectDecl,
    path: &[String],
    scope: Scope<'_>,
) -> Vec<AstChange> {
    let mut changes = Vec::new();
    diff_properties(&old.properties, &new.properties, path, &mut changes);
    diff_traits(&old.trait_usages(), &new.trait_usages(), path, &mut changes);

    if old.logic != new.logic {
        changes.push(
            AstChange::new(ChangeType::Modified, child_path(path, "logic"), NodeKind::Logic)
                .with_old(old.logic.clone())
                .with_new(new.logic.clone()),
        );
    }

    diff_children(&old.children, &new.children, path, scope, &mut changes);
    changes
}

fn diff_properties(old: &[Property], new: &[Property], path: &[String], out: &mut Vec<AstChange>) {
    let old_by_key: BTreeMap<&str, &Property> = old.iter().map(|p| (p.key.as_str(), p)).collect();
    let new_by_key: BTreeMap<&str, &Property> = new.iter().map(|p| (p.key.as_str(), p)).collect();

    for (key, new_prop) in &new_by_key {
        match old_by_key.get(key) {
            None => out.push(
                AstChange::new(ChangeType::Added, child_path(path, key), NodeKind::Property)
                    .with_new(Some(new_prop.value.clone())),
            ),
            Some(old_prop) if old_prop != new_prop => out.push(
                AstChange::new(ChangeType::Modified, child_path(path, key), NodeKind::Property)
                    .with_old(Some(old_prop.value.clone()))
                    .with_new(Some(new_prop.value.clone())),
            ),
            Some(_) => {}
        }
    }

    for (key, old_prop) in &old_by_key {
        if !new_by_key.contains_key(key) {
            out.push(
                AstChange::new(ChangeType::Removed, child_path(path, key), NodeKind::Property)
                    .with_old(Some(old_prop.value.clone())),
            );
        }
    }
}

fn diff_traits(old: &[TraitUsage], new: &[TraitUsage], path: &[String], out: &mut Vec<AstChange>) {
    let old_by_name: BTreeMap<&str, &TraitUsage> = old.iter().map(|t| (t.name.as_str(), t)).collect();
    let new_by_name: BTreeMap<&str, &TraitUsage> = new.iter().map(|t| (t.name.as_str(), t)).collect();

    for (name, new_usage) in &new_by_name {
        match old_by_name.get(name) {
            None => out.push(
                AstChange::new(ChangeType::Added, child_path(path, name), NodeKind::Trait)
                    .with_new(usage_value(new_usage)),
            ),
            Some(old_usage) if old_usage.config_hash != new_usage.config_hash => out.push(
                AstChange::new(ChangeType::Modified, child_path(path, name), NodeKind::Trait)
                    .with_old(usage_value(old_usage))
                    .with_new(usage_value(new_usage))
                    .with_detail("config_changed"),
            ),
            Some(_) => {}
        }
    }

    for (name, old_usage) in &old_by_name {
        if !new_by_name.contains_key(name) {
            out.push(
                AstChange::new(ChangeType::Removed, child_path(path, name), NodeKind::Trait)
                    .with_old(usage_value(old_usage)),
            );
        }
    }
}

fn diff_children(
    old: &[ObjectDecl],
    new: &[ObjectDecl],
    path: &[String],
    scope: Scope<'_>,
    out: &mut Vec<AstChange>,
) {
    let old_by_name: BTreeMap<&str, &ObjectDecl> = old.iter().map(|c| (c.name.as_str(), c)).collect();
    let mut moved_in = Vec::new();
    let mut moved_out = Vec::new();

    for child in new {
        let child_path = child_path(path, &child.name);
        match old_by_name.get(child.name.as_str()) {
            Some(old_child) => out.extend(compare_objects(old_child, child, &child_path, scope)),
            None if scope.in_old(&child.name) => moved_in.push(Value::String(child.name.clone())),
            None => out.push(
                AstChange::new(ChangeType::Added, child_path, NodeKind::Object)
                    .with_new(object_value(child)),
            ),
        }
    }

    for child in old {
        if new.iter().any(|c| c.name == child.name) {
            continue;
        }
        if scope.in_new(&child.name) {
            moved_out.push(Value::String(child.name.clone()));
        } else {
            out.push(
                AstChange::new(ChangeType::Removed, child_path(path, &child.name), NodeKind::Object)
                    .with_old(object_value(child)),
            );
        }
    }

    // Children that changed parent are compared where the snapshot index
    // finds them; the parents only record that their child list changed.
    if !moved_in.is_empty() || !moved_out.is_empty() {
        out.push(
            AstChange::new(ChangeType::Modified, path.to_vec(), NodeKind::Object)
                .with_old(Some(Value::Array(moved_out)))
                .with_new(Some(Value::Array(moved_in)))
                .with_detail("children_moved"),
        );
    }
}

/// Deduplicates changes reported both by an object and by its ancestors.
#[derive(Default)]
struct ChangeCollector {
    seen: HashSet<(Vec<String>, NodeKind, ChangeType)>,
    changes: Vec<AstChange>,
}

impl ChangeCollector {
    fn push(&mut self, change: AstChange) {
        let key = (change.path.clone(), change.node_type, change.change_type);
        if self.seen.insert(key) {
            self.changes.push(change);
        }
    }

    fn extend(&mut self, changes: impl IntoIterator<Item = AstChange>) {
        for change in changes {
            self.push(change);
        }
    }
}

fn finish(mut result: DiffResult, changes: ChangeCollector) -> DiffResult {
    result.changes = changes.changes;
    result.has_changes = !result.changes.is_empty();
    debug!(
        added = result.added_objects.len(),
        removed = result.removed_objects.len(),
        modified = result.modified_objects.len(),
        unchanged = result.unchanged_objects.len(),
        changes = result.changes.len(),
        "scene diff complete"
    );
    result
}

fn child_path(path: &[String], name: &str) -> Vec<String> {
    let mut out = path.to_vec();
    out.push(name.to_string());
    out
}

fn object_value(object: &ObjectDecl) -> Option<Value> {
    serde_json::to_value(object).ok()
}

fn usage_value(usage: &TraitUsage) -> Option<Value> {
    serde_json::to_value(usage).ok()
}
