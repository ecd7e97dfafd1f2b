//! Name-keyed pre-order index over a composition.

use std::collections::HashMap;

use crate::types::{Composition, ObjectDecl, SpatialGroup};

/// An object reached during traversal together with its path from the root.
#[derive(Debug, Clone, Copy)]
pub struct ObjectEntry<'a> {
    /// Names from the composition root down to (and including) this object.
    pub path: &'a [String],
    /// The object itself.
    pub object: &'a ObjectDecl,
}

/// Pre-order index of every object in a composition, keyed by name.
///
/// Parents precede their children; spatial groups contribute their members
/// but are not indexed themselves. Duplicate names are last-write-wins: the
/// later object replaces the earlier one but keeps the earlier position.
#[derive(Debug)]
pub struct ObjectIndex<'a> {
    paths: Vec<Vec<String>>,
    objects: Vec<&'a ObjectDecl>,
    by_name: HashMap<&'a str, usize>,
}

impl<'a> ObjectIndex<'a> {
    /// Builds the index for a composition.
    pub fn build(composition: &'a Composition) -> Self {
        let mut index = Self {
            paths: Vec::new(),
            objects: Vec::new(),
            by_name: HashMap::new(),
        };
        let root = vec![composition.name.clone()];
        for template in &composition.templates {
            index.visit(template, &root);
        }
        for object in &composition.objects {
            index.visit(object, &root);
        }
        for group in &composition.spatial_groups {
            index.visit_group(group, &root);
        }
        index
    }

    fn visit(&mut self, object: &'a ObjectDecl, parent: &[String]) {
        let mut path = parent.to_vec();
        path.push(object.name.clone());

        match self.by_name.get(object.name.as_str()) {
            Some(&slot) => {
                self.objects[slot] = object;
                self.paths[slot] = path.clone();
            }
            None => {
                self.by_name.insert(object.name.as_str(), self.objects.len());
                self.objects.push(object);
                self.paths.push(path.clone());
            }
        }

        for child in &object.children {
            self.visit(child, &path);
        }
    }

    fn visit_group(&mut self, group: &'a SpatialGroup, parent: &[String]) {
        let mut path = parent.to_vec();
        path.push(group.name.clone());
        for object in &group.objects {
            self.visit(object, &path);
        }
        for nested in &group.groups {
            self.visit_group(nested, &path);
        }
    }

    /// Looks up an object by name.
    pub fn get(&self, name: &str) -> Option<ObjectEntry<'_>> {
        self.by_name.get(name).map(|&slot| self.entry(slot))
    }

    /// Returns `true` if an object with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterates objects in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = ObjectEntry<'_>> + '_ {
        (0..self.objects.len()).map(move |slot| self.entry(slot))
    }

    /// Object names in pre-order.
    pub fn names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }

    /// Number of distinct object names.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the composition has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn entry(&self, slot: usize) -> ObjectEntry<'_> {
        ObjectEntry {
            path: &self.paths[slot],
            object: self.objects[slot],
        }
    }
}
