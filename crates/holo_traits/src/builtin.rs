//! Standard HoloScript trait rules.

use crate::graph::TraitDependencyGraph;

/// `(trait, requires, conflicts)` for the standard trait catalog.
const BUILTIN_RULES: &[(&str, &[&str], &[&str])] = &[
    ("throwable", &["grabbable"], &[]),
    ("equippable", &["grabbable"], &[]),
    ("stackable", &["collidable"], &[]),
    ("physics", &["collidable"], &["kinematic"]),
    ("rigid", &["physics"], &["kinematic"]),
    ("gravity", &["physics"], &[]),
    ("kinematic", &[], &["physics", "rigid"]),
    ("grabbable", &[], &["world_locked"]),
    ("world_locked", &[], &["grabbable", "hand_tracked"]),
    ("synced", &["networked"], &[]),
    ("owned", &["networked"], &[]),
    ("persistent", &["state"], &[]),
    ("reactive", &["state"], &[]),
    ("computed", &["state"], &[]),
    ("observable", &["state"], &[]),
    ("ui_button", &["clickable"], &[]),
    ("ui_slider", &["draggable"], &[]),
];

impl TraitDependencyGraph {
    /// Creates a graph preloaded with the standard trait rules.
    ///
    /// This is the one place default rules are installed; planners receive
    /// the resulting graph by value.
    pub fn with_builtin_traits() -> Self {
        let mut graph = Self::new();
        for (name, requires, conflicts) in BUILTIN_RULES {
            graph.register_trait(name, requires.iter().copied(), conflicts.iter().copied());
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_loaded() {
        let graph = TraitDependencyGraph::with_builtin_traits();
        assert!(graph.get_required_traits("throwable").contains("grabbable"));
        assert!(graph.get_conflicting_traits("kinematic").contains("physics"));
        assert!(graph.get_dependent_traits("state").contains("reactive"));
        assert_eq!(graph.stats().objects, 0);
    }
}
