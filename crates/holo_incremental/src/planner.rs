//! The recompilation planner.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use holo_diff::DiffResult;
use holo_scene::{Composition, ObjectDecl, ObjectIndex};
use holo_traits::{GraphStats, ObjectTraitInfo, TraitDependencyGraph};
use serde_json::Value;
use tracing::{debug, info};

use crate::object_cache::{CacheEntry, ObjectCache};
use crate::options::CompileOptions;
use crate::state::StateSnapshot;

/// Output of one [`IncrementalCompiler::compile`] call.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Output of every object in pre-order, joined with newlines.
    pub compiled_code: String,
    /// Objects whose compile callback ran.
    pub recompiled_objects: Vec<String>,
    /// Objects served from the cache.
    pub cached_objects: Vec<String>,
    /// Diff against the previous snapshot.
    pub diff: DiffResult,
    /// `true` when nothing was served from the cache.
    pub full_recompile: bool,
    /// Saved runtime state, when requested via
    /// [`CompileOptions::preserve_state`].
    pub preserved_state: Option<StateSnapshot>,
}

/// Counts describing the planner's retained state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerStats {
    /// Objects with cached output.
    pub cached_objects: usize,
    /// Objects with explicit dependencies recorded.
    pub tracked_dependencies: usize,
    /// Whether a baseline snapshot is retained for the next diff.
    pub has_baseline: bool,
    /// Trait graph counts.
    pub graph: GraphStats,
}

/// Decides which objects of a composition need recompiling and caches the
/// output of the rest.
///
/// Objects are identified by name only: renaming an object is seen as
/// removing the old one and adding a new one.
#[derive(Debug, Clone)]
pub struct IncrementalCompiler {
    pub(crate) graph: TraitDependencyGraph,
    pub(crate) cache: ObjectCache,
    /// object -> objects it depends on
    pub(crate) dependencies: BTreeMap<String, Vec<String>>,
    pub(crate) previous: Option<Composition>,
    state: Option<StateSnapshot>,
}

impl Default for IncrementalCompiler {
    fn default() -> Self {
        Self::new(TraitDependencyGraph::with_builtin_traits())
    }
}

impl IncrementalCompiler {
    /// Creates a planner that owns `graph`.
    pub fn new(graph: TraitDependencyGraph) -> Self {
        Self {
            graph,
            cache: ObjectCache::new(),
            dependencies: BTreeMap::new(),
            previous: None,
            state: None,
        }
    }

    /// Compiles `snapshot`, recompiling only what changed since the last call.
    ///
    /// An object is recompiled when it was added or modified, is listed in
    /// `force_recompile`, transitively depends on such an object, extends a
    /// changed template, or depends on a removed object. Everything else is
    /// served from the cache if its content hash still matches.
    pub fn compile<F>(
        &mut self,
        snapshot: &Composition,
        mut compile_object: F,
        options: &CompileOptions,
    ) -> CompileResult
    where
        F: FnMut(&ObjectDecl) -> String,
    {
        let diff = holo_diff::diff(self.previous.as_ref(), snapshot);

        let seed: BTreeSet<String> = diff
            .added_objects
            .iter()
            .chain(&diff.modified_objects)
            .chain(&options.force_recompile)
            .cloned()
            .collect();

        let mut dirty = self.collect_dependents(&seed);
        dirty.extend(self.graph.calculate_recompilation_set(&seed));
        let removed: BTreeSet<String> = diff.removed_objects.iter().cloned().collect();
        dirty.extend(self.collect_dependents(&removed));
        debug!(seed = seed.len(), dirty = dirty.len(), "recompilation set");

        let index = ObjectIndex::build(snapshot);
        let mut outputs = Vec::with_capacity(index.len());
        let mut recompiled_objects = Vec::new();
        let mut cached_objects = Vec::new();

        for entry in index.iter() {
            let object = entry.object;
            let name = object.name.as_str();
            let hash = object.content_hash();
            self.register(object, &snapshot.name);

            let reusable = options.skip_unchanged && !dirty.contains(name);
            let cached = reusable
                .then(|| self.cache.get(name, &hash))
                .flatten()
                .map(|entry| entry.compiled_code.clone());

            match cached {
                Some(code) => {
                    outputs.push(code);
                    cached_objects.push(name.to_string());
                }
                None => {
                    let code = compile_object(object);
                    let deps = self.dependencies.get(name).cloned().unwrap_or_default();
                    self.cache.set(name, hash, code.clone(), deps);
                    outputs.push(code);
                    recompiled_objects.push(name.to_string());
                }
            }
        }

        for name in &diff.removed_objects {
            self.graph.unregister_object(name);
            self.cache.remove(name);
            self.dependencies.remove(name);
        }

        info!(
            composition = %snapshot.name,
            recompiled = recompiled_objects.len(),
            cached = cached_objects.len(),
            removed = diff.removed_objects.len(),
            "incremental compile"
        );

        self.previous = Some(snapshot.clone());
        CompileResult {
            compiled_code: outputs.join("\n"),
            full_recompile: cached_objects.is_empty(),
            recompiled_objects,
            cached_objects,
            diff,
            preserved_state: if options.preserve_state {
                self.state.clone()
            } else {
                None
            },
        }
    }

    fn register(&mut self, object: &ObjectDecl, source_id: &str) {
        self.graph.unregister_object(&object.name);
        let mut info = ObjectTraitInfo::new(&object.name, source_id, object.trait_usages());
        if let Some(template) = &object.template {
            info = info.with_template(template);
        }
        self.graph.register_object(info);
    }

    /// The given objects plus everything that transitively depends on them.
    fn collect_dependents(&self, names: &BTreeSet<String>) -> BTreeSet<String> {
        let mut result = names.clone();
        let mut queue: VecDeque<String> = names.iter().cloned().collect();
        while let Some(name) = queue.pop_front() {
            for dependent in self.get_dependents(&name) {
                if result.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        result
    }

    /// Records the objects `object` depends on, replacing earlier ones.
    pub fn update_dependencies<I, S>(&mut self, object: &str, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deps: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        if deps.is_empty() {
            self.dependencies.remove(object);
        } else {
            self.dependencies.insert(object.to_string(), deps);
        }
    }

    /// Objects that list `object` as a direct dependency.
    pub fn get_dependents(&self, object: &str) -> BTreeSet<String> {
        self.dependencies
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == object))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Cached output for `name`, if it was compiled from content `hash`.
    pub fn get_cached(&self, name: &str, hash: &str) -> Option<&CacheEntry> {
        self.cache.get(name, hash)
    }

    /// Stores output for `name` as if it had been compiled from `hash`.
    pub fn set_cached(
        &mut self,
        name: &str,
        hash: &str,
        compiled_code: &str,
        dependencies: Vec<String>,
    ) {
        self.cache.set(name, hash, compiled_code, dependencies);
    }

    /// Saves a copy of per-object runtime state.
    pub fn save_state(&mut self, state: &BTreeMap<String, Value>) {
        self.state = Some(StateSnapshot::capture(state));
    }

    /// The last saved runtime state.
    pub fn restore_state(&self) -> Option<&StateSnapshot> {
        self.state.as_ref()
    }

    /// Discards the saved runtime state.
    pub fn clear_state(&mut self) {
        self.state = None;
    }

    /// The planner's trait graph.
    pub fn trait_graph(&self) -> &TraitDependencyGraph {
        &self.graph
    }

    /// Mutable access to the planner's trait graph, e.g. to register rules.
    pub fn trait_graph_mut(&mut self) -> &mut TraitDependencyGraph {
        &mut self.graph
    }

    /// The snapshot the next compile will be diffed against.
    pub fn baseline(&self) -> Option<&Composition> {
        self.previous.as_ref()
    }

    /// Forgets everything except the trait rules.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.dependencies.clear();
        self.previous = None;
        self.state = None;
        self.graph.clear_objects();
    }

    /// Counts describing the retained state.
    pub fn stats(&self) -> PlannerStats {
        PlannerStats {
            cached_objects: self.cache.len(),
            tracked_dependencies: self.dependencies.len(),
            has_baseline: self.previous.is_some(),
            graph: self.graph.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use holo_scene::SpatialGroup;
    use serde_json::json;

    use super::*;

    fn orb(name: &str, radius: i64) -> ObjectDecl {
        ObjectDecl::new(name)
            .with_kind("orb")
            .with_property("radius", json!(radius))
    }

    fn scene(objects: Vec<ObjectDecl>) -> Composition {
        objects
            .into_iter()
            .fold(Composition::new("Demo"), Composition::with_object)
    }

    fn emit(object: &ObjectDecl) -> String {
        format!("// {}", object.name)
    }

    #[test]
    fn first_compile_is_full() {
        let mut planner = IncrementalCompiler::default();
        let result = planner.compile(
            &scene(vec![orb("a", 1), orb("b", 1)]),
            emit,
            &CompileOptions::default(),
        );
        assert!(result.full_recompile);
        assert_eq!(result.recompiled_objects, vec!["a", "b"]);
        assert_eq!(result.compiled_code, "// a\n// b");
        assert_eq!(result.diff.added_objects, vec!["a", "b"]);
    }

    #[test]
    fn unchanged_objects_come_from_cache() {
        let mut planner = IncrementalCompiler::default();
        let opts = CompileOptions::default();
        planner.compile(&scene(vec![orb("a", 1), orb("b", 1)]), emit, &opts);

        let result = planner.compile(&scene(vec![orb("a", 2), orb("b", 1)]), emit, &opts);
        assert!(!result.full_recompile);
        assert_eq!(result.recompiled_objects, vec!["a"]);
        assert_eq!(result.cached_objects, vec!["b"]);
        assert_eq!(result.compiled_code, "// a\n// b");
    }

    #[test]
    fn skip_unchanged_false_recompiles_everything() {
        let mut planner = IncrementalCompiler::default();
        let s = scene(vec![orb("a", 1), orb("b", 1)]);
        planner.compile(&s, emit, &CompileOptions::default());

        let opts = CompileOptions {
            skip_unchanged: false,
            ..CompileOptions::default()
        };
        let result = planner.compile(&s, emit, &opts);
        assert_eq!(result.recompiled_objects.len(), 2);
        assert!(result.full_recompile);
    }

    #[test]
    fn forced_objects_recompile() {
        let mut planner = IncrementalCompiler::default();
        let s = scene(vec![orb("a", 1), orb("b", 1)]);
        planner.compile(&s, emit, &CompileOptions::default());

        let result = planner.compile(&s, emit, &CompileOptions::default().force("b"));
        assert_eq!(result.recompiled_objects, vec!["b"]);
        assert_eq!(result.cached_objects, vec!["a"]);
    }

    #[test]
    fn dependents_follow_changes_transitively() {
        let mut planner = IncrementalCompiler::default();
        let opts = CompileOptions::default();
        planner.update_dependencies("b", ["a"]);
        planner.update_dependencies("c", ["b"]);
        planner.compile(&scene(vec![orb("a", 1), orb("b", 1), orb("c", 1), orb("d", 1)]), emit, &opts);

        let result = planner.compile(
            &scene(vec![orb("a", 5), orb("b", 1), orb("c", 1), orb("d", 1)]),
            emit,
            &opts,
        );
        assert_eq!(result.recompiled_objects, vec!["a", "b", "c"]);
        assert_eq!(result.cached_objects, vec!["d"]);
    }

    #[test]
    fn removed_dependency_recompiles_dependents() {
        let mut planner = IncrementalCompiler::default();
        let opts = CompileOptions::default();
        planner.update_dependencies("user", ["lib"]);
        planner.compile(&scene(vec![orb("lib", 1), orb("user", 1)]), emit, &opts);

        let result = planner.compile(&scene(vec![orb("user", 1)]), emit, &opts);
        assert_eq!(result.diff.removed_objects, vec!["lib"]);
        assert_eq!(result.recompiled_objects, vec!["user"]);
        assert!(planner.get_cached("lib", &orb("lib", 1).content_hash()).is_none());
        assert!(planner.trait_graph().object("lib").is_none());
    }

    #[test]
    fn removed_object_drops_its_dependency_record() {
        let mut planner = IncrementalCompiler::default();
        let opts = CompileOptions::default();
        planner.update_dependencies("user", ["lib"]);
        planner.compile(&scene(vec![orb("lib", 1), orb("user", 1)]), emit, &opts);
        assert_eq!(planner.stats().tracked_dependencies, 1);

        planner.compile(&scene(vec![orb("lib", 1)]), emit, &opts);
        assert_eq!(planner.stats().tracked_dependencies, 0);
        assert!(planner.get_dependents("lib").is_empty());
    }

    #[test]
    fn output_follows_preorder() {
        let mut planner = IncrementalCompiler::default();
        let parent = orb("parent", 1).with_child(orb("child", 1));
        let s = Composition::new("Demo")
            .with_object(parent)
            .with_group(SpatialGroup::new("zone").with_object(orb("member", 1)));
        let result = planner.compile(&s, emit, &CompileOptions::default());
        assert_eq!(result.compiled_code, "// parent\n// child\n// member");
    }

    #[test]
    fn registrations_track_trait_changes() {
        let mut planner = IncrementalCompiler::default();
        let opts = CompileOptions::default();
        planner.compile(&scene(vec![orb("ball", 1).with_trait("grabbable")]), emit, &opts);
        assert!(planner
            .trait_graph()
            .get_objects_using_trait("grabbable")
            .contains("ball"));

        planner.compile(&scene(vec![orb("ball", 1).with_trait("physics")]), emit, &opts);
        let graph = planner.trait_graph();
        assert!(graph.get_objects_using_trait("grabbable").is_empty());
        assert!(graph.get_objects_using_trait("physics").contains("ball"));
        assert!(graph.get_objects_in_source("Demo").contains("ball"));
    }

    #[test]
    fn compile_callback_runs_once_per_dirty_object() {
        let mut planner = IncrementalCompiler::default();
        let calls = RefCell::new(Vec::new());
        let opts = CompileOptions::default();
        let s = scene(vec![orb("a", 1), orb("b", 1)]);
        let record = |o: &ObjectDecl| {
            calls.borrow_mut().push(o.name.clone());
            emit(o)
        };
        planner.compile(&s, record, &opts);
        planner.compile(&s, record, &opts);
        assert_eq!(*calls.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn state_is_returned_when_preserving() {
        let mut planner = IncrementalCompiler::default();
        let mut live = BTreeMap::new();
        live.insert("counter".to_string(), json!({ "count": 4 }));
        planner.save_state(&live);

        let opts = CompileOptions {
            preserve_state: true,
            ..CompileOptions::default()
        };
        let result = planner.compile(&scene(vec![orb("counter", 1)]), emit, &opts);
        let state = result.preserved_state.unwrap();
        assert_eq!(state.get("counter"), Some(&json!({ "count": 4 })));

        let result = planner.compile(&scene(vec![orb("counter", 1)]), emit, &CompileOptions::default());
        assert!(result.preserved_state.is_none());

        planner.clear_state();
        assert!(planner.restore_state().is_none());
    }

    #[test]
    fn set_and_get_cached() {
        let mut planner = IncrementalCompiler::default();
        planner.set_cached("x", "h1", "code", vec![]);
        assert_eq!(planner.get_cached("x", "h1").unwrap().compiled_code, "code");
        assert!(planner.get_cached("x", "h2").is_none());
    }

    #[test]
    fn update_dependencies_replaces() {
        let mut planner = IncrementalCompiler::default();
        planner.update_dependencies("b", ["a"]);
        assert!(planner.get_dependents("a").contains("b"));
        planner.update_dependencies("b", ["c"]);
        assert!(planner.get_dependents("a").is_empty());
        assert!(planner.get_dependents("c").contains("b"));
        planner.update_dependencies("b", Vec::<String>::new());
        assert_eq!(planner.stats().tracked_dependencies, 0);
    }

    #[test]
    fn reset_keeps_rules() {
        let mut planner = IncrementalCompiler::default();
        planner.compile(&scene(vec![orb("a", 1).with_trait("physics")]), emit, &CompileOptions::default());
        planner.reset();

        let stats = planner.stats();
        assert_eq!(stats.cached_objects, 0);
        assert!(!stats.has_baseline);
        assert_eq!(stats.graph.objects, 0);
        assert!(planner
            .trait_graph()
            .get_required_traits("physics")
            .contains("collidable"));
    }
}
