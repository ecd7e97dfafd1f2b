//! Per-call compile options.

/// Options for [`IncrementalCompiler::compile`](crate::IncrementalCompiler::compile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Return the saved runtime state snapshot with the result so the caller
    /// can re-apply it to the recompiled objects.
    pub preserve_state: bool,
    /// Objects to recompile regardless of the diff.
    pub force_recompile: Vec<String>,
    /// Serve unchanged objects from the cache. When `false` every object is
    /// recompiled.
    pub skip_unchanged: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            preserve_state: false,
            force_recompile: Vec::new(),
            skip_unchanged: true,
        }
    }
}

impl CompileOptions {
    /// Adds an object to the forced recompilation list.
    pub fn force(mut self, name: impl Into<String>) -> Self {
        self.force_recompile.push(name.into());
        self
    }
}
