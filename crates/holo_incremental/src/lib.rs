//! Incremental recompilation planner for HoloScript compositions.
//!
//! The [`IncrementalCompiler`] diffs each new composition snapshot against
//! the previous one, expands the set of dirty objects through explicit
//! object dependencies and template inheritance, and recompiles only those
//! objects, serving everything else from its in-memory [`ObjectCache`].

#![warn(missing_docs)]

pub mod error;
pub mod object_cache;
pub mod options;
pub mod persist;
pub mod planner;
pub mod state;

pub use error::PlannerError;
pub use object_cache::{CacheEntry, ObjectCache};
pub use options::CompileOptions;
pub use persist::CACHE_FORMAT_VERSION;
pub use planner::{CompileResult, IncrementalCompiler, PlannerStats};
pub use state::StateSnapshot;
