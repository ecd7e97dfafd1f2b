//! Trait dependency tracking for incremental recompilation.
//!
//! Records which objects use which traits and templates, which traits require
//! or conflict with others, and computes the objects that must be rebuilt when
//! a trait, its configuration, or a template changes.

#![warn(missing_docs)]

pub mod builtin;
pub mod error;
pub mod graph;
pub mod types;

pub use error::GraphError;
pub use graph::{GraphStats, TraitDependencyGraph, GRAPH_FORMAT_VERSION};
pub use types::{
    AffectedSet, ObjectTraitInfo, TraitChangeInfo, TraitChangeType, TraitDefinition,
};
