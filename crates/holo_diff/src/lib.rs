//! Structural differ for HoloScript scene graph snapshots.
//!
//! Compares two [`Composition`](holo_scene::Composition) snapshots by object
//! name and produces a typed change list plus the derived sets of added,
//! removed, modified and unchanged object names.

#![warn(missing_docs)]

pub mod change;
pub mod differ;

pub use change::{AstChange, ChangeType, DiffResult, NodeKind};
pub use differ::{diff, diff_object};
