//! Scene graph data model consumed by the incremental build core.
//!
//! A [`Composition`] is an immutable snapshot produced by the HoloScript parser
//! for one edit. Objects are identified purely by name: renaming an object is
//! indistinguishable from removing the old name and adding the new one.

#![warn(missing_docs)]

pub mod index;
pub mod types;

pub use index::{ObjectEntry, ObjectIndex};
pub use types::{Composition, ObjectDecl, Property, SpatialGroup, TraitSpec, TraitUsage};
