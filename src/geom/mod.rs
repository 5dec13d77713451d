//! Planar geometry predicates.
//!
//! Used on UV coordinates only. Nothing here knows about meshes.

pub mod predicates;

pub use predicates::{orient2d, segments_intersect};
