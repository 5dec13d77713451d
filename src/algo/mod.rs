//! Geometry processing algorithms.
//!
//! - **Parameterization**: flip repair of UV maps with mean value
//!   coordinates over a convex virtual boundary
//!
//! Long-running operations accept a [`Progress`] callback.

pub mod parameterize;
mod progress;

pub use progress::Progress;
