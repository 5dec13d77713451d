//! UV parameterization post-processing.
//!
//! An initial parameterization (from LSCM, ARAP, a projection, ...) may fold
//! over itself. This module repairs such maps with mean value coordinates
//! over a convex virtual boundary: the boundary polygon is embedded in its
//! convex hull and the interior is recomputed as a flip-free embedding.
//!
//! # Components
//!
//! - [`boundary`]: simplicity check of the UV boundary polygon
//! - [`hull`]: convex hull triangulation, gap face tagging, fixed vertices
//! - [`mvc`]: matrix assembly and the [`MvcPostProcessor`] driver
//! - [`solver`]: BiCGSTAB behind the [`LinearSolver`] trait
//! - [`sparse`]: CSR storage and the [`SparseBuilder`] assembler
//!
//! # Requirements
//!
//! The patch must have a boundary, and the UV image of the chosen boundary
//! loop must be a simple polygon with non-zero area.
//!
//! # Example
//!
//! ```no_run
//! use convexuv::prelude::*;
//! use convexuv::algo::parameterize::{repair_flips, MvcOptions};
//!
//! let (mesh, mut uv): (HalfEdgeMesh, _) = convexuv::io::load_with_uvs("patch.obj").unwrap();
//! println!("{} flipped faces", uv.count_flipped_faces(&mesh));
//!
//! repair_flips(&mesh, &mut uv, &MvcOptions::default()).unwrap();
//! assert_eq!(uv.count_flipped_faces(&mesh), 0);
//! ```

pub mod boundary;
pub mod hull;
pub mod mvc;
pub mod solver;
pub mod sparse;
mod uv;

pub use boundary::{find_boundary_intersection, is_polygon_simple, BoundaryIntersection};
pub use hull::{
    color_faces, fix_convex_hull_border, triangulate_convex_hull, FaceColoring, FixedVertices,
    GapCdt, GapTriangulation, GapVertex,
};
pub use mvc::{
    assemble_matrix, assign_solution, compute_rhs, repair_flips, repair_flips_with_progress,
    MvcOptions, MvcPostProcessor,
};
pub use solver::{solve_mvc, BiCgStab, LinearSolver, Preconditioner};
pub use sparse::{CsrMatrix, SparseBuilder};
pub use uv::{UVMap, VertexIndexMap};
