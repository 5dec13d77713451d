//! # convexuv
//!
//! Flip repair for UV parameterizations of triangle mesh patches.
//!
//! A parameterization produced by some other method may contain triangles
//! whose UV image is folded over. convexuv keeps the UV boundary polygon,
//! fills the region between it and its convex hull with a constrained
//! triangulation, and recomputes every interior UV coordinate as a mean
//! value coordinate combination of its neighbors. Since the outer border of
//! the combined domain is convex, the result is a flip-free embedding.
//!
//! ## Features
//!
//! - **Half-edge data structure**: boundary loop traversal with type-safe indices
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Hull gap triangulation**: constrained Delaunay triangulation via spade
//! - **Sparse solving**: BiCGSTAB with ILU(0) preconditioning, axes solved in parallel
//! - **OBJ I/O**: geometry and per-vertex texture coordinates
//!
//! ## Quick Start
//!
//! ```no_run
//! use convexuv::prelude::*;
//! use convexuv::algo::parameterize::{repair_flips, MvcOptions};
//!
//! let (mesh, mut uv): (HalfEdgeMesh, _) = convexuv::io::load_with_uvs("patch.obj").unwrap();
//! println!("flipped before: {}", uv.count_flipped_faces(&mesh));
//!
//! repair_flips(&mesh, &mut uv, &MvcOptions::default()).unwrap();
//! println!("flipped after: {}", uv.count_flipped_faces(&mesh));
//!
//! convexuv::io::save_with_uvs(&mesh, &uv, "repaired.obj").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use convexuv::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! let border = mesh.longest_boundary_loop().unwrap();
//! assert_eq!(mesh.loop_halfedges(border).count(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod geom;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use convexuv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::parameterize::UVMap;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_triangles, to_face_vertex, Face, FaceId, HalfEdge, HalfEdgeId, HalfEdgeMesh,
        MeshIndex, Vertex, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_open_fan_has_one_boundary_loop() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1]];

        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 4);
        // 12 interior half-edges plus 4 boundary ones
        assert_eq!(mesh.num_halfedges(), 16);
        assert!(mesh.is_valid());

        let loops = mesh.boundary_loops();
        assert_eq!(loops.len(), 1);
        let rim: Vec<_> = mesh
            .loop_halfedges(loops[0])
            .map(|he| mesh.origin(he))
            .collect();
        assert_eq!(rim.len(), 4);
        assert!(!rim.contains(&VertexId::new(0)));
    }
}
