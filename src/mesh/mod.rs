//! Core mesh data structures.
//!
//! The primary type is [`HalfEdgeMesh`], a triangle mesh stored as a
//! half-edge (doubly-connected edge list) structure. Elements are identified
//! by type-safe indices ([`VertexId`], [`HalfEdgeId`], [`FaceId`]) generic
//! over the integer type ([`MeshIndex`]).
//!
//! Boundary loops matter most here: flip repair walks the loop that starts at
//! a given boundary half-edge.
//!
//! ```
//! use convexuv::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//!
//! let border = mesh.longest_boundary_loop().unwrap();
//! assert_eq!(mesh.loop_halfedges(border).count(), 4);
//! ```

mod builder;
mod halfedge;
mod index;

pub use builder::{build_from_triangles, to_face_vertex};
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, LoopIter, Vertex};
pub use index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
