//! Mesh construction utilities.
//!
//! Builds half-edge meshes from face-vertex lists, as found in mesh files,
//! and converts them back.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from vertices and counter-clockwise triangle faces.
///
/// Boundary half-edges are created for every edge with a single incident face
/// and linked into closed boundary loops.
///
/// # Example
/// ```
/// use convexuv::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
/// assert_eq!(mesh.num_faces(), 1);
/// assert_eq!(mesh.boundary_loops().len(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        if let Some(&vi) = face.iter().find(|&&vi| vi >= vertices.len()) {
            return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());
    let vertex_ids: Vec<VertexId<I>> = vertices.iter().map(|&p| mesh.add_vertex(p)).collect();

    // Directed edge (v0, v1) -> half-edge
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> =
        HashMap::with_capacity(faces.len() * 3);

    for face in faces {
        let face_id = FaceId::<I>::new(mesh.num_faces());
        let base = mesh.num_halfedges();
        let ids = [
            HalfEdgeId::<I>::new(base),
            HalfEdgeId::<I>::new(base + 1),
            HalfEdgeId::<I>::new(base + 2),
        ];

        for corner in 0..3 {
            mesh.halfedges.push(HalfEdge {
                origin: vertex_ids[face[corner]],
                next: ids[(corner + 1) % 3],
                prev: ids[(corner + 2) % 3],
                face: face_id,
                ..HalfEdge::default()
            });
            mesh.vertex_mut(vertex_ids[face[corner]]).halfedge = ids[corner];

            let key = (face[corner], face[(corner + 1) % 3]);
            if edge_map.insert(key, ids[corner]).is_some() {
                // Same directed edge twice: either non-manifold or inconsistently oriented.
                return Err(MeshError::NonManifoldEdge { v0: key.0, v1: key.1 });
            }
        }
        mesh.faces.push(Face { halfedge: ids[0] });
    }

    // Twin linking; unmatched edges get a fresh boundary half-edge.
    let mut directed: Vec<_> = edge_map.iter().map(|(&k, &he)| (k, he)).collect();
    directed.sort_unstable_by_key(|&(_, he)| he);
    for ((v0, v1), he) in directed {
        if let Some(&twin) = edge_map.get(&(v1, v0)) {
            mesh.halfedge_mut(he).twin = twin;
        } else {
            let boundary_he = HalfEdgeId::<I>::new(mesh.num_halfedges());
            mesh.halfedges.push(HalfEdge {
                origin: vertex_ids[v1],
                twin: he,
                ..HalfEdge::default()
            });
            mesh.halfedge_mut(he).twin = boundary_he;
        }
    }

    link_boundary_loops(&mut mesh)?;

    Ok(mesh)
}

/// Link boundary half-edges into loops and make boundary vertices point at
/// their outgoing boundary half-edge.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
    let boundary: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    for &he in &boundary {
        // Rotate around the destination until the outgoing boundary half-edge
        // is found: twin(prev(c)) steps to the next outgoing half-edge.
        let mut candidate = mesh.twin(he);
        let mut steps = 0;
        while !mesh.is_boundary_halfedge(candidate) {
            candidate = mesh.twin(mesh.prev(candidate));
            steps += 1;
            if steps > mesh.num_halfedges() {
                return Err(MeshError::InvalidState(format!(
                    "cannot close boundary loop at {:?}",
                    mesh.dest(he)
                )));
            }
        }

        mesh.halfedge_mut(he).next = candidate;
        mesh.halfedge_mut(candidate).prev = he;
        let origin = mesh.origin(candidate);
        mesh.vertex_mut(origin).halfedge = candidate;
    }

    Ok(())
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns (vertices, faces) tuple.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let vertices: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| {
            let [v0, v1, v2] = mesh.face_triangle(f);
            [v0.index(), v1.index(), v2.index()]
        })
        .collect();

    (vertices, faces)
}
