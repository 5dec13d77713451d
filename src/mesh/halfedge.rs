//! Half-edge mesh data structure.
//!
//! Each edge is split into two half-edges pointing in opposite directions.
//! A half-edge knows its twin, the next and previous half-edge around its
//! face, its origin vertex and its face.
//!
//! # Boundary Handling
//!
//! Boundary half-edges have an invalid face ID. Their `next`/`prev` links
//! chain them into closed boundary loops, so a loop can be walked exactly like
//! the border of a face with [`HalfEdgeMesh::loop_halfedges`].

use nalgebra::Point3;

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices, this is a boundary half-edge.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,
    /// The opposite half-edge.
    pub twin: HalfEdgeId<I>,
    /// The next half-edge around the face (or boundary loop).
    pub next: HalfEdgeId<I>,
    /// The previous half-edge around the face (or boundary loop).
    pub prev: HalfEdgeId<I>,
    /// The face this half-edge belongs to. Invalid on the boundary.
    pub face: FaceId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Check if this half-edge is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

/// A face in the half-edge mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct Face<I: MeshIndex = u32> {
    /// One half-edge on the border of this face.
    pub halfedge: HalfEdgeId<I>,
}

/// A half-edge mesh for triangle meshes.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Interior edges are shared, boundary edges add one extra half-edge each.
        let num_halfedges = num_faces * 3 + num_faces / 2;

        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face or boundary loop.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face or boundary loop.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Check if a half-edge is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Walk the `next` cycle starting at `start`.
    ///
    /// For a face half-edge this is the border of the face; for a boundary
    /// half-edge this is its boundary loop. The walk stops when it returns to
    /// `start` or hits an unlinked half-edge.
    pub fn loop_halfedges(&self, start: HalfEdgeId<I>) -> LoopIter<'_, I> {
        LoopIter {
            mesh: self,
            start,
            current: start,
            remaining: if start.is_valid() { self.halfedges.len() } else { 0 },
        }
    }

    /// Get the three vertices of a triangular face, in counter-clockwise order.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    // ==================== Boundary Loops ====================

    /// One representative half-edge per boundary loop.
    ///
    /// Loops are reported in order of their lowest half-edge ID.
    pub fn boundary_loops(&self) -> Vec<HalfEdgeId<I>> {
        let mut visited = vec![false; self.halfedges.len()];
        let mut loops = Vec::new();

        for he in self.halfedge_ids() {
            if visited[he.index()] || !self.is_boundary_halfedge(he) {
                continue;
            }
            for member in self.loop_halfedges(he) {
                visited[member.index()] = true;
            }
            loops.push(he);
        }

        loops
    }

    /// The boundary loop with the most half-edges, typically the outer border
    /// of a disk-like patch.
    pub fn longest_boundary_loop(&self) -> Option<HalfEdgeId<I>> {
        self.boundary_loops()
            .into_iter()
            .max_by_key(|&he| self.loop_halfedges(he).count())
    }

    /// Check whether the `next` cycle starting at `start` closes on itself.
    pub fn is_closed_loop(&self, start: HalfEdgeId<I>) -> bool {
        match self.loop_halfedges(start).last() {
            Some(last) => self.next(last) == start,
            None => false,
        }
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    // ==================== Validation ====================

    /// Check if the mesh connectivity is consistent.
    pub fn is_valid(&self) -> bool {
        let vertices_ok = self.vertices.iter().enumerate().all(|(i, v)| {
            !v.halfedge.is_valid() || self.halfedge(v.halfedge).origin.index() == i
        });

        let halfedges_ok = self.halfedges.iter().enumerate().all(|(i, he)| {
            (!he.twin.is_valid() || self.halfedge(he.twin).twin.index() == i)
                && (!he.next.is_valid() || self.halfedge(he.next).prev.index() == i)
                && (!he.prev.is_valid() || self.halfedge(he.prev).next.index() == i)
        });

        vertices_ok && halfedges_ok && self.faces.iter().all(|f| f.halfedge.is_valid())
    }
}

/// Iterator over a `next` cycle of half-edges.
pub struct LoopIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    // Bounds the walk on meshes with broken boundary links.
    remaining: usize,
}

impl<'a, I: MeshIndex> Iterator for LoopIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || !self.current.is_valid() {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;
        self.current = self.mesh.next(result);
        if self.current == self.start {
            self.remaining = 0;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

    fn create_square() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert!(mesh.is_valid());
        assert!(mesh.boundary_loops().is_empty());
        assert!(mesh.longest_boundary_loop().is_none());
    }

    #[test]
    fn test_face_loop_has_three_halfedges() {
        let mesh = create_square();
        for f in mesh.face_ids() {
            let start = mesh.face(f).halfedge;
            assert_eq!(mesh.loop_halfedges(start).count(), 3);
            assert!(mesh.is_closed_loop(start));
        }
    }

    #[test]
    fn test_square_has_one_boundary_loop() {
        let mesh = create_square();
        let loops = mesh.boundary_loops();
        assert_eq!(loops.len(), 1);

        let start = loops[0];
        assert!(mesh.is_boundary_halfedge(start));
        assert!(mesh.is_closed_loop(start));

        let members: Vec<_> = mesh.loop_halfedges(start).collect();
        assert_eq!(members.len(), 4);
        for pair in members.windows(2) {
            assert_eq!(mesh.dest(pair[0]), mesh.origin(pair[1]));
        }
    }

    #[test]
    fn test_boundary_loop_runs_clockwise() {
        // Boundary half-edges are the twins of counter-clockwise face edges,
        // so the loop traverses the square clockwise.
        let mesh = create_square();
        let start = mesh.longest_boundary_loop().unwrap();
        let area2: f64 = mesh
            .loop_halfedges(start)
            .map(|he| {
                let p = mesh.position(mesh.origin(he));
                let q = mesh.position(mesh.dest(he));
                p.x * q.y - q.x * p.y
            })
            .sum();
        assert!(area2 < 0.0);
    }
}
