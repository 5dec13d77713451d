//! Convex virtual boundary.
//!
//! The UV boundary polygon is embedded in its convex hull: a constrained
//! Delaunay triangulation of the boundary points, with the boundary edges as
//! constraints, covers both the polygon and the gaps between the polygon and
//! its hull. Faces are then tagged +1 (inside the polygon) or −1 (gap), and
//! the vertices on the hull become the fixed vertices of the linear system.
//!
//! The triangulation itself is [`spade`]'s; this module only adds the mesh
//! back-references and the per-face tags.

use std::fmt;

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, HasPosition, Triangulation};

use super::uv::{UVMap, VertexIndexMap};
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Vertex payload of the gap triangulation: a UV position and the mesh
/// vertex it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapVertex<I: MeshIndex = u32> {
    position: spade::Point2<f64>,
    vertex: VertexId<I>,
}

impl<I: MeshIndex> GapVertex<I> {
    /// The mesh vertex this triangulation vertex stands for.
    #[inline]
    pub fn mesh_vertex(&self) -> VertexId<I> {
        self.vertex
    }
}

impl<I: MeshIndex> HasPosition for GapVertex<I> {
    type Scalar = f64;

    fn position(&self) -> spade::Point2<f64> {
        self.position
    }
}

/// Constrained triangulation of the UV boundary loop.
pub type GapCdt<I> = ConstrainedDelaunayTriangulation<GapVertex<I>>;

/// Constrained triangulation of a boundary loop with a back-reference from
/// each triangulation vertex to the mesh vertex it was created from.
pub struct GapTriangulation<I: MeshIndex = u32> {
    cdt: GapCdt<I>,
}

impl<I: MeshIndex> GapTriangulation<I> {
    /// The underlying triangulation.
    pub fn triangulation(&self) -> &GapCdt<I> {
        &self.cdt
    }

    /// Mesh vertex behind a triangulation vertex.
    ///
    /// When several loop vertices share a UV position, the last one along
    /// the loop is returned.
    pub fn mesh_vertex(&self, v: FixedVertexHandle) -> VertexId<I> {
        self.cdt.vertex(v).data().vertex
    }

    /// Mesh vertices at the corners of an inner face, counter-clockwise.
    pub fn face_corners(&self, f: FixedFaceHandle<InnerTag>) -> [VertexId<I>; 3] {
        self.cdt.face(f).vertices().map(|v| v.data().vertex)
    }

    /// Number of distinct boundary points.
    pub fn num_vertices(&self) -> usize {
        self.cdt.num_vertices()
    }
}

impl<I: MeshIndex> fmt::Debug for GapTriangulation<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GapTriangulation")
            .field("vertices", &self.cdt.num_vertices())
            .field("inner_faces", &self.cdt.num_inner_faces())
            .field("constraints", &self.cdt.num_constraints())
            .finish()
    }
}

/// Triangulate the convex hull of the UV boundary loop starting at `start`.
///
/// The points are the UV positions of the loop vertices and the constraints
/// are the loop edges. Every inner face lies either inside the boundary
/// polygon or in a gap between the polygon and its hull; no face crosses a
/// boundary edge.
///
/// # Errors
///
/// [`MeshError::DegenerateBoundary`] if the boundary has fewer than three
/// distinct UV points, is collinear, has a non-finite point, or has crossing
/// edges.
pub fn triangulate_convex_hull<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    uv: &UVMap<I>,
) -> Result<GapTriangulation<I>> {
    let mut cdt = GapCdt::<I>::new();

    // Re-inserting a position replaces the payload, so the last loop vertex
    // at a shared position keeps the back-reference.
    let mut handles = Vec::new();
    for he in mesh.loop_halfedges(start) {
        let vertex = mesh.origin(he);
        let p = uv.get(vertex);
        let handle = cdt
            .insert(GapVertex {
                position: spade::Point2::new(p.x, p.y),
                vertex,
            })
            .map_err(|e| {
                MeshError::DegenerateBoundary(format!("cannot insert {:?} at {}: {:?}", vertex, p, e))
            })?;
        handles.push(handle);
    }

    if cdt.num_inner_faces() == 0 {
        return Err(MeshError::DegenerateBoundary(format!(
            "{} distinct boundary points span no area",
            cdt.num_vertices()
        )));
    }

    let n = handles.len();
    for k in 0..n {
        let (from, to) = (handles[k], handles[(k + 1) % n]);
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err(MeshError::DegenerateBoundary(format!(
                "boundary edge {:?} -> {:?} crosses another boundary edge",
                cdt.vertex(from).data().vertex,
                cdt.vertex(to).data().vertex
            )));
        }
        cdt.add_constraint(from, to);
    }

    log::debug!(
        "triangulated convex hull: {} boundary vertices, {} inner faces",
        cdt.num_vertices(),
        cdt.num_inner_faces()
    );

    Ok(GapTriangulation { cdt })
}

/// Inside/outside tag of each face of the gap triangulation.
///
/// Inner faces inside the boundary polygon are +1, faces in the hull gaps
/// are −1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceColoring {
    /// Indexed by [`FixedFaceHandle::index`]; the outer face stays 0.
    colors: Vec<i8>,
}

impl FaceColoring {
    /// Tag of a face.
    #[inline]
    pub fn color(&self, f: FixedFaceHandle<InnerTag>) -> i8 {
        self.colors[f.index()]
    }

    /// Faces tagged −1: the gaps between the boundary polygon and its hull.
    pub fn gap_faces<'a, I: MeshIndex>(
        &'a self,
        gap: &'a GapTriangulation<I>,
    ) -> impl Iterator<Item = FixedFaceHandle<InnerTag>> + 'a {
        self.faces_with(gap, -1)
    }

    /// Faces tagged +1: the interior of the boundary polygon.
    pub fn interior_faces<'a, I: MeshIndex>(
        &'a self,
        gap: &'a GapTriangulation<I>,
    ) -> impl Iterator<Item = FixedFaceHandle<InnerTag>> + 'a {
        self.faces_with(gap, 1)
    }

    fn faces_with<'a, I: MeshIndex>(
        &'a self,
        gap: &'a GapTriangulation<I>,
        color: i8,
    ) -> impl Iterator<Item = FixedFaceHandle<InnerTag>> + 'a {
        gap.cdt
            .inner_faces()
            .map(|f| f.fix())
            .filter(move |&f| self.color(f) == color)
    }

    /// Check the coloring against `gap`.
    ///
    /// Every inner face must be tagged, and two adjacent inner faces must
    /// have opposite tags across a constrained edge and equal tags otherwise.
    pub fn verify<I: MeshIndex>(&self, gap: &GapTriangulation<I>) -> bool {
        let cdt = &gap.cdt;
        if self.colors.len() != cdt.num_all_faces() {
            return false;
        }
        cdt.inner_faces().all(|f| {
            let c = self.color(f.fix());
            c != 0
                && f.adjacent_edges().iter().all(|edge| {
                    match edge.rev().face().as_inner() {
                        None => true,
                        Some(g) => {
                            let constrained = cdt.is_constraint_edge(edge.as_undirected().fix());
                            let expected = if constrained { -c } else { c };
                            self.color(g.fix()) == expected
                        }
                    }
                })
        })
    }
}

/// Tag the inner faces of `gap` as inside (+1) or gap (−1).
///
/// Starts from the face just inside a hull edge, which is interior when that
/// edge is constrained and a gap otherwise, and floods across edges with an
/// explicit stack, flipping the tag on every constrained edge.
pub fn color_faces<I: MeshIndex>(gap: &GapTriangulation<I>) -> FaceColoring {
    let cdt = &gap.cdt;
    let mut colors = vec![0i8; cdt.num_all_faces()];

    let mut stack = Vec::new();
    if let Some(edge) = cdt.convex_hull().next() {
        let seed = edge.face().as_inner().or_else(|| edge.rev().face().as_inner());
        if let Some(seed) = seed {
            let tag = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                1
            } else {
                -1
            };
            stack.push((seed.fix(), tag));
        }
    }

    while let Some((f, tag)) = stack.pop() {
        if colors[f.index()] != 0 {
            continue;
        }
        colors[f.index()] = tag;
        for edge in cdt.face(f).adjacent_edges() {
            if let Some(g) = edge.rev().face().as_inner() {
                if colors[g.fix().index()] == 0 {
                    let constrained = cdt.is_constraint_edge(edge.as_undirected().fix());
                    stack.push((g.fix(), if constrained { -tag } else { tag }));
                }
            }
        }
    }

    let coloring = FaceColoring { colors };
    debug_assert!(coloring.verify(gap), "face coloring violates parity");

    if log::log_enabled!(log::Level::Trace) {
        for f in coloring.gap_faces(gap) {
            let [a, b, c] = gap.face_corners(f);
            log::trace!("gap face {:?}: {:?} {:?} {:?}", f, a, b, c);
        }
    }

    coloring
}

/// Dense per-vertex "fixed" flags over a [`VertexIndexMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVertices {
    flags: Vec<bool>,
}

impl FixedVertices {
    /// All `n` vertices free.
    pub fn new(n: usize) -> Self {
        Self {
            flags: vec![false; n],
        }
    }

    /// Mark the vertex with dense index `i` as fixed.
    #[inline]
    pub fn fix(&mut self, i: usize) {
        self.flags[i] = true;
    }

    /// Check whether the vertex with dense index `i` is fixed.
    #[inline]
    pub fn is_fixed(&self, i: usize) -> bool {
        self.flags[i]
    }

    /// Number of fixed vertices.
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }
}

/// Fix every mesh vertex that lies on the convex hull of the UV boundary,
/// collinear hull vertices included.
///
/// # Errors
///
/// [`MeshError::InvalidState`] if a hull vertex is missing from `index_map`.
pub fn fix_convex_hull_border<I: MeshIndex>(
    gap: &GapTriangulation<I>,
    index_map: &VertexIndexMap<I>,
) -> Result<FixedVertices> {
    let mut fixed = FixedVertices::new(index_map.len());

    for edge in gap.cdt.convex_hull() {
        fixed.fix(index_map.index_of(edge.from().data().vertex)?);
    }

    log::debug!("fixed {} convex hull vertices", fixed.count());
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use nalgebra::{Point2, Point3};

    fn planar_uvs(mesh: &HalfEdgeMesh) -> UVMap {
        UVMap::new(
            mesh.vertex_ids()
                .map(|v| Point2::new(mesh.position(v).x, mesh.position(v).y))
                .collect(),
        )
    }

    fn create_square_mesh() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    /// L-shaped patch; vertex 3 is the reflex corner.
    fn create_l_mesh() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let faces = [[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn build(mesh: &HalfEdgeMesh) -> (GapTriangulation, FaceColoring) {
        let uv = planar_uvs(mesh);
        let start = mesh.longest_boundary_loop().unwrap();
        let gap = triangulate_convex_hull(mesh, start, &uv).unwrap();
        let coloring = color_faces(&gap);
        (gap, coloring)
    }

    fn face_area(gap: &GapTriangulation, f: FixedFaceHandle<InnerTag>) -> f64 {
        let [a, b, c] = gap.triangulation().face(f).positions();
        0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
    }

    #[test]
    fn test_convex_boundary_has_no_gap() {
        let mesh = create_square_mesh();
        let (gap, coloring) = build(&mesh);

        assert_eq!(gap.num_vertices(), 4);
        assert_eq!(coloring.interior_faces(&gap).count(), 2);
        assert_eq!(coloring.gap_faces(&gap).count(), 0);
        assert!(coloring.verify(&gap));

        let fixed = fix_convex_hull_border(&gap, &VertexIndexMap::identity(&mesh)).unwrap();
        assert_eq!(fixed.count(), 4);
    }

    #[test]
    fn test_l_shape_gap_face() {
        let mesh = create_l_mesh();
        let (gap, coloring) = build(&mesh);
        assert!(coloring.verify(&gap));

        // The notch between (2,1), (1,2) and the reflex corner (1,1).
        let gaps: Vec<_> = coloring.gap_faces(&gap).collect();
        assert_eq!(gaps.len(), 1);
        let mut corners: Vec<usize> = gap.face_corners(gaps[0]).iter().map(|v| v.index()).collect();
        corners.sort();
        assert_eq!(corners, vec![2, 3, 4]);
        assert!((face_area(&gap, gaps[0]) - 0.5).abs() < 1e-12);

        let interior_area: f64 = coloring.interior_faces(&gap).map(|f| face_area(&gap, f)).sum();
        assert!((interior_area - 3.0).abs() < 1e-12);

        let fixed = fix_convex_hull_border(&gap, &VertexIndexMap::identity(&mesh)).unwrap();
        assert_eq!(fixed.count(), 5);
        assert!(!fixed.is_fixed(3));
    }

    #[test]
    fn test_boundary_edges_are_constrained() {
        let mesh = create_l_mesh();
        let (gap, _) = build(&mesh);
        let cdt = gap.triangulation();
        let border = mesh.longest_boundary_loop().unwrap();

        for edge in cdt.undirected_edges() {
            let [a, b] = edge.vertices().map(|v| v.data().mesh_vertex());
            let on_boundary = mesh.loop_halfedges(border).any(|he| {
                (mesh.origin(he) == a && mesh.dest(he) == b)
                    || (mesh.origin(he) == b && mesh.dest(he) == a)
            });
            assert_eq!(cdt.is_constraint_edge(edge.fix()), on_boundary);
        }
        assert_eq!(cdt.num_constraints(), 6);
    }

    #[test]
    fn test_verify_detects_bad_parity() {
        let mesh = create_l_mesh();
        let (gap, mut coloring) = build(&mesh);
        let f = coloring.interior_faces(&gap).next().unwrap();
        coloring.colors[f.index()] = -1;
        assert!(!coloring.verify(&gap));
    }

    #[test]
    fn test_shared_uv_position_keeps_last_loop_vertex() {
        // Fan around vertex 0; rim vertices 3 and 4 are glued in UV space,
        // so the UV border touches itself at one point.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(-1.0, 2.0, 0.0),
            Point3::new(-2.0, 0.0, 0.0),
            Point3::new(0.0, -2.0, 0.0),
        ];
        let faces = [[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5], [0, 5, 1]];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        let mut uv = planar_uvs(&mesh);
        uv.set(VertexId::new(4), uv.get(VertexId::new(3)));

        let start = mesh.longest_boundary_loop().unwrap();
        let gap = triangulate_convex_hull(&mesh, start, &uv).unwrap();
        assert_eq!(gap.num_vertices(), 4);

        let order: Vec<_> = mesh.loop_halfedges(start).map(|he| mesh.origin(he)).collect();
        let pos = |v: usize| order.iter().position(|&o| o == VertexId::new(v)).unwrap();
        let expected = if pos(3) > pos(4) { 3 } else { 4 };

        let shared = gap
            .triangulation()
            .vertices()
            .find(|v| v.position() == spade::Point2::new(-1.0, 2.0))
            .unwrap();
        assert_eq!(gap.mesh_vertex(shared.fix()), VertexId::new(expected));
    }

    #[test]
    fn test_collinear_boundary_is_degenerate() {
        let mesh = create_square_mesh();
        let mut uv = planar_uvs(&mesh);
        for (k, v) in mesh.vertex_ids().enumerate() {
            uv.set(v, Point2::new(k as f64, 0.0));
        }
        let start = mesh.longest_boundary_loop().unwrap();
        assert!(matches!(
            triangulate_convex_hull(&mesh, start, &uv),
            Err(MeshError::DegenerateBoundary(_))
        ));
    }

    #[test]
    fn test_missing_index_is_reported() {
        let mesh = create_square_mesh();
        let (gap, _) = build(&mesh);
        let partial =
            VertexIndexMap::from_vertices(&[VertexId::new(0), VertexId::new(1)]).unwrap();
        assert!(matches!(
            fix_convex_hull_border(&gap, &partial),
            Err(MeshError::InvalidState(_))
        ));
    }
}
