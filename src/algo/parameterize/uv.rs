//! UV coordinate storage and vertex indexing.
//!
//! [`UVMap`] holds one 2D coordinate per mesh vertex. [`VertexIndexMap`]
//! assigns the vertices taking part in a linear system their dense row
//! numbers.

use std::collections::HashMap;
use std::marker::PhantomData;

use nalgebra::Point2;

use crate::error::{MeshError, Result};
use crate::geom::orient2d;
use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

/// UV coordinates for mesh vertices.
///
/// Coordinates are indexed by vertex ID. They are not confined to [0, 1].
///
/// # Example
///
/// ```
/// use convexuv::algo::parameterize::UVMap;
/// use convexuv::mesh::VertexId;
/// use nalgebra::Point2;
///
/// let mut uv: UVMap = UVMap::zeros(3);
/// uv.set(VertexId::new(2), Point2::new(0.5, 1.0));
/// assert_eq!(uv.get(VertexId::new(2)).y, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UVMap<I: MeshIndex = u32> {
    coords: Vec<Point2<f64>>,
    _marker: PhantomData<I>,
}

impl<I: MeshIndex> UVMap<I> {
    /// Create a UV map from per-vertex coordinates.
    pub fn new(coords: Vec<Point2<f64>>) -> Self {
        Self {
            coords,
            _marker: PhantomData,
        }
    }

    /// Create a UV map filled with zeros.
    pub fn zeros(n: usize) -> Self {
        Self::new(vec![Point2::origin(); n])
    }

    /// Get the UV coordinates of a vertex.
    #[inline]
    pub fn get(&self, v: VertexId<I>) -> Point2<f64> {
        self.coords[v.index()]
    }

    /// Set the UV coordinates of a vertex.
    #[inline]
    pub fn set(&mut self, v: VertexId<I>, uv: Point2<f64>) {
        self.coords[v.index()] = uv;
    }

    /// Number of stored coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate over all UV coordinates with their vertex IDs.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId<I>, Point2<f64>)> + '_ {
        self.coords
            .iter()
            .enumerate()
            .map(|(i, &uv)| (VertexId::new(i), uv))
    }

    /// Get the raw coordinates slice.
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.coords
    }

    /// Compute the bounding box of the UV coordinates.
    ///
    /// Returns `None` if the UV map is empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.coords.first()?;
        Some(self.coords.iter().fold((first, first), |(min, max), uv| {
            (
                Point2::new(min.x.min(uv.x), min.y.min(uv.y)),
                Point2::new(max.x.max(uv.x), max.y.max(uv.y)),
            )
        }))
    }

    /// Signed UV area of a face; positive when the face keeps the orientation
    /// it has on the surface.
    pub fn signed_area(&self, mesh: &HalfEdgeMesh<I>, f: FaceId<I>) -> f64 {
        let [a, b, c] = mesh.face_triangle(f);
        0.5 * orient2d(&self.get(a), &self.get(b), &self.get(c))
    }

    /// Faces whose UV triangle is flipped or collapsed (non-positive area).
    pub fn flipped_faces(&self, mesh: &HalfEdgeMesh<I>) -> Vec<FaceId<I>> {
        mesh.face_ids()
            .filter(|&f| self.signed_area(mesh, f) <= 0.0)
            .collect()
    }

    /// Number of flipped or collapsed faces.
    pub fn count_flipped_faces(&self, mesh: &HalfEdgeMesh<I>) -> usize {
        mesh.face_ids()
            .filter(|&f| self.signed_area(mesh, f) <= 0.0)
            .count()
    }
}

/// Dense numbering of the vertices that take part in a linear system.
///
/// Maps each participating vertex to a distinct index in `[0, n)`. Rows and
/// columns of the system matrix are addressed through it.
#[derive(Debug, Clone)]
pub struct VertexIndexMap<I: MeshIndex = u32> {
    vertices: Vec<VertexId<I>>,
    index: HashMap<VertexId<I>, usize>,
}

impl<I: MeshIndex> VertexIndexMap<I> {
    /// Number the given vertices in order.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidParameter`] if a vertex appears twice.
    pub fn from_vertices(vertices: &[VertexId<I>]) -> Result<Self> {
        let mut index = HashMap::with_capacity(vertices.len());
        for (i, &v) in vertices.iter().enumerate() {
            if index.insert(v, i).is_some() {
                return Err(MeshError::invalid_param(
                    "vertices",
                    format!("{:?}", v),
                    "vertex listed more than once",
                ));
            }
        }
        Ok(Self {
            vertices: vertices.to_vec(),
            index,
        })
    }

    /// Number every vertex of the mesh by its own ID.
    pub fn identity(mesh: &HalfEdgeMesh<I>) -> Self {
        let vertices: Vec<VertexId<I>> = mesh.vertex_ids().collect();
        let index = vertices.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        Self { vertices, index }
    }

    /// Index of a vertex, if it participates.
    #[inline]
    pub fn get(&self, v: VertexId<I>) -> Option<usize> {
        self.index.get(&v).copied()
    }

    /// Index of a vertex that must participate.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidState`] for a vertex outside the map.
    pub fn index_of(&self, v: VertexId<I>) -> Result<usize> {
        self.get(v).ok_or_else(|| {
            MeshError::InvalidState(format!("{:?} is missing from the vertex index map", v))
        })
    }

    /// Check whether a vertex participates.
    #[inline]
    pub fn contains(&self, v: VertexId<I>) -> bool {
        self.index.contains_key(&v)
    }

    /// Participating vertices, in index order.
    pub fn vertices(&self) -> &[VertexId<I>] {
        &self.vertices
    }

    /// Number of participating vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
