//! Simplicity check for the UV image of a boundary loop.
//!
//! Every pair of non-adjacent boundary edges is tested for intersection, so
//! the check is quadratic in the loop length. The outer loop can run on the
//! rayon thread pool.

use nalgebra::Point2;
use rayon::prelude::*;

use super::uv::UVMap;
use crate::error::MeshError;
use crate::geom::segments_intersect;
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex};

/// Two non-adjacent boundary edges whose UV segments intersect.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryIntersection<I: MeshIndex = u32> {
    /// The first offending half-edge.
    pub first: HalfEdgeId<I>,
    /// The second offending half-edge.
    pub second: HalfEdgeId<I>,
    /// UV endpoints of `first`.
    pub first_segment: [Point2<f64>; 2],
    /// UV endpoints of `second`.
    pub second_segment: [Point2<f64>; 2],
}

impl<I: MeshIndex> From<BoundaryIntersection<I>> for MeshError {
    fn from(hit: BoundaryIntersection<I>) -> Self {
        MeshError::NonSimpleBoundary {
            first: hit.first_segment,
            second: hit.second_segment,
        }
    }
}

/// Find two non-adjacent edges of the loop starting at `start` whose UV
/// segments intersect. Touching endpoints and collinear overlaps count.
///
/// Returns `None` when the UV boundary is a simple polygon. When an
/// intersection is found it is also logged as a warning. With `parallel`
/// set, which intersecting pair is reported is unspecified.
pub fn find_boundary_intersection<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    uv: &UVMap<I>,
    parallel: bool,
) -> Option<BoundaryIntersection<I>> {
    let edges: Vec<HalfEdgeId<I>> = mesh.loop_halfedges(start).collect();
    let segments: Vec<[Point2<f64>; 2]> = edges
        .iter()
        .map(|&he| [uv.get(mesh.origin(he)), uv.get(mesh.dest(he))])
        .collect();
    let n = edges.len();

    let adjacent = |i: usize, j: usize| {
        mesh.next(edges[i]) == edges[j] || mesh.next(edges[j]) == edges[i]
    };
    let hit_from = |i: usize| {
        (i + 1..n)
            .find(|&j| {
                !adjacent(i, j)
                    && segments_intersect(
                        &segments[i][0],
                        &segments[i][1],
                        &segments[j][0],
                        &segments[j][1],
                    )
            })
            .map(|j| (i, j))
    };

    let found = if parallel {
        (0..n).into_par_iter().find_map_any(hit_from)
    } else {
        (0..n).find_map(hit_from)
    };

    found.map(|(i, j)| {
        log::warn!(
            "boundary segments intersect: ({:?}, {:?}) and ({:?}, {:?})",
            segments[i][0],
            segments[i][1],
            segments[j][0],
            segments[j][1]
        );
        BoundaryIntersection {
            first: edges[i],
            second: edges[j],
            first_segment: segments[i],
            second_segment: segments[j],
        }
    })
}

/// Check whether the UV image of the boundary loop is a simple polygon.
pub fn is_polygon_simple<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    uv: &UVMap<I>,
    parallel: bool,
) -> bool {
    find_boundary_intersection(mesh, start, uv, parallel).is_none()
}
