//! Flip repair with mean value coordinates over a convex virtual boundary.
//!
//! Given a UV map that may contain flipped triangles, the boundary polygon is
//! embedded in its convex hull. The vertices on the hull are fixed, the gaps
//! between the polygon and its hull are triangulated, and every other vertex
//! is placed at the mean-value combination of its neighbors. Since mean value
//! weights of a star-shaped neighborhood are positive and the outer boundary
//! is convex, the solution is a valid embedding (Tutte / Floater).
//!
//! # Algorithm
//!
//! 1. Check that the UV boundary is a simple polygon.
//! 2. Triangulate the convex hull of the boundary with the boundary edges as
//!    constraints, and tag the gap faces.
//! 3. Fix the hull vertices.
//! 4. For every corner of every mesh face and gap face, add the mean value
//!    weights of the apex; fixed vertices get identity rows.
//! 5. Solve for u and v and write the result back.
//!
//! Angles are measured on the current UV positions. A corner of a flipped
//! triangle measures more than π and is replaced by its explementary angle.
//!
//! # Example
//!
//! ```
//! use convexuv::prelude::*;
//! use convexuv::algo::parameterize::{repair_flips, MvcOptions, UVMap};
//! use nalgebra::{Point2, Point3};
//!
//! // A square split around a center vertex, with the center dragged outside.
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 0.0),
//! ];
//! let faces = [[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! let mut uv = UVMap::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//!     Point2::new(1.3, 0.4),
//! ]);
//! assert!(uv.count_flipped_faces(&mesh) > 0);
//!
//! repair_flips(&mesh, &mut uv, &MvcOptions::default()).unwrap();
//! assert_eq!(uv.count_flipped_faces(&mesh), 0);
//! ```
//!
//! # References
//!
//! - Floater, M. S. (2003). "Mean value coordinates." Computer Aided
//!   Geometric Design.

use std::collections::BTreeSet;
use std::f64::consts::{PI, TAU};

use nalgebra::{DVector, Point2};

use super::boundary::find_boundary_intersection;
use super::hull::{
    color_faces, fix_convex_hull_border, triangulate_convex_hull, FaceColoring, FixedVertices,
    GapTriangulation,
};
use super::solver::{solve_mvc, BiCgStab, LinearSolver, Preconditioner};
use super::sparse::{CsrMatrix, SparseBuilder};
use super::uv::{UVMap, VertexIndexMap};
use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Options for MVC flip repair.
#[derive(Debug, Clone)]
pub struct MvcOptions {
    /// Maximum iterations of the linear solver.
    pub max_iterations: usize,

    /// Relative residual at which the solver stops.
    pub tolerance: f64,

    /// Preconditioner of the default solver.
    pub preconditioner: Preconditioner,

    /// Whether to solve for u and v concurrently and check the boundary in
    /// parallel (default: true).
    pub parallel: bool,

    /// Whether to reject non-simple UV boundaries before triangulating.
    /// Only turn this off for boundaries already known to be simple.
    pub check_boundary: bool,
}

impl Default for MvcOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            preconditioner: Preconditioner::Ilu0,
            parallel: true,
            check_boundary: true,
        }
    }
}

impl MvcOptions {
    /// Set the maximum solver iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the solver tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the preconditioner.
    pub fn with_preconditioner(mut self, preconditioner: Preconditioner) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Skip the boundary simplicity check.
    pub fn without_boundary_check(mut self) -> Self {
        self.check_boundary = false;
        self
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(MeshError::invalid_param(
                "max_iterations",
                self.max_iterations,
                "must be positive",
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(MeshError::invalid_param(
                "tolerance",
                self.tolerance,
                "must be positive and finite",
            ));
        }
        Ok(())
    }

    /// The BiCGSTAB solver these options describe.
    pub fn solver(&self) -> BiCgStab {
        BiCgStab::new(self.max_iterations, self.tolerance, self.preconditioner)
    }
}

const STAGES: usize = 8;

/// Post-processor that repairs a UV map with a convex virtual boundary.
///
/// The linear solver is a type parameter so callers can bring their own;
/// [`MvcPostProcessor::new`] uses [`BiCgStab`] configured from the options.
#[derive(Debug, Clone)]
pub struct MvcPostProcessor<S: LinearSolver = BiCgStab> {
    solver: S,
    options: MvcOptions,
}

impl MvcPostProcessor<BiCgStab> {
    /// Create a post-processor with the default solver.
    pub fn new(options: MvcOptions) -> Self {
        Self {
            solver: options.solver(),
            options,
        }
    }
}

impl Default for MvcPostProcessor<BiCgStab> {
    fn default() -> Self {
        Self::new(MvcOptions::default())
    }
}

impl<S: LinearSolver> MvcPostProcessor<S> {
    /// Create a post-processor with a custom linear solver.
    ///
    /// The solver settings in `options` are ignored.
    pub fn with_solver(solver: S, options: MvcOptions) -> Self {
        Self { solver, options }
    }

    /// The options in use.
    pub fn options(&self) -> &MvcOptions {
        &self.options
    }

    /// Repair `uv` on the patch made of `faces`.
    ///
    /// `vertices` are the participating vertices, numbered by `index_map`;
    /// `boundary` is a boundary half-edge of the loop to embed in its convex
    /// hull. On success every participating vertex gets a new UV position;
    /// on failure `uv` is left untouched.
    ///
    /// # Errors
    ///
    /// - [`MeshError::NoBoundary`] if `boundary` is not set.
    /// - [`MeshError::InvalidState`] if `boundary` is not a closed boundary
    ///   loop, or a vertex of `faces` or of the loop is missing from
    ///   `index_map`.
    /// - [`MeshError::NonSimpleBoundary`] if the UV boundary self-intersects.
    /// - [`MeshError::DegenerateBoundary`] if the UV boundary has no area.
    /// - [`MeshError::DegenerateCorner`] if two corners of a triangle share a
    ///   UV position.
    /// - [`MeshError::CannotSolveLinearSystem`] if either solve fails.
    pub fn parameterize<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        vertices: &[VertexId<I>],
        faces: &[FaceId<I>],
        boundary: HalfEdgeId<I>,
        uv: &mut UVMap<I>,
        index_map: &VertexIndexMap<I>,
    ) -> Result<()> {
        self.parameterize_with_progress(
            mesh,
            vertices,
            faces,
            boundary,
            uv,
            index_map,
            &Progress::none(),
        )
    }

    /// [`parameterize`](Self::parameterize) with progress reporting, one step
    /// per stage.
    #[allow(clippy::too_many_arguments)]
    pub fn parameterize_with_progress<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        vertices: &[VertexId<I>],
        faces: &[FaceId<I>],
        boundary: HalfEdgeId<I>,
        uv: &mut UVMap<I>,
        index_map: &VertexIndexMap<I>,
        progress: &Progress,
    ) -> Result<()> {
        self.options.validate()?;
        check_inputs(mesh, vertices, boundary, uv, index_map)?;

        let mut stage = 0;
        let mut enter = |name: &str| {
            log::debug!("MVC post-processing: {}", name);
            progress.report(stage, STAGES, name);
            stage += 1;
        };

        enter("checking boundary");
        if self.options.check_boundary {
            if let Some(hit) = find_boundary_intersection(mesh, boundary, uv, self.options.parallel)
            {
                return Err(hit.into());
            }
        }

        enter("triangulating convex hull");
        let gap = triangulate_convex_hull(mesh, boundary, uv)?;

        enter("classifying faces");
        let coloring = color_faces(&gap);

        enter("fixing hull vertices");
        let fixed = fix_convex_hull_border(&gap, index_map)?;

        enter("assembling matrix");
        let a = assemble_matrix(mesh, faces, &gap, &coloring, uv, index_map, &fixed)?;

        enter("building right-hand side");
        let (bu, bv) = compute_rhs(vertices, uv, index_map, &fixed)?;

        enter("solving");
        let (xu, xv) = solve_mvc(&self.solver, &a, &bu, &bv, self.options.parallel)?;

        enter("writing solution");
        assign_solution(vertices, &xu, &xv, uv, index_map)?;

        progress.report(STAGES, STAGES, "done");
        log::debug!(
            "MVC post-processing done: {} vertices, {} fixed",
            index_map.len(),
            fixed.count()
        );
        Ok(())
    }
}

fn check_inputs<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    vertices: &[VertexId<I>],
    boundary: HalfEdgeId<I>,
    uv: &UVMap<I>,
    index_map: &VertexIndexMap<I>,
) -> Result<()> {
    if !boundary.is_valid() {
        return Err(MeshError::NoBoundary);
    }
    if boundary.index() >= mesh.num_halfedges() || !mesh.is_boundary_halfedge(boundary) {
        return Err(MeshError::InvalidState(format!(
            "{:?} is not a boundary half-edge",
            boundary
        )));
    }
    if !mesh.is_closed_loop(boundary) {
        return Err(MeshError::InvalidState(format!(
            "boundary loop at {:?} is not closed",
            boundary
        )));
    }
    if uv.len() < mesh.num_vertices() {
        return Err(MeshError::InvalidState(format!(
            "UV map has {} entries for {} vertices",
            uv.len(),
            mesh.num_vertices()
        )));
    }
    if vertices.len() != index_map.len() {
        return Err(MeshError::InvalidState(format!(
            "{} vertices but {} indexed vertices",
            vertices.len(),
            index_map.len()
        )));
    }
    for &v in vertices {
        index_map.index_of(v)?;
    }
    for he in mesh.loop_halfedges(boundary) {
        index_map.index_of(mesh.origin(he))?;
    }
    Ok(())
}

/// Mean value weights of corner `pi` toward `pj` and `pk`.
///
/// Returns `(w_ij, w_ik)`, both `-tan(α/2) / |edge|` where α is the angle at
/// `pi`, or `None` if an edge has zero length or a weight is not finite.
fn corner_weights(pi: &Point2<f64>, pj: &Point2<f64>, pk: &Point2<f64>) -> Option<(f64, f64)> {
    let eij = pj - pi;
    let eik = pk - pi;
    let (len_ij, len_ik) = (eij.norm(), eik.norm());
    if len_ij == 0.0 || len_ik == 0.0 {
        return None;
    }

    let mut alpha = eij.perp(&eik).atan2(eij.dot(&eik));
    if alpha < 0.0 {
        alpha += TAU;
    }
    if alpha > PI {
        // Flipped corner.
        alpha = TAU - alpha;
    }

    let base = -(0.5 * alpha).tan();
    let (w_ij, w_ik) = (base / len_ij, base / len_ik);
    (w_ij.is_finite() && w_ik.is_finite()).then_some((w_ij, w_ik))
}

/// Add the contribution of corner (i, j, k) to row i.
fn add_corner<I: MeshIndex>(
    builder: &mut SparseBuilder,
    [vi, vj, vk]: [VertexId<I>; 3],
    uv: &UVMap<I>,
    index_map: &VertexIndexMap<I>,
    fixed: &FixedVertices,
) -> Result<()> {
    let i = index_map.index_of(vi)?;
    if fixed.is_fixed(i) {
        builder.set_coef(i, i, 1.0);
        return Ok(());
    }
    let j = index_map.index_of(vj)?;
    let k = index_map.index_of(vk)?;

    let (pi, pj, pk) = (uv.get(vi), uv.get(vj), uv.get(vk));
    let (w_ij, w_ik) = corner_weights(&pi, &pj, &pk).ok_or_else(|| {
        MeshError::DegenerateCorner {
            vertex: vi.index(),
            neighbor: if pi == pj { vj.index() } else { vk.index() },
        }
    })?;

    builder.add_coef(i, j, w_ij);
    builder.add_coef(i, k, w_ik);
    builder.add_coef(i, i, -w_ij - w_ik);
    Ok(())
}

/// Add the three corners of a counter-clockwise triangle.
fn add_triangle<I: MeshIndex>(
    builder: &mut SparseBuilder,
    [a, b, c]: [VertexId<I>; 3],
    uv: &UVMap<I>,
    index_map: &VertexIndexMap<I>,
    fixed: &FixedVertices,
) -> Result<()> {
    add_corner(builder, [a, b, c], uv, index_map, fixed)?;
    add_corner(builder, [b, c, a], uv, index_map, fixed)?;
    add_corner(builder, [c, a, b], uv, index_map, fixed)
}

/// Assemble the MVC matrix.
///
/// Corners come from every face in `faces` and from every gap face of the
/// convex hull triangulation. A free vertex's row sums to zero; a fixed
/// vertex's row is the identity row.
///
/// # Errors
///
/// [`MeshError::DegenerateCorner`] for a triangle with two coinciding UV
/// corners at a free apex; [`MeshError::InvalidState`] for a vertex missing
/// from `index_map`.
pub fn assemble_matrix<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    faces: &[FaceId<I>],
    gap: &GapTriangulation<I>,
    coloring: &FaceColoring,
    uv: &UVMap<I>,
    index_map: &VertexIndexMap<I>,
    fixed: &FixedVertices,
) -> Result<CsrMatrix> {
    let n = index_map.len();
    let mut builder = SparseBuilder::new(n, n);

    for f in coloring.gap_faces(gap) {
        add_triangle(&mut builder, gap.face_corners(f), uv, index_map, fixed)?;
    }

    for &f in faces {
        add_triangle(&mut builder, mesh.face_triangle(f), uv, index_map, fixed)?;
    }

    // Fixed vertices that are the apex of no corner.
    for i in (0..n).filter(|&i| fixed.is_fixed(i)) {
        builder.set_coef(i, i, 1.0);
    }

    Ok(builder.build())
}

/// Right-hand sides for u and v: the current UV position of fixed vertices,
/// zero for free ones.
pub fn compute_rhs<I: MeshIndex>(
    vertices: &[VertexId<I>],
    uv: &UVMap<I>,
    index_map: &VertexIndexMap<I>,
    fixed: &FixedVertices,
) -> Result<(DVector<f64>, DVector<f64>)> {
    let n = index_map.len();
    let mut bu = DVector::zeros(n);
    let mut bv = DVector::zeros(n);

    for &v in vertices {
        let i = index_map.index_of(v)?;
        if fixed.is_fixed(i) {
            let p = uv.get(v);
            bu[i] = p.x;
            bv[i] = p.y;
        }
    }

    Ok((bu, bv))
}

/// Write the solved coordinates of every participating vertex into `uv`.
///
/// All indices are checked before anything is written.
pub fn assign_solution<I: MeshIndex>(
    vertices: &[VertexId<I>],
    xu: &DVector<f64>,
    xv: &DVector<f64>,
    uv: &mut UVMap<I>,
    index_map: &VertexIndexMap<I>,
) -> Result<()> {
    let indices = vertices
        .iter()
        .map(|&v| {
            let i = index_map.index_of(v)?;
            if i >= xu.len() || i >= xv.len() {
                return Err(MeshError::InvalidState(format!(
                    "solution has no entry for {:?}",
                    v
                )));
            }
            Ok(i)
        })
        .collect::<Result<Vec<usize>>>()?;

    for (&v, i) in vertices.iter().zip(indices) {
        uv.set(v, Point2::new(xu[i], xv[i]));
    }
    Ok(())
}

/// Repair flipped triangles of a whole mesh.
///
/// Uses every face, the vertices they reference and the longest boundary
/// loop.
///
/// # Errors
///
/// [`MeshError::NoBoundary`] for a closed mesh, and the errors of
/// [`MvcPostProcessor::parameterize`].
pub fn repair_flips<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    uv: &mut UVMap<I>,
    options: &MvcOptions,
) -> Result<()> {
    repair_flips_with_progress(mesh, uv, options, &Progress::none())
}

/// [`repair_flips`] with progress reporting.
pub fn repair_flips_with_progress<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    uv: &mut UVMap<I>,
    options: &MvcOptions,
    progress: &Progress,
) -> Result<()> {
    let boundary = mesh.longest_boundary_loop().ok_or(MeshError::NoBoundary)?;

    let faces: Vec<FaceId<I>> = mesh.face_ids().collect();
    let vertices: Vec<VertexId<I>> = faces
        .iter()
        .flat_map(|&f| mesh.face_triangle(f))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index_map = VertexIndexMap::from_vertices(&vertices)?;

    MvcPostProcessor::new(options.clone()).parameterize_with_progress(
        mesh, &vertices, &faces, boundary, uv, &index_map, progress,
    )
}
