//! Iterative solvers for the sparse systems built during flip repair.
//!
//! The MVC matrix is not symmetric, so the default solver is a
//! preconditioned BiCGSTAB. Solvers are used through the [`LinearSolver`]
//! trait, which keeps the assembly code independent of the solver choice.

use nalgebra::DVector;

use super::sparse::CsrMatrix;
use crate::error::{MeshError, Result};

/// A solver for square sparse systems `A x = b`.
pub trait LinearSolver: Send + Sync {
    /// Solve `A x = b`.
    ///
    /// Either the full solution is returned or an error; never a partial
    /// result.
    fn solve(&self, a: &CsrMatrix, b: &DVector<f64>) -> Result<DVector<f64>>;
}

/// Preconditioner used by [`BiCgStab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preconditioner {
    /// Incomplete LU factorization with zero fill-in.
    #[default]
    Ilu0,
    /// Inverse of the diagonal.
    Jacobi,
    /// No preconditioning.
    Identity,
}

/// Preconditioned biconjugate gradient stabilized method.
#[derive(Debug, Clone)]
pub struct BiCgStab {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the relative residual `|b - Ax| / |b|`.
    pub tolerance: f64,
    /// Preconditioner applied on the right.
    pub preconditioner: Preconditioner,
}

impl Default for BiCgStab {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            preconditioner: Preconditioner::Ilu0,
        }
    }
}

impl BiCgStab {
    /// Create a solver with the given iteration cap and tolerance.
    pub fn new(max_iterations: usize, tolerance: f64, preconditioner: Preconditioner) -> Self {
        Self {
            max_iterations,
            tolerance,
            preconditioner,
        }
    }
}

impl LinearSolver for BiCgStab {
    fn solve(&self, a: &CsrMatrix, b: &DVector<f64>) -> Result<DVector<f64>> {
        let n = b.len();
        if a.nrows() != n || a.ncols() != n {
            return Err(MeshError::InvalidState(format!(
                "{}x{} matrix with right-hand side of length {}",
                a.nrows(),
                a.ncols(),
                n
            )));
        }

        let b_norm = b.norm();
        let mut x = DVector::zeros(n);
        if b_norm == 0.0 {
            return Ok(x);
        }
        let threshold = self.tolerance * b_norm;

        let precond = Factored::new(a, self.preconditioner)?;

        let mut r = b.clone();
        let mut r_hat = r.clone();
        let mut p = DVector::zeros(n);
        let mut v = DVector::zeros(n);
        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut restarted = false;

        for iter in 0..self.max_iterations {
            let mut rho_next = r_hat.dot(&r);
            if rho_next.abs() <= f64::EPSILON * r_hat.norm() * r.norm() {
                // r drifted orthogonal to the shadow residual: restart from
                // the true residual.
                if restarted {
                    return Err(breakdown(iter, "rho vanished after restart"));
                }
                r = b - a.mul_vec(&x);
                if r.norm() <= threshold {
                    return Ok(x);
                }
                r_hat = r.clone();
                p.fill(0.0);
                v.fill(0.0);
                rho = 1.0;
                alpha = 1.0;
                omega = 1.0;
                rho_next = r.norm_squared();
                restarted = true;
                log::trace!("BiCGSTAB restarted at iteration {}", iter);
            } else {
                restarted = false;
            }
            let beta = (rho_next / rho) * (alpha / omega);
            p = &r + beta * (&p - omega * &v);
            rho = rho_next;

            let y = precond.apply(&p);
            v = a.mul_vec(&y);
            let denom = r_hat.dot(&v);
            if denom.abs() < f64::MIN_POSITIVE {
                return Err(breakdown(iter, "r_hat . v vanished"));
            }
            alpha = rho / denom;

            let s = &r - alpha * &v;
            if s.norm() <= threshold {
                x += alpha * &y;
                log::trace!("BiCGSTAB converged after {} half iterations", 2 * iter + 1);
                return Ok(x);
            }

            let z = precond.apply(&s);
            let t = a.mul_vec(&z);
            let t_norm_sq = t.norm_squared();
            if t_norm_sq < f64::MIN_POSITIVE {
                return Err(breakdown(iter, "t vanished"));
            }
            omega = t.dot(&s) / t_norm_sq;

            x += alpha * &y + omega * &z;
            r = s - omega * &t;

            if r.norm() <= threshold {
                log::trace!("BiCGSTAB converged after {} iterations", iter + 1);
                return Ok(x);
            }
            if omega.abs() < f64::MIN_POSITIVE {
                return Err(breakdown(iter, "omega vanished"));
            }
        }

        Err(MeshError::ConvergenceFailed {
            iterations: self.max_iterations,
            residual: r.norm() / b_norm,
        })
    }
}

fn breakdown(iterations: usize, reason: &'static str) -> MeshError {
    MeshError::SolverBreakdown { iterations, reason }
}

/// A preconditioner prepared for one matrix.
enum Factored {
    Identity,
    Jacobi(DVector<f64>),
    Ilu0 { lu: CsrMatrix, diag: Vec<usize> },
}

impl Factored {
    fn new(a: &CsrMatrix, kind: Preconditioner) -> Result<Self> {
        match kind {
            Preconditioner::Identity => Ok(Factored::Identity),
            Preconditioner::Jacobi => {
                let diagonal = a.diagonal();
                if diagonal.iter().any(|&d| d == 0.0) {
                    return Err(breakdown(0, "zero diagonal entry"));
                }
                Ok(Factored::Jacobi(diagonal.map(|d| 1.0 / d)))
            }
            Preconditioner::Ilu0 => ilu0(a),
        }
    }

    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        match self {
            Factored::Identity => r.clone(),
            Factored::Jacobi(inv_diag) => r.component_mul(inv_diag),
            Factored::Ilu0 { lu, diag } => {
                let (row_ptr, col_idx, values) = (lu.row_ptr(), lu.col_idx(), lu.values());
                let n = r.len();
                let mut y = r.clone();

                // Forward: unit lower triangle.
                for i in 0..n {
                    for k in row_ptr[i]..diag[i] {
                        y[i] -= values[k] * y[col_idx[k]];
                    }
                }
                // Backward: upper triangle.
                for i in (0..n).rev() {
                    for k in diag[i] + 1..row_ptr[i + 1] {
                        y[i] -= values[k] * y[col_idx[k]];
                    }
                    y[i] /= values[diag[i]];
                }
                y
            }
        }
    }
}

/// Incomplete LU factorization restricted to the sparsity pattern of `a`.
fn ilu0(a: &CsrMatrix) -> Result<Factored> {
    let n = a.nrows();
    let zero_pivot = || breakdown(0, "zero pivot in ILU(0)");

    let mut diag = Vec::with_capacity(n);
    for i in 0..n {
        match a.position(i, i) {
            Some(k) => diag.push(k),
            None => return Err(zero_pivot()),
        }
    }

    let row_ptr = a.row_ptr();
    let col_idx = a.col_idx();
    let mut lu = a.values().to_vec();

    for i in 1..n {
        for kk in row_ptr[i]..diag[i] {
            let k = col_idx[kk];
            let pivot = lu[diag[k]];
            if pivot == 0.0 {
                return Err(zero_pivot());
            }
            lu[kk] /= pivot;
            let factor = lu[kk];
            for jj in kk + 1..row_ptr[i + 1] {
                if let Some(p) = a.position(k, col_idx[jj]) {
                    lu[jj] -= factor * lu[p];
                }
            }
        }
    }

    if diag.iter().any(|&k| lu[k] == 0.0) {
        return Err(zero_pivot());
    }

    Ok(Factored::Ilu0 {
        lu: a.with_values(lu),
        diag,
    })
}

/// Solve `A xu = bu` and `A xv = bv`.
///
/// The two solves run concurrently when `parallel` is set. Failure of
/// either is reported as one [`MeshError::CannotSolveLinearSystem`].
pub fn solve_mvc<S: LinearSolver + ?Sized>(
    solver: &S,
    a: &CsrMatrix,
    bu: &DVector<f64>,
    bv: &DVector<f64>,
    parallel: bool,
) -> Result<(DVector<f64>, DVector<f64>)> {
    let (xu, xv) = if parallel {
        rayon::join(|| solver.solve(a, bu), || solver.solve(a, bv))
    } else {
        (solver.solve(a, bu), solver.solve(a, bv))
    };

    match (xu, xv) {
        (Ok(xu), Ok(xv)) => Ok((xu, xv)),
        (Err(e), _) | (_, Err(e)) => Err(MeshError::cannot_solve(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonsymmetric() -> CsrMatrix {
        // [ 4  1  0 ]
        // [ 2  5  1 ]
        // [ 0  1  3 ]
        CsrMatrix::from_triplets(
            3,
            3,
            &[
                (0, 0, 4.0),
                (0, 1, 1.0),
                (1, 0, 2.0),
                (1, 1, 5.0),
                (1, 2, 1.0),
                (2, 1, 1.0),
                (2, 2, 3.0),
            ],
        )
    }

    fn laplacian_1d(n: usize) -> CsrMatrix {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, &triplets)
    }

    #[test]
    fn test_bicgstab_all_preconditioners() {
        let a = nonsymmetric();
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        for preconditioner in [
            Preconditioner::Ilu0,
            Preconditioner::Jacobi,
            Preconditioner::Identity,
        ] {
            let solver = BiCgStab::new(100, 1e-12, preconditioner);
            let x = solver.solve(&a, &b).unwrap();
            let residual = a.mul_vec(&x) - &b;
            assert!(
                residual.norm() < 1e-9,
                "{:?}: residual {}",
                preconditioner,
                residual.norm()
            );
        }
    }

    #[test]
    fn test_ilu0_is_exact_for_tridiagonal() {
        // ILU(0) of a tridiagonal matrix is its complete LU factorization.
        let a = laplacian_1d(50);
        let b = DVector::from_element(50, 1.0);
        let x = BiCgStab::new(2, 1e-10, Preconditioner::Ilu0).solve(&a, &b).unwrap();
        assert!((a.mul_vec(&x) - &b).norm() < 1e-8);
    }

    #[test]
    fn test_zero_rhs_gives_zero() {
        let x = BiCgStab::default()
            .solve(&nonsymmetric(), &DVector::zeros(3))
            .unwrap();
        assert_eq!(x, DVector::zeros(3));
    }

    /// Path graph with both ends pinned: identity rows at 0 and n-1, zero
    /// right-hand side everywhere else.
    fn pinned_path(n: usize) -> (CsrMatrix, DVector<f64>) {
        let mut triplets = vec![(0, 0, 1.0), (n - 1, n - 1, 1.0)];
        for i in 1..n - 1 {
            triplets.extend([(i, i - 1, -1.0), (i, i, 2.0), (i, i + 1, -1.0)]);
        }
        let mut b = DVector::zeros(n);
        b[0] = 1.0;
        b[n - 1] = 2.0;
        (CsrMatrix::from_triplets(n, n, &triplets), b)
    }

    #[test]
    fn test_restart_when_residual_leaves_shadow_space() {
        // Without preconditioning the residual becomes orthogonal to b after
        // the first step, since both pinned rows are already satisfied.
        let (a, b) = pinned_path(4);
        let x = BiCgStab::new(100, 1e-12, Preconditioner::Identity)
            .solve(&a, &b)
            .unwrap();
        for (i, expected) in [1.0, 4.0 / 3.0, 5.0 / 3.0, 2.0].iter().enumerate() {
            assert!((x[i] - expected).abs() < 1e-9, "x[{}] = {}", i, x[i]);
        }
    }

    #[test]
    fn test_pinned_grid_all_preconditioners() {
        // 2D grid Laplacian with the border pinned to u = x.
        let k = 9;
        let id = |i: usize, j: usize| j * k + i;
        let mut triplets = Vec::new();
        let mut b = DVector::zeros(k * k);
        for j in 0..k {
            for i in 0..k {
                let row = id(i, j);
                if i == 0 || j == 0 || i == k - 1 || j == k - 1 {
                    triplets.push((row, row, 1.0));
                    b[row] = i as f64;
                } else {
                    triplets.push((row, row, 4.0));
                    for nb in [id(i - 1, j), id(i + 1, j), id(i, j - 1), id(i, j + 1)] {
                        triplets.push((row, nb, -1.0));
                    }
                }
            }
        }
        let a = CsrMatrix::from_triplets(k * k, k * k, &triplets);

        for preconditioner in [
            Preconditioner::Ilu0,
            Preconditioner::Jacobi,
            Preconditioner::Identity,
        ] {
            let x = BiCgStab::new(1000, 1e-12, preconditioner)
                .solve(&a, &b)
                .unwrap();
            for j in 0..k {
                for i in 0..k {
                    assert!(
                        (x[id(i, j)] - i as f64).abs() < 1e-8,
                        "{:?}: x({}, {}) = {}",
                        preconditioner,
                        i,
                        j,
                        x[id(i, j)]
                    );
                }
            }
        }
    }

    #[test]
    fn test_iteration_cap_reports_failure() {
        let a = laplacian_1d(50);
        let b = DVector::from_element(50, 1.0);
        let result = BiCgStab::new(1, 1e-12, Preconditioner::Identity).solve(&a, &b);
        assert!(matches!(
            result,
            Err(MeshError::ConvergenceFailed { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_missing_diagonal_rejected_by_ilu0() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 0, 1.0)]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert!(matches!(
            BiCgStab::default().solve(&a, &b),
            Err(MeshError::SolverBreakdown { .. })
        ));
    }

    #[test]
    fn test_solve_mvc_parallel_matches_sequential() {
        let a = nonsymmetric();
        let bu = DVector::from_vec(vec![1.0, 0.0, 2.0]);
        let bv = DVector::from_vec(vec![-1.0, 3.0, 0.5]);
        let solver = BiCgStab::default();

        let (pu, pv) = solve_mvc(&solver, &a, &bu, &bv, true).unwrap();
        let (su, sv) = solve_mvc(&solver, &a, &bu, &bv, false).unwrap();
        assert_eq!(pu, su);
        assert_eq!(pv, sv);
        assert!((a.mul_vec(&pv) - &bv).norm() < 1e-9);
    }

    #[test]
    fn test_solve_mvc_wraps_failure() {
        // Singular and inconsistent for bu.
        let a = CsrMatrix::from_triplets(
            2,
            2,
            &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 1.0)],
        );
        let bu = DVector::from_vec(vec![1.0, 0.0]);
        let bv = DVector::from_vec(vec![1.0, 1.0]);
        let solver = BiCgStab::new(5, 1e-10, Preconditioner::Identity);

        match solve_mvc(&solver, &a, &bu, &bv, true) {
            Err(MeshError::CannotSolveLinearSystem { source }) => assert!(matches!(
                *source,
                MeshError::ConvergenceFailed { .. } | MeshError::SolverBreakdown { .. }
            )),
            other => panic!("expected CannotSolveLinearSystem, got {:?}", other),
        }
    }
}
