//! Linear solves for the damped normal equations.
//!
//! Each Levenberg–Marquardt iteration solves a small symmetric system
//!
//! ```text
//! (JᵀJ + μ·D) δ = Jᵀr
//! ```
//!
//! Implementation choices:
//! - The system is symmetric positive definite whenever `μ > 0` and `D > 0`,
//!   so Cholesky is the fast path.
//! - If Cholesky fails (near-singular `JᵀJ`, e.g. a parameter with no
//!   influence on the residuals) we fall back to SVD with progressively looser
//!   tolerances.

use nalgebra::{DMatrix, DVector};

/// Solve `a · x = b` for a small symmetric positive (semi-)definite `a`.
///
/// Returns `None` if no finite solution can be found.
pub fn solve_symmetric(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(b);
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }

    let svd = a.clone().svd(true, true);
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}
