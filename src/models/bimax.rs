//! Bi-Maxwellian velocity distribution.
//!
//! In the field-aligned frame (+z along B):
//!
//! ```text
//! f(v) = A · exp(−((vx−bx)/p)² − ((vy−by)/p)² − ((vz−bz)/q)²)
//! ```
//!
//! with parameter order `[A, bx, by, bz, p, q]`, `p = vth_perp`, `q = vth_par`.

use nalgebra::{DVector, Vector3};

use crate::math::lm::LeastSquaresProblem;

/// Number of model parameters.
pub const N_PARAMS: usize = 6;

/// Evaluate the model at velocity `v` (field-aligned frame).
pub fn evaluate(v: &Vector3<f64>, params: &[f64]) -> f64 {
    let dx = (v.x - params[1]) / params[4];
    let dy = (v.y - params[2]) / params[4];
    let dz = (v.z - params[3]) / params[5];
    params[0] * (-(dx * dx + dy * dy + dz * dz)).exp()
}

/// Evaluate the model and its gradient with respect to the parameters.
pub fn evaluate_with_gradient(v: &Vector3<f64>, params: &[f64], grad: &mut [f64]) -> f64 {
    let (amp, p, q) = (params[0], params[4], params[5]);
    let ux = v.x - params[1];
    let uy = v.y - params[2];
    let uz = v.z - params[3];
    let p2 = p * p;
    let q2 = q * q;

    let e = (-((ux * ux + uy * uy) / p2 + uz * uz / q2)).exp();
    let f = amp * e;

    grad[0] = e;
    grad[1] = 2.0 * f * ux / p2;
    grad[2] = 2.0 * f * uy / p2;
    grad[3] = 2.0 * f * uz / q2;
    grad[4] = 2.0 * f * (ux * ux + uy * uy) / (p2 * p);
    grad[5] = 2.0 * f * uz * uz / (q2 * q);
    f
}

/// Least-squares problem: fit the model to VDF samples in the field-aligned frame.
pub struct BiMaxProblem<'a> {
    pub velocities: &'a [Vector3<f64>],
    pub vdf: &'a [f64],
}

impl LeastSquaresProblem for BiMaxProblem<'_> {
    fn n_params(&self) -> usize {
        N_PARAMS
    }

    fn n_observations(&self) -> usize {
        self.vdf.len()
    }

    fn observed(&self, i: usize) -> f64 {
        self.vdf[i]
    }

    fn value(&self, i: usize, params: &DVector<f64>) -> f64 {
        evaluate(&self.velocities[i], params.as_slice())
    }

    fn value_and_gradient(&self, i: usize, params: &DVector<f64>, grad: &mut [f64]) -> f64 {
        evaluate_with_gradient(&self.velocities[i], params.as_slice(), grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: [f64; 6] = [10.0, 100.0, -5.0, 3.0, 40.0, 60.0];

    #[test]
    fn peak_value_is_amplitude() {
        let v = Vector3::new(100.0, -5.0, 3.0);
        assert_eq!(evaluate(&v, &PARAMS), 10.0);
    }

    #[test]
    fn one_thermal_width_drops_by_e() {
        let perp = Vector3::new(140.0, -5.0, 3.0);
        let par = Vector3::new(100.0, -5.0, 63.0);
        let expected = 10.0 * (-1.0_f64).exp();
        assert!((evaluate(&perp, &PARAMS) - expected).abs() < 1e-12);
        assert!((evaluate(&par, &PARAMS) - expected).abs() < 1e-12);
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let v = Vector3::new(130.0, 20.0, -40.0);
        let mut grad = [0.0; N_PARAMS];
        let f0 = evaluate_with_gradient(&v, &PARAMS, &mut grad);
        assert_eq!(f0, evaluate(&v, &PARAMS));

        for j in 0..N_PARAMS {
            let h = 1e-6 * PARAMS[j].abs().max(1.0);
            let mut up = PARAMS;
            let mut down = PARAMS;
            up[j] += h;
            down[j] -= h;
            let numeric = (evaluate(&v, &up) - evaluate(&v, &down)) / (2.0 * h);
            let scale = grad[j].abs().max(1e-12);
            assert!(
                (numeric - grad[j]).abs() / scale < 1e-5,
                "param {j}: analytic {} vs numeric {numeric}",
                grad[j]
            );
        }
    }
}
