//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `½ Σ (y_i − f_i(x))²` for a small parameter vector `x`.
//!
//! The implementation follows the classic MINPACK recipe:
//! - Marquardt scaling: the damping term is `μ·D` with `D` the running maximum
//!   of `diag(JᵀJ)`, so parameters of very different magnitude (a VDF
//!   amplitude of 1e-10 next to velocities of 1e2) are damped comparably.
//! - Nielsen's damping update on accepted steps, geometric growth on rejected ones.
//! - Termination on relative cost reduction (`ftol`), relative scaled step
//!   size (`xtol`), scaled gradient (`gtol`), or the evaluation budget.
//!
//! It is deterministic: identical inputs give identical iterates.

use nalgebra::{DMatrix, DVector};

use crate::math::solve::solve_symmetric;

/// A least-squares problem with an analytic Jacobian.
pub trait LeastSquaresProblem {
    fn n_params(&self) -> usize;

    fn n_observations(&self) -> usize;

    fn observed(&self, i: usize) -> f64;

    /// Model value at observation `i`.
    fn value(&self, i: usize, params: &DVector<f64>) -> f64;

    /// Model value at observation `i`, writing `∂f_i/∂x` into `grad`.
    fn value_and_gradient(&self, i: usize, params: &DVector<f64>, grad: &mut [f64]) -> f64;
}

/// Solver tolerances and budget.
#[derive(Debug, Clone, Copy)]
pub struct LmSettings {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub max_evaluations: usize,
}

impl Default for LmSettings {
    fn default() -> Self {
        Self {
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            max_evaluations: 1000,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmTermination {
    /// Relative reduction of the cost fell below `ftol`.
    Ftol,
    /// Relative step size fell below `xtol`.
    Xtol,
    /// Scaled gradient fell below `gtol` (includes an exact fit).
    Gtol,
    /// Evaluation budget exhausted.
    MaxEvaluations,
    /// The cost at the starting point was not finite.
    NonFinite,
    /// The damped normal equations could not be solved.
    Singular,
}

impl LmTermination {
    pub fn converged(self) -> bool {
        matches!(self, LmTermination::Ftol | LmTermination::Xtol | LmTermination::Gtol)
    }
}

#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: DVector<f64>,
    /// `½ Σ r_i²` at `params`.
    pub cost: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: LmTermination,
}

impl LmOutcome {
    pub fn converged(&self) -> bool {
        self.termination.converged()
    }
}

/// Run Levenberg–Marquardt from `x0`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    x0: DVector<f64>,
    settings: &LmSettings,
) -> LmOutcome {
    let p = problem.n_params();
    let mut x = x0;
    let mut lin = linearize(problem, &x);
    let mut evaluations = 1usize;
    let mut iterations = 0usize;

    let finish = |x: DVector<f64>, cost, evaluations, iterations, termination| LmOutcome {
        params: x,
        cost,
        evaluations,
        iterations,
        termination,
    };

    if !lin.cost.is_finite() {
        return finish(x, lin.cost, evaluations, iterations, LmTermination::NonFinite);
    }

    let mut diag = DVector::from_fn(p, |j, _| {
        let d = lin.jtj[(j, j)];
        if d > 0.0 { d } else { 1.0 }
    });
    let mut mu: f64 = 1e-3;
    let mut nu: f64 = 2.0;

    loop {
        if scaled_gradient(&lin) <= settings.gtol {
            return finish(x, lin.cost, evaluations, iterations, LmTermination::Gtol);
        }

        // Inner loop: increase damping until a step reduces the cost.
        loop {
            if evaluations >= settings.max_evaluations {
                return finish(x, lin.cost, evaluations, iterations, LmTermination::MaxEvaluations);
            }

            // Solve in scaled variables `D^½ δ` so the system is well conditioned.
            let scale = diag.map(|d| 1.0 / d.sqrt());
            let mut a = DMatrix::from_fn(p, p, |i, j| lin.jtj[(i, j)] * scale[i] * scale[j]);
            for j in 0..p {
                a[(j, j)] += mu;
            }
            let Some(scaled_step) = solve_symmetric(&a, &lin.jtr.component_mul(&scale)) else {
                return finish(x, lin.cost, evaluations, iterations, LmTermination::Singular);
            };
            let step = scaled_step.component_mul(&scale);

            if scaled_norm(&diag, &step) <= settings.xtol * (settings.xtol + scaled_norm(&diag, &x)) {
                return finish(x, lin.cost, evaluations, iterations, LmTermination::Xtol);
            }

            let x_new = &x + &step;
            let cost_new = cost_at(problem, &x_new);
            evaluations += 1;

            let damping: f64 = (0..p).map(|j| diag[j] * step[j] * step[j]).sum();
            let predicted = 0.5 * (step.dot(&lin.jtr) + mu * damping);
            let actual = lin.cost - cost_new;
            let rho = if predicted > 0.0 && cost_new.is_finite() {
                actual / predicted
            } else {
                -1.0
            };

            if rho > 0.0 {
                let ftol_hit = actual <= settings.ftol * lin.cost
                    && predicted <= settings.ftol * lin.cost;

                x = x_new;
                lin = linearize(problem, &x);
                iterations += 1;
                for j in 0..p {
                    diag[j] = diag[j].max(lin.jtj[(j, j)]);
                }
                mu *= (1.0 - (2.0 * rho - 1.0).powi(3)).max(1.0 / 3.0);
                nu = 2.0;

                if ftol_hit {
                    return finish(x, lin.cost, evaluations, iterations, LmTermination::Ftol);
                }
                break;
            }

            mu *= nu;
            nu *= 2.0;
            if !mu.is_finite() {
                return finish(x, lin.cost, evaluations, iterations, LmTermination::Xtol);
            }
        }
    }
}

struct Linearization {
    cost: f64,
    jtj: DMatrix<f64>,
    jtr: DVector<f64>,
}

fn linearize<P: LeastSquaresProblem>(problem: &P, x: &DVector<f64>) -> Linearization {
    let p = problem.n_params();
    let mut jtj = DMatrix::<f64>::zeros(p, p);
    let mut jtr = DVector::<f64>::zeros(p);
    let mut grad = vec![0.0; p];
    let mut sse = 0.0;

    for i in 0..problem.n_observations() {
        let f = problem.value_and_gradient(i, x, &mut grad);
        let r = problem.observed(i) - f;
        sse += r * r;
        for a in 0..p {
            jtr[a] += grad[a] * r;
            for b in a..p {
                jtj[(a, b)] += grad[a] * grad[b];
            }
        }
    }
    for a in 0..p {
        for b in 0..a {
            jtj[(a, b)] = jtj[(b, a)];
        }
    }

    Linearization {
        cost: 0.5 * sse,
        jtj,
        jtr,
    }
}

fn cost_at<P: LeastSquaresProblem>(problem: &P, x: &DVector<f64>) -> f64 {
    let sse: f64 = (0..problem.n_observations())
        .map(|i| {
            let r = problem.observed(i) - problem.value(i, x);
            r * r
        })
        .sum();
    0.5 * sse
}

/// `‖D^½ v‖` for the Marquardt scaling `D`.
fn scaled_norm(diag: &DVector<f64>, v: &DVector<f64>) -> f64 {
    diag.iter()
        .zip(v.iter())
        .map(|(d, x)| d * x * x)
        .sum::<f64>()
        .sqrt()
}

/// `max_j |J_jᵀ r| / (‖J_j‖ ‖r‖)`; zero when the residual vanishes.
fn scaled_gradient(lin: &Linearization) -> f64 {
    let rnorm = (2.0 * lin.cost).sqrt();
    if rnorm == 0.0 {
        return 0.0;
    }
    let mut g = 0.0_f64;
    for j in 0..lin.jtr.len() {
        let cnorm = lin.jtj[(j, j)].sqrt();
        if cnorm > 0.0 {
            g = g.max(lin.jtr[j].abs() / (cnorm * rnorm));
        }
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = a · exp(-b t)`.
    struct ExpDecay {
        t: Vec<f64>,
        y: Vec<f64>,
    }

    impl ExpDecay {
        fn new(a: f64, b: f64) -> Self {
            let t: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
            let y = t.iter().map(|&t| a * (-b * t).exp()).collect();
            Self { t, y }
        }
    }

    impl LeastSquaresProblem for ExpDecay {
        fn n_params(&self) -> usize {
            2
        }

        fn n_observations(&self) -> usize {
            self.t.len()
        }

        fn observed(&self, i: usize) -> f64 {
            self.y[i]
        }

        fn value(&self, i: usize, x: &DVector<f64>) -> f64 {
            x[0] * (-x[1] * self.t[i]).exp()
        }

        fn value_and_gradient(&self, i: usize, x: &DVector<f64>, grad: &mut [f64]) -> f64 {
            let e = (-x[1] * self.t[i]).exp();
            grad[0] = e;
            grad[1] = -x[0] * self.t[i] * e;
            x[0] * e
        }
    }

    #[test]
    fn recovers_exponential_decay() {
        let problem = ExpDecay::new(2.5, 0.7);
        let out = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&[1.0, 1.5]),
            &LmSettings::default(),
        );
        assert!(out.converged(), "termination {:?}", out.termination);
        assert!((out.params[0] - 2.5).abs() < 1e-6, "a = {}", out.params[0]);
        assert!((out.params[1] - 0.7).abs() < 1e-6, "b = {}", out.params[1]);
        assert!(out.cost < 1e-12);
    }

    #[test]
    fn exhausted_budget_is_not_converged() {
        let problem = ExpDecay::new(2.5, 0.7);
        let settings = LmSettings {
            max_evaluations: 1,
            ..LmSettings::default()
        };
        let out = levenberg_marquardt(&problem, DVector::from_row_slice(&[1.0, 1.5]), &settings);
        assert_eq!(out.termination, LmTermination::MaxEvaluations);
        assert!(!out.converged());
    }

    #[test]
    fn exact_start_stops_on_gradient() {
        let problem = ExpDecay::new(2.5, 0.7);
        let out = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&[2.5, 0.7]),
            &LmSettings::default(),
        );
        assert!(out.converged());
        assert_eq!(out.iterations, 0);
    }

    #[test]
    fn non_finite_start_is_reported() {
        let problem = ExpDecay::new(2.5, 0.7);
        let out = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&[f64::NAN, 0.7]),
            &LmSettings::default(),
        );
        assert_eq!(out.termination, LmTermination::NonFinite);
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let problem = ExpDecay::new(1.3, 0.4);
        let x0 = DVector::from_row_slice(&[0.5, 1.0]);
        let a = levenberg_marquardt(&problem, x0.clone(), &LmSettings::default());
        let b = levenberg_marquardt(&problem, x0, &LmSettings::default());
        assert_eq!(a.params, b.params);
        assert_eq!(a.evaluations, b.evaluations);
    }
}
