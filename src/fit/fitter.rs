//! Fitting a model to a single distribution.
//!
//! Given:
//! - masked velocity samples (spacecraft frame, km/s)
//! - the matching VDF values (s³/m⁶)
//! - the magnetic-field vector in the same frame
//!
//! the bi-Maxwellian fitter walks a small state machine whose terminal states
//! are the [`FitStatus`] codes:
//!
//! 1. fewer than `min_points` samples → `InsufficientData`
//! 2. rotate samples into the field-aligned frame
//! 3. initial guess from the VDF peak; non-finite peak velocity → `NonFinitePeak`
//! 4. Levenberg–Marquardt; no convergence or `vth_perp == vth_par` → `FitFailed`
//! 5. bulk velocity outside the sampled range on any axis → `OutOfBounds`
//! 6. rotate the bulk velocity back to the input frame → `Success`

use nalgebra::{DVector, Vector3};
use tracing::debug;

use crate::domain::{BiMaxParams, FitConfig, FitResult, FitStatus};
use crate::error::AppError;
use crate::math::lm::{LmSettings, levenberg_marquardt};
use crate::math::vector::FieldVector;
use crate::models::bimax::BiMaxProblem;
use crate::vdf::distribution::Distribution;
use crate::vdf::quality::peak_index;

/// A model fitter for single distributions.
pub trait Fitter {
    type Params;

    /// Names of the fitted parameters, in output order.
    fn param_names(&self) -> &'static [&'static str];

    /// Descriptions of the failure codes this fitter can return.
    fn status_info(&self) -> Vec<(FitStatus, &'static str)>;

    /// Fit masked samples. `velocities` must be in the frame of `field`.
    ///
    /// Returns the fitted parameters, or the failure status. There are no
    /// partially valid results.
    fn run_single_fit(
        &self,
        velocities: &[Vector3<f64>],
        vdf: &[f64],
        field: &FieldVector,
    ) -> Result<Self::Params, FitStatus>;

    /// Mask a distribution, fit it and attach its time and quality flag.
    fn fit(&self, dist: &Distribution) -> FitResult<Self::Params> {
        let (velocities, vdf) = dist.masked_samples();
        let (status, params) = match self.run_single_fit(&velocities, &vdf, dist.field()) {
            Ok(params) => (FitStatus::Success, Some(params)),
            Err(status) => {
                debug!(time = %dist.time(), ?status, n_masked = vdf.len(), "fit rejected");
                (status, None)
            }
        };

        FitResult {
            time: dist.time(),
            status,
            quality_flag: dist.quality_flag(),
            params,
        }
    }
}

/// Bi-Maxwellian fitter.
#[derive(Debug, Clone, Default)]
pub struct BiMaxFitter {
    config: FitConfig,
}

impl BiMaxFitter {
    pub fn new(config: FitConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// `[A, vx, vy, vz, vth_perp, vth_par]` from the VDF peak.
    ///
    /// Returns `None` when the VDF has no finite peak.
    pub fn initial_guess(&self, velocities: &[Vector3<f64>], vdf: &[f64]) -> Option<[f64; 6]> {
        let (idx, amplitude) = peak_index(vdf)?;
        let v0 = velocities[idx];
        let seed = self.config.thermal_speed_seed;
        Some([amplitude, v0.x, v0.y, v0.z, seed, seed])
    }

    fn lm_settings(&self) -> LmSettings {
        LmSettings {
            ftol: self.config.ftol,
            xtol: self.config.xtol,
            gtol: self.config.gtol,
            max_evaluations: self.config.max_evaluations,
        }
    }
}

impl Fitter for BiMaxFitter {
    type Params = BiMaxParams;

    fn param_names(&self) -> &'static [&'static str] {
        &BiMaxParams::NAMES
    }

    fn status_info(&self) -> Vec<(FitStatus, &'static str)> {
        vec![
            (FitStatus::InsufficientData, "Less than 12 points available for fit."),
            (FitStatus::NonFinitePeak, "Velocity at peak VDF is non-finite."),
            (FitStatus::FitFailed, "Fit failed."),
            (FitStatus::OutOfBounds, "Fitted velocity is out of the VDF bounds."),
        ]
    }

    fn run_single_fit(
        &self,
        velocities: &[Vector3<f64>],
        vdf: &[f64],
        field: &FieldVector,
    ) -> Result<BiMaxParams, FitStatus> {
        if vdf.len() < self.config.min_points || velocities.len() != vdf.len() {
            return Err(FitStatus::InsufficientData);
        }

        let r = field.rotation_matrix();
        let rotated: Vec<Vector3<f64>> = velocities.iter().map(|v| r * v).collect();

        let guess = self
            .initial_guess(&rotated, vdf)
            .ok_or(FitStatus::NonFinitePeak)?;
        if guess[1..4].iter().any(|v| !v.is_finite()) {
            return Err(FitStatus::NonFinitePeak);
        }

        let problem = BiMaxProblem {
            velocities: &rotated,
            vdf,
        };
        let outcome = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&guess),
            &self.lm_settings(),
        );
        let p = &outcome.params;
        if !outcome.converged()
            || p.iter().any(|v| !v.is_finite())
            || p[4].abs() == p[5].abs()
        {
            debug!(
                termination = ?outcome.termination,
                evaluations = outcome.evaluations,
                "optimizer did not produce a usable fit"
            );
            return Err(FitStatus::FitFailed);
        }

        let bulk = Vector3::new(p[1], p[2], p[3]);
        if !within_sampled_range(&bulk, &rotated) {
            return Err(FitStatus::OutOfBounds);
        }

        let bulk = r.transpose() * bulk;
        Ok(BiMaxParams {
            amplitude: p[0],
            vx: bulk.x,
            vy: bulk.y,
            vz: bulk.z,
            vth_perp: p[4].abs(),
            vth_par: p[5].abs(),
        })
    }
}

/// True if `v` lies within the per-axis `[min, max]` of `samples`.
pub fn within_sampled_range(v: &Vector3<f64>, samples: &[Vector3<f64>]) -> bool {
    (0..3).all(|k| {
        let (lo, hi) = samples
            .iter()
            .map(|s| s[k])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            });
        v[k] >= lo && v[k] <= hi
    })
}
