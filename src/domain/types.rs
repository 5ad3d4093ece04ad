//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - loaded from JSON (day files, configuration)
//! - exported alongside the output table

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::units::PROTON_MASS_KG;

/// Ion species measured by the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    /// Protons.
    Proton,
    /// Alpha particles (He²⁺), four proton masses.
    Alpha,
}

/// Unit of the angle tables handed over by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    pub fn to_radians(self, value: f64) -> f64 {
        match self {
            AngleUnit::Degrees => value.to_radians(),
            AngleUnit::Radians => value,
        }
    }
}

/// Fitness of a single distribution for fitting.
///
/// Codes are stable and documented; `Good` is the only fit-eligible value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QualityFlag {
    Good = 1,
    PeakOnEdge = 2,
    LowAngularResolution = 3,
    WrongSampleCount = 4,
}

impl QualityFlag {
    pub const ALL: [QualityFlag; 4] = [
        QualityFlag::Good,
        QualityFlag::PeakOnEdge,
        QualityFlag::LowAngularResolution,
        QualityFlag::WrongSampleCount,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_good(self) -> bool {
        self == QualityFlag::Good
    }

    pub fn description(self) -> &'static str {
        match self {
            QualityFlag::Good => "Distribution function is suitable for fitting.",
            QualityFlag::PeakOnEdge => "Peak of the distribution function is on an edge.",
            QualityFlag::LowAngularResolution => {
                "Not all bins adjacent to peak VDF have finite data."
            }
            QualityFlag::WrongSampleCount => {
                "Distribution function doesn't have the expected number of points."
            }
        }
    }
}

/// Terminal state of a single fit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FitStatus {
    /// Skipped by a quality pre-filter; no fit was run.
    NotAttempted = 0,
    Success = 1,
    InsufficientData = 2,
    NonFinitePeak = 3,
    FitFailed = 4,
    OutOfBounds = 5,
}

impl FitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        self == FitStatus::Success
    }
}

/// Fitted bi-Maxwellian parameters.
///
/// Velocities are in km/s, the amplitude in s³/m⁶. The bulk velocity is
/// expressed in the frame of the input velocities (spacecraft frame), not the
/// field-aligned frame used during the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiMaxParams {
    #[serde(rename = "A")]
    pub amplitude: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub vth_perp: f64,
    pub vth_par: f64,
}

impl BiMaxParams {
    pub const NAMES: [&'static str; 6] = ["A", "vx", "vy", "vz", "vth_perp", "vth_par"];

    /// Build from the optimizer's parameter order `[A, vx, vy, vz, vth_perp, vth_par]`.
    pub fn from_array(p: [f64; 6]) -> Self {
        Self {
            amplitude: p[0],
            vx: p[1],
            vy: p[2],
            vz: p[3],
            vth_perp: p[4],
            vth_par: p[5],
        }
    }

    pub fn to_array(self) -> [f64; 6] {
        [
            self.amplitude,
            self.vx,
            self.vy,
            self.vz,
            self.vth_perp,
            self.vth_par,
        ]
    }

    /// Parameters as `(name, value)` pairs in canonical order.
    pub fn named(self) -> Vec<(&'static str, f64)> {
        Self::NAMES.iter().copied().zip(self.to_array()).collect()
    }

    /// Look up a parameter by its canonical name.
    pub fn get(&self, name: &str) -> Option<f64> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.to_array()[i])
    }
}

/// Outcome of fitting one distribution.
///
/// `params` is present if and only if `status` is [`FitStatus::Success`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult<P = BiMaxParams> {
    pub time: NaiveDateTime,
    pub status: FitStatus,
    pub quality_flag: QualityFlag,
    pub params: Option<P>,
}

/// Physical settings for turning raw instrument arrays into a VDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Samples at or below `noise_threshold * peak` are masked out.
    pub noise_threshold: f64,
    /// Proton mass (kg).
    pub proton_mass_kg: f64,
    /// Alpha-particle mass in units of the proton mass.
    pub alpha_mass_ratio: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 0.01,
            proton_mass_kg: PROTON_MASS_KG,
            alpha_mass_ratio: 4.0,
        }
    }
}

impl DistributionConfig {
    pub fn mass_kg(&self, species: Species) -> f64 {
        match species {
            Species::Proton => self.proton_mass_kg,
            Species::Alpha => self.proton_mass_kg * self.alpha_mass_ratio,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.noise_threshold.is_finite() && (0.0..1.0).contains(&self.noise_threshold)) {
            return Err(AppError::invalid_input(format!(
                "Invalid noise threshold {} (must be in [0, 1)).",
                self.noise_threshold
            )));
        }
        if !(self.proton_mass_kg.is_finite() && self.proton_mass_kg > 0.0) {
            return Err(AppError::invalid_input("Proton mass must be finite and > 0."));
        }
        if !(self.alpha_mass_ratio.is_finite() && self.alpha_mass_ratio > 0.0) {
            return Err(AppError::invalid_input("Alpha mass ratio must be finite and > 0."));
        }
        Ok(())
    }
}

/// Fitter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Minimum number of masked samples required to attempt a fit.
    pub min_points: usize,
    /// Initial guess (km/s) for both thermal speeds.
    pub thermal_speed_seed: f64,
    /// Relative tolerance on the reduction of the sum of squares.
    pub ftol: f64,
    /// Relative tolerance on the parameter step.
    pub xtol: f64,
    /// Tolerance on the scaled gradient.
    pub gtol: f64,
    /// Maximum number of model evaluations before the fit is declared failed.
    pub max_evaluations: usize,
    /// Fit samples on the rayon pool in `fit_all`.
    pub parallel: bool,
    /// Skip the fit for samples whose quality flag is not `Good`.
    pub skip_bad_quality: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_points: 12,
            thermal_speed_seed: 40.0,
            ftol: 1e-6,
            xtol: 1e-14,
            gtol: 1e-8,
            // 100 * (n_params + 1)
            max_evaluations: 700,
            parallel: true,
            skip_bad_quality: false,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_points < 6 {
            return Err(AppError::invalid_input(format!(
                "min_points must be at least the parameter count (6), got {}.",
                self.min_points
            )));
        }
        if !(self.thermal_speed_seed.is_finite() && self.thermal_speed_seed > 0.0) {
            return Err(AppError::invalid_input("Thermal speed seed must be finite and > 0."));
        }
        for (name, tol) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(AppError::invalid_input(format!(
                    "Tolerance {name} must be finite and >= 0, got {tol}."
                )));
            }
        }
        if self.max_evaluations == 0 {
            return Err(AppError::invalid_input("max_evaluations must be > 0."));
        }
        Ok(())
    }
}
