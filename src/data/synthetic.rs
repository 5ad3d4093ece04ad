//! Synthetic bi-Maxwellian samples on an instrument grid.
//!
//! The angular grid is centred on the bulk-velocity direction and the energy
//! grid on the bulk energy, so the peak lands away from the angular edges.

use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution as _, Normal};

use crate::domain::{BiMaxParams, DistributionConfig, Species};
use crate::error::{AppError, CODE_NUMERICAL};
use crate::math::vector::FieldVector;
use crate::models::bimax::evaluate;
use crate::units::{JOULES_PER_EV, energy_to_speed_km_s, vdf_to_flux};
use crate::vdf::distribution::RawSample;
use crate::vdf::geometry::{BinIndex, Instrument};

#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Width (degrees) of both azimuth and elevation bins.
    pub angular_step_deg: f64,
    /// Lowest and highest energy, relative to the bulk energy.
    pub energy_min_ratio: f64,
    pub energy_max_ratio: f64,
    /// Relative standard deviation of multiplicative Gaussian noise (0 = none).
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            angular_step_deg: 6.0,
            energy_min_ratio: 0.5,
            energy_max_ratio: 2.0,
            noise: 0.0,
            seed: 0,
        }
    }
}

/// Per-bin arrays in angles (degrees) and energy (eV), plus the VDF.
struct Binned {
    phi: Vec<f64>,
    theta: Vec<f64>,
    energy: Vec<f64>,
    vdf: Vec<f64>,
}

/// Sample `params` (bulk velocity in the spacecraft frame, thermal speeds
/// relative to `field`) on the instrument grid.
fn sample_grid(
    instrument: Instrument,
    params: &BiMaxParams,
    field: &FieldVector,
    species: Species,
    config: &DistributionConfig,
    options: &SyntheticOptions,
) -> Result<Binned, AppError> {
    let bulk = Vector3::new(params.vx, params.vy, params.vz);
    let speed = bulk.norm();
    if !(speed.is_finite() && speed > 0.0) {
        return Err(AppError::invalid_input(
            "Synthetic bulk velocity must be finite and non-zero.",
        ));
    }
    if !(options.energy_min_ratio > 0.0 && options.energy_max_ratio > options.energy_min_ratio) {
        return Err(AppError::invalid_input("Invalid synthetic energy range."));
    }

    let geometry = instrument.geometry();
    let mounting = geometry.mounting_matrix();
    let mass = config.mass_kg(species);

    let bulk_instr = mounting.transpose() * bulk;
    let theta_c = (bulk_instr.z / speed).asin().to_degrees();
    let phi_c = bulk_instr.y.atan2(bulk_instr.x).to_degrees();
    let centred = |i: usize, n: usize| (i as f64 - (n as f64 - 1.0) / 2.0) * options.angular_step_deg;

    let bulk_energy = 0.5 * mass * (speed * 1e3).powi(2) / JOULES_PER_EV;
    let span = options.energy_max_ratio / options.energy_min_ratio;
    let energy_at = |k: usize| {
        let u = k as f64 / (geometry.n_energy as f64 - 1.0).max(1.0);
        bulk_energy * options.energy_min_ratio * span.powf(u)
    };

    let r = field.rotation_matrix();
    let bulk_fa = r * bulk;
    let fa_params = [
        params.amplitude,
        bulk_fa.x,
        bulk_fa.y,
        bulk_fa.z,
        params.vth_perp,
        params.vth_par,
    ];

    let n = geometry.n_samples();
    let mut out = Binned {
        phi: Vec::with_capacity(n),
        theta: Vec::with_capacity(n),
        energy: Vec::with_capacity(n),
        vdf: Vec::with_capacity(n),
    };
    for flat in 0..n {
        let BinIndex { phi, theta, energy } = geometry.unravel(flat);
        let phi = phi_c + centred(phi, geometry.n_phi);
        let theta = theta_c + centred(theta, geometry.n_theta);
        let energy = energy_at(energy);

        let v = energy_to_speed_km_s(energy, mass);
        let (st, ct) = theta.to_radians().sin_cos();
        let (sp, cp) = phi.to_radians().sin_cos();
        let v_instr = Vector3::new(v * ct * cp, v * ct * sp, v * st);
        let v_fa = r * (mounting * v_instr);

        out.phi.push(phi);
        out.theta.push(theta);
        out.energy.push(energy);
        out.vdf.push(evaluate(&v_fa, &fa_params));
    }

    if options.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(options.seed);
        let normal = Normal::new(0.0, options.noise)
            .map_err(|e| AppError::new(CODE_NUMERICAL, format!("Noise distribution error: {e}")))?;
        for f in &mut out.vdf {
            *f *= (1.0 + normal.sample(&mut rng)).max(0.0);
        }
    }

    Ok(out)
}

/// A SPAN-I style flux sample (8 φ × 32 E × 8 θ, degrees).
pub fn span_sample(
    params: &BiMaxParams,
    field: &FieldVector,
    species: Species,
    config: &DistributionConfig,
    options: &SyntheticOptions,
) -> Result<RawSample, AppError> {
    let b = sample_grid(Instrument::Span, params, field, species, config, options)?;
    let mass = config.mass_kg(species);
    let eflux = b
        .vdf
        .iter()
        .zip(&b.energy)
        .map(|(&f, &e)| vdf_to_flux(f, energy_to_speed_km_s(e, mass)))
        .collect();

    Ok(RawSample::Flux {
        eflux,
        energy: b.energy,
        theta: b.theta,
        phi: b.phi,
    })
}

/// A PAS style VDF cube (11 φ × 9 θ × 96 E, degrees).
pub fn pas_sample(
    params: &BiMaxParams,
    field: &FieldVector,
    species: Species,
    config: &DistributionConfig,
    options: &SyntheticOptions,
) -> Result<RawSample, AppError> {
    let b = sample_grid(Instrument::Pas, params, field, species, config, options)?;
    let n_energy = Instrument::Pas.geometry().n_energy;

    // (φ, θ, E) layout: energy varies fastest, angles once per energy sweep.
    Ok(RawSample::Grid {
        energy: b.energy[..n_energy].to_vec(),
        theta: b.theta.iter().step_by(n_energy).copied().collect(),
        phi: b.phi.iter().step_by(n_energy).copied().collect(),
        vdf: b.vdf,
    })
}
