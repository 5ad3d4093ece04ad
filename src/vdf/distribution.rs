//! A single velocity distribution function measurement.
//!
//! A [`Distribution`] is built once from the raw arrays handed over by a data
//! source and is immutable afterwards. Derived quantities (speeds, velocities,
//! VDF values, mask, peak, quality flag) are computed on first access and
//! cached in `OnceLock`s, so a distribution can be shared across threads.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::domain::{AngleUnit, DistributionConfig, QualityFlag, Species};
use crate::error::AppError;
use crate::math::vector::FieldVector;
use crate::units::{energy_to_speed_km_s, flux_to_vdf};
use crate::vdf::geometry::InstrumentGeometry;
use crate::vdf::quality::{peak_index, quality_flag};

/// Raw arrays for one timestamp, in one of the two supported shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum RawSample {
    /// One entry per bin: differential energy flux (eV/(cm² s eV)), energy
    /// (eV), elevation θ and azimuth φ. Bins with non-finite θ are unused and
    /// get dropped.
    Flux {
        eflux: Vec<f64>,
        energy: Vec<f64>,
        theta: Vec<f64>,
        phi: Vec<f64>,
    },
    /// Phase-space density cube (s³/m⁶) laid out `(φ, θ, E)`, an energy axis
    /// (n_E) and θ/φ tables of `n_φ × n_θ` entries.
    Grid {
        vdf: Vec<f64>,
        energy: Vec<f64>,
        theta: Vec<f64>,
        phi: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
enum Values {
    Flux(Vec<f64>),
    Vdf(Vec<f64>),
}

#[derive(Debug)]
pub struct Distribution {
    time: NaiveDateTime,
    species: Species,
    mass_kg: f64,
    field: FieldVector,
    geometry: InstrumentGeometry,
    noise_threshold: f64,

    energy: Vec<f64>,
    theta: Vec<f64>,
    phi: Vec<f64>,
    values: Values,

    speeds: OnceLock<Vec<f64>>,
    velocities_instr: OnceLock<Vec<Vector3<f64>>>,
    velocities: OnceLock<Vec<Vector3<f64>>>,
    vdf: OnceLock<Vec<f64>>,
    mask: OnceLock<Vec<bool>>,
    peak: OnceLock<Option<(usize, f64)>>,
    quality: OnceLock<QualityFlag>,
}

impl Distribution {
    /// Build a distribution from raw arrays.
    ///
    /// Fails if the per-bin arrays are inconsistent in length or the
    /// configuration is invalid. A sample count that does not match
    /// `geometry` is *not* an error; it is reported by [`Self::quality_flag`].
    pub fn from_raw(
        raw: RawSample,
        angle_unit: AngleUnit,
        species: Species,
        time: NaiveDateTime,
        field: FieldVector,
        geometry: &InstrumentGeometry,
        config: &DistributionConfig,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let (energy, theta, phi, values) = match raw {
            RawSample::Flux {
                eflux,
                energy,
                theta,
                phi,
            } => {
                let n = eflux.len();
                if energy.len() != n || theta.len() != n || phi.len() != n {
                    return Err(AppError::invalid_input(format!(
                        "Flux sample at {time}: array lengths differ (eflux={n}, energy={}, theta={}, phi={}).",
                        energy.len(),
                        theta.len(),
                        phi.len()
                    )));
                }

                let keep: Vec<usize> = (0..n).filter(|&i| theta[i].is_finite()).collect();
                let pick = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();
                (
                    pick(&energy),
                    pick(&theta),
                    pick(&phi),
                    Values::Flux(pick(&eflux)),
                )
            }
            RawSample::Grid {
                vdf,
                energy,
                theta,
                phi,
            } => {
                let n_angles = theta.len();
                let n_energy = energy.len();
                if phi.len() != n_angles || vdf.len() != n_angles * n_energy {
                    return Err(AppError::invalid_input(format!(
                        "Grid sample at {time}: expected vdf of {n_angles}x{n_energy} with {n_angles} phi entries, got vdf={} phi={}.",
                        vdf.len(),
                        phi.len()
                    )));
                }

                let mut e_flat = Vec::with_capacity(vdf.len());
                let mut t_flat = Vec::with_capacity(vdf.len());
                let mut p_flat = Vec::with_capacity(vdf.len());
                for a in 0..n_angles {
                    for &e in &energy {
                        e_flat.push(e);
                        t_flat.push(theta[a]);
                        p_flat.push(phi[a]);
                    }
                }
                (e_flat, t_flat, p_flat, Values::Vdf(vdf))
            }
        };

        let theta = theta.into_iter().map(|t| angle_unit.to_radians(t)).collect();
        let phi = phi.into_iter().map(|p| angle_unit.to_radians(p)).collect();

        Ok(Self {
            time,
            species,
            mass_kg: config.mass_kg(species),
            field,
            geometry: geometry.clone(),
            noise_threshold: config.noise_threshold,
            energy,
            theta,
            phi,
            values,
            speeds: OnceLock::new(),
            velocities_instr: OnceLock::new(),
            velocities: OnceLock::new(),
            vdf: OnceLock::new(),
            mask: OnceLock::new(),
            peak: OnceLock::new(),
            quality: OnceLock::new(),
        })
    }

    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    pub fn field(&self) -> &FieldVector {
        &self.field
    }

    pub fn geometry(&self) -> &InstrumentGeometry {
        &self.geometry
    }

    /// Number of samples (after dropping unused bins).
    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    /// `|v| = sqrt(2E/m)` per sample, km/s.
    pub fn speeds(&self) -> &[f64] {
        self.speeds.get_or_init(|| {
            self.energy
                .iter()
                .map(|&e| energy_to_speed_km_s(e, self.mass_kg))
                .collect()
        })
    }

    /// Velocities (km/s) in the instrument frame.
    pub fn velocities_instrument_frame(&self) -> &[Vector3<f64>] {
        self.velocities_instr.get_or_init(|| {
            self.speeds()
                .iter()
                .zip(self.theta.iter().zip(&self.phi))
                .map(|(&v, (&theta, &phi))| {
                    Vector3::new(
                        v * theta.cos() * phi.cos(),
                        v * theta.cos() * phi.sin(),
                        v * theta.sin(),
                    )
                })
                .collect()
        })
    }

    /// Velocities (km/s) in the spacecraft frame, the frame of the field vector.
    pub fn velocities(&self) -> &[Vector3<f64>] {
        self.velocities.get_or_init(|| {
            let m = self.geometry.mounting_matrix();
            self.velocities_instrument_frame()
                .iter()
                .map(|v| m * v)
                .collect()
        })
    }

    /// Phase-space density per sample, s³/m⁶.
    pub fn vdf_values(&self) -> &[f64] {
        self.vdf.get_or_init(|| match &self.values {
            Values::Flux(eflux) => eflux
                .iter()
                .zip(self.speeds())
                .map(|(&f, &v)| flux_to_vdf(f, v))
                .collect(),
            Values::Vdf(vdf) => vdf.clone(),
        })
    }

    /// NaN-ignoring peak `(index, value)` of the VDF.
    pub fn peak(&self) -> Option<(usize, f64)> {
        *self.peak.get_or_init(|| peak_index(self.vdf_values()))
    }

    /// Samples whose VDF exceeds `noise_threshold` times the peak value.
    ///
    /// An all-zero or all-NaN VDF yields an all-false mask.
    pub fn mask(&self) -> &[bool] {
        self.mask.get_or_init(|| {
            let vdf = self.vdf_values();
            match self.peak() {
                Some((_, peak)) => {
                    let cut = self.noise_threshold * peak;
                    vdf.iter().map(|&v| v > cut).collect()
                }
                None => vec![false; vdf.len()],
            }
        })
    }

    pub fn quality_flag(&self) -> QualityFlag {
        *self
            .quality
            .get_or_init(|| quality_flag(&self.geometry, self.vdf_values(), self.peak()))
    }

    /// Velocities and VDF values of the samples kept by [`Self::mask`].
    pub fn masked_samples(&self) -> (Vec<Vector3<f64>>, Vec<f64>) {
        self.velocities()
            .iter()
            .zip(self.vdf_values())
            .zip(self.mask())
            .filter(|(_, keep)| **keep)
            .map(|((v, f), _)| (*v, *f))
            .unzip()
    }
}
