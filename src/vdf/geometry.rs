//! Instrument geometry as configuration data.
//!
//! Each supported instrument is a variant of [`Instrument`] whose geometry
//! (bin counts, index layout, mounting offset) is plain data in
//! [`InstrumentGeometry`]. Nothing about an instrument is expressed through
//! separate distribution types.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Order of the bin axes in the flattened sample index (slowest axis first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinLayout {
    /// `(φ, E, θ)`, e.g. PSP SPAN-I.
    PhiEnergyTheta,
    /// `(φ, θ, E)`, e.g. Solar Orbiter PAS.
    PhiThetaEnergy,
}

/// Position of one sample in the instrument's (azimuth, elevation, energy) grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinIndex {
    pub phi: usize,
    pub theta: usize,
    pub energy: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentGeometry {
    pub n_phi: usize,
    pub n_theta: usize,
    pub n_energy: usize,
    pub layout: BinLayout,
    /// Mounting offset (degrees) between the instrument and spacecraft frames.
    pub mounting_offset_deg: f64,
}

impl InstrumentGeometry {
    /// Expected number of samples per distribution.
    pub fn n_samples(&self) -> usize {
        self.n_phi * self.n_theta * self.n_energy
    }

    pub fn unravel(&self, flat: usize) -> BinIndex {
        match self.layout {
            BinLayout::PhiEnergyTheta => BinIndex {
                phi: flat / (self.n_energy * self.n_theta),
                energy: (flat / self.n_theta) % self.n_energy,
                theta: flat % self.n_theta,
            },
            BinLayout::PhiThetaEnergy => BinIndex {
                phi: flat / (self.n_theta * self.n_energy),
                theta: (flat / self.n_energy) % self.n_theta,
                energy: flat % self.n_energy,
            },
        }
    }

    pub fn ravel(&self, idx: BinIndex) -> usize {
        match self.layout {
            BinLayout::PhiEnergyTheta => {
                (idx.phi * self.n_energy + idx.energy) * self.n_theta + idx.theta
            }
            BinLayout::PhiThetaEnergy => {
                (idx.phi * self.n_theta + idx.theta) * self.n_energy + idx.energy
            }
        }
    }

    /// True if the bin lies on the first or last azimuth or elevation bin.
    pub fn is_angular_edge(&self, idx: BinIndex) -> bool {
        idx.phi == 0
            || idx.phi + 1 >= self.n_phi
            || idx.theta == 0
            || idx.theta + 1 >= self.n_theta
    }

    /// Instrument → spacecraft frame rotation.
    ///
    /// ```text
    /// vx = −cos α · vy' − sin α · vz'
    /// vy =  sin α · vy' − cos α · vz'
    /// vz =  vx'
    /// ```
    pub fn mounting_matrix(&self) -> Matrix3<f64> {
        let (s, c) = self.mounting_offset_deg.to_radians().sin_cos();
        Matrix3::new(
            0.0, -c, -s, //
            0.0, s, -c, //
            1.0, 0.0, 0.0,
        )
    }
}

/// Supported instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    /// Parker Solar Probe SWEAP SPAN-I: 8 φ × 32 E × 8 θ, flux input.
    Span,
    /// Solar Orbiter SWA PAS: 11 φ × 9 θ × 96 E, VDF input.
    Pas,
}

impl Instrument {
    pub fn geometry(self) -> InstrumentGeometry {
        match self {
            Instrument::Span => InstrumentGeometry {
                n_phi: 8,
                n_theta: 8,
                n_energy: 32,
                layout: BinLayout::PhiEnergyTheta,
                mounting_offset_deg: 20.0,
            },
            Instrument::Pas => InstrumentGeometry {
                n_phi: 11,
                n_theta: 9,
                n_energy: 96,
                layout: BinLayout::PhiThetaEnergy,
                mounting_offset_deg: 20.0,
            },
        }
    }
}
