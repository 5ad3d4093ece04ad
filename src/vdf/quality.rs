//! Quality checks deciding whether a distribution is worth fitting.
//!
//! Checks run in a fixed order and the first failing one wins:
//!
//! 1. sample count must match the instrument geometry
//! 2. the peak must not sit in an edge azimuth/elevation bin
//! 3. the peak neighbourhood must contain data

use crate::domain::QualityFlag;
use crate::vdf::geometry::{BinIndex, InstrumentGeometry};

/// Classify a distribution from its VDF values and peak sample.
///
/// `peak` is the NaN-ignoring argmax of `vdf` (see [`peak_index`]).
pub fn quality_flag(
    geometry: &InstrumentGeometry,
    vdf: &[f64],
    peak: Option<(usize, f64)>,
) -> QualityFlag {
    if vdf.len() != geometry.n_samples() {
        return QualityFlag::WrongSampleCount;
    }

    let Some((peak_flat, peak_value)) = peak else {
        return QualityFlag::LowAngularResolution;
    };
    if !(peak_value > 0.0) {
        return QualityFlag::LowAngularResolution;
    }

    let idx = geometry.unravel(peak_flat);
    if geometry.is_angular_edge(idx) {
        return QualityFlag::PeakOnEdge;
    }

    if !has_angular_resolution(geometry, vdf, idx) {
        return QualityFlag::LowAngularResolution;
    }

    QualityFlag::Good
}

/// NaN-ignoring argmax; the first index wins on ties.
pub fn peak_index(vdf: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in vdf.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// True if every angularly adjacent bin of a non-edge peak has a positive
/// sample at some energy, and the peak's energy neighbours are positive.
fn has_angular_resolution(geometry: &InstrumentGeometry, vdf: &[f64], peak: BinIndex) -> bool {
    let neighbours = [
        (peak.phi - 1, peak.theta),
        (peak.phi + 1, peak.theta),
        (peak.phi, peak.theta - 1),
        (peak.phi, peak.theta + 1),
    ];

    for (phi, theta) in neighbours {
        let any_positive = (0..geometry.n_energy).any(|energy| {
            let flat = geometry.ravel(BinIndex { phi, theta, energy });
            vdf[flat] > 0.0
        });
        if !any_positive {
            return false;
        }
    }

    let e_lo = peak.energy.saturating_sub(1);
    let e_hi = (peak.energy + 1).min(geometry.n_energy - 1);
    (e_lo..=e_hi).all(|energy| {
        let flat = geometry.ravel(BinIndex {
            energy,
            ..peak
        });
        vdf[flat] > 0.0
    })
}
