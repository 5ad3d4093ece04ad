//! Physical constants and the unit conversions used by the pipeline.
//!
//! Internally everything is carried as plain `f64` in a fixed unit system:
//!
//! - energies in eV
//! - speeds in km/s
//! - VDF values (phase-space density) in s³/m⁶
//! - differential energy flux in eV/(cm² s eV), i.e. 1/(cm² s)
//! - densities in cm⁻³, temperatures in K

/// Proton mass (kg), CODATA 2018.
pub const PROTON_MASS_KG: f64 = 1.672_621_923_69e-27;

/// Boltzmann constant (J/K), exact SI value.
pub const BOLTZMANN_J_PER_K: f64 = 1.380_649e-23;

/// Elementary charge (J/eV), exact SI value.
pub const JOULES_PER_EV: f64 = 1.602_176_634e-19;

/// Flux / speed⁴ conversion: `1/(cm² s) / (km/s)⁴` expressed in s³/m⁶.
///
/// cm⁻² = 1e4 m⁻² and km⁻⁴ = 1e-12 m⁻⁴.
const FLUX_OVER_V4_TO_S3_PER_M6: f64 = 1e-8;

/// `(s³/m⁶)·(km/s)³` expressed in cm⁻³.
///
/// km³/m⁶ = 1e9 m⁻³ = 1e3 cm⁻³.
const VDF_TIMES_V3_TO_PER_CM3: f64 = 1e3;

/// Speed (km/s) of a particle with kinetic energy `energy_ev` and mass `mass_kg`.
pub fn energy_to_speed_km_s(energy_ev: f64, mass_kg: f64) -> f64 {
    (2.0 * energy_ev * JOULES_PER_EV / mass_kg).sqrt() / 1e3
}

/// Phase-space density (s³/m⁶) from differential energy flux and speed (km/s).
pub fn flux_to_vdf(eflux: f64, speed_km_s: f64) -> f64 {
    eflux * 2.0 / speed_km_s.powi(4) * FLUX_OVER_V4_TO_S3_PER_M6
}

/// Differential energy flux from phase-space density (s³/m⁶) and speed (km/s).
///
/// Inverse of [`flux_to_vdf`].
pub fn vdf_to_flux(vdf: f64, speed_km_s: f64) -> f64 {
    vdf * speed_km_s.powi(4) / 2.0 / FLUX_OVER_V4_TO_S3_PER_M6
}

/// Number density (cm⁻³) of a bi-Maxwellian with peak value `amplitude` (s³/m⁶)
/// and thermal speeds in km/s.
pub fn bimax_density_per_cm3(amplitude: f64, vth_perp: f64, vth_par: f64) -> f64 {
    amplitude
        * std::f64::consts::PI.powf(1.5)
        * vth_perp.powi(2)
        * vth_par
        * VDF_TIMES_V3_TO_PER_CM3
}

/// Temperature (K) for a thermal speed (km/s): `T = m·v_th²/(2·k_B)`.
pub fn thermal_speed_to_temperature(vth_km_s: f64, mass_kg: f64) -> f64 {
    let v = vth_km_s * 1e3;
    mass_kg * v * v / (2.0 * BOLTZMANN_J_PER_K)
}
