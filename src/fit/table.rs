//! Column-oriented output of a batch fit.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{BiMaxParams, FitResult};
use crate::units::{bimax_density_per_cm3, thermal_speed_to_temperature};

/// One fitted distribution together with the particle mass used to derive
/// temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSample {
    pub result: FitResult<BiMaxParams>,
    pub mass_kg: f64,
}

/// Borrowed view of a single output column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Column<'a> {
    Time(&'a [NaiveDateTime]),
    Float(&'a [f64]),
    Code(&'a [u8]),
}

/// Time-indexed fit results.
///
/// All columns have the same length. Rows without a successful fit carry NaN
/// in the physical columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputTable {
    pub time: Vec<NaiveDateTime>,
    /// Number density, cm⁻³.
    pub n: Vec<f64>,
    /// Bulk velocity, km/s.
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vz: Vec<f64>,
    /// Temperatures, K.
    #[serde(rename = "T_perp")]
    pub t_perp: Vec<f64>,
    #[serde(rename = "T_par")]
    pub t_par: Vec<f64>,
    pub fit_status: Vec<u8>,
    pub quality_flag: Vec<u8>,
}

impl OutputTable {
    pub const COLUMNS: [&'static str; 9] = [
        "time",
        "n",
        "vx",
        "vy",
        "vz",
        "T_perp",
        "T_par",
        "fit_status",
        "quality_flag",
    ];

    /// Build a table from samples already in output order.
    pub fn from_samples(samples: &[FittedSample]) -> Self {
        let mut table = Self::with_capacity(samples.len());
        for sample in samples {
            table.push(sample);
        }
        table
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            time: Vec::with_capacity(n),
            n: Vec::with_capacity(n),
            vx: Vec::with_capacity(n),
            vy: Vec::with_capacity(n),
            vz: Vec::with_capacity(n),
            t_perp: Vec::with_capacity(n),
            t_par: Vec::with_capacity(n),
            fit_status: Vec::with_capacity(n),
            quality_flag: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, sample: &FittedSample) {
        let r = &sample.result;
        self.time.push(r.time);
        self.fit_status.push(r.status.code());
        self.quality_flag.push(r.quality_flag.code());

        let params = r.params.filter(|_| r.status.is_success());
        match params {
            Some(p) => {
                self.n
                    .push(bimax_density_per_cm3(p.amplitude, p.vth_perp, p.vth_par));
                self.vx.push(p.vx);
                self.vy.push(p.vy);
                self.vz.push(p.vz);
                self.t_perp
                    .push(thermal_speed_to_temperature(p.vth_perp, sample.mass_kg));
                self.t_par
                    .push(thermal_speed_to_temperature(p.vth_par, sample.mass_kg));
            }
            None => {
                for col in [
                    &mut self.n,
                    &mut self.vx,
                    &mut self.vy,
                    &mut self.vz,
                    &mut self.t_perp,
                    &mut self.t_par,
                ] {
                    col.push(f64::NAN);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Look up a column by its output name.
    pub fn column(&self, name: &str) -> Option<Column<'_>> {
        let col = match name {
            "time" => Column::Time(&self.time),
            "n" => Column::Float(&self.n),
            "vx" => Column::Float(&self.vx),
            "vy" => Column::Float(&self.vy),
            "vz" => Column::Float(&self.vz),
            "T_perp" => Column::Float(&self.t_perp),
            "T_par" => Column::Float(&self.t_par),
            "fit_status" => Column::Code(&self.fit_status),
            "quality_flag" => Column::Code(&self.quality_flag),
            _ => return None,
        };
        Some(col)
    }

    /// Number of rows with a successful fit.
    pub fn n_success(&self) -> usize {
        self.fit_status.iter().filter(|&&s| s == 1).count()
    }
}
