//! End-to-end fit pipeline.
//!
//! day file -> distributions -> bi-Maxwellian fits -> output table

use std::path::Path;

use tracing::info;

use crate::domain::FitConfig;
use crate::error::AppError;
use crate::fit::{BiMaxFitter, OutputTable};
use crate::io::day_file::DayFile;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub day: DayFile,
    pub table: OutputTable,
}

/// Load a day file and fit every sample in it.
pub fn run_fit(path: &Path, config: &FitConfig) -> Result<RunOutput, AppError> {
    let day = DayFile::read_json(path)?;
    info!(
        path = %path.display(),
        instrument = ?day.instrument,
        species = ?day.species,
        samples = day.samples.len(),
        "loaded day file"
    );
    run_fit_with_day(day, config)
}

/// Fit an already loaded day file.
pub fn run_fit_with_day(day: DayFile, config: &FitConfig) -> Result<RunOutput, AppError> {
    let fitter = BiMaxFitter::new(config.clone())?;
    let table = fitter.fit_all(&day)?;
    Ok(RunOutput { day, table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticOptions, pas_sample, span_sample};
    use crate::domain::{AngleUnit, BiMaxParams, DistributionConfig, Species};
    use crate::io::day_file::TimedSample;
    use crate::io::source::FieldSeries;
    use crate::math::vector::FieldVector;
    use crate::vdf::geometry::Instrument;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 29)
            .unwrap()
            .and_hms_opt(12, min, 0)
            .unwrap()
    }

    fn day(instrument: Instrument) -> DayFile {
        let b = [3.0, -1.0, 2.0];
        let field = FieldVector::new(b).unwrap();
        let config = DistributionConfig::default();
        let options = SyntheticOptions {
            noise: 0.01,
            seed: 42,
            ..SyntheticOptions::default()
        };

        let samples = (0..3)
            .map(|i| {
                let params = BiMaxParams::from_array([
                    5e-10,
                    -300.0 - 20.0 * i as f64,
                    15.0,
                    -5.0,
                    35.0,
                    50.0,
                ]);
                let raw = match instrument {
                    Instrument::Span => span_sample(&params, &field, Species::Proton, &config, &options),
                    Instrument::Pas => pas_sample(&params, &field, Species::Proton, &config, &options),
                }
                .unwrap();
                TimedSample { time: at(2 - i), raw }
            })
            .collect();

        DayFile {
            instrument,
            geometry: None,
            species: Species::Proton,
            angle_unit: AngleUnit::Degrees,
            config,
            samples,
            field: FieldSeries::new(vec![at(0), at(5)], vec![b, b]).unwrap(),
        }
    }

    #[test]
    fn fits_a_day_file_from_disk() {
        let path = std::env::temp_dir().join(format!("vdf-fit-{}-pipeline.json", std::process::id()));
        day(Instrument::Span).write_json(&path).unwrap();
        let out = run_fit(&path, &FitConfig::default());
        let _ = std::fs::remove_file(&path);
        let out = out.unwrap();

        let table = &out.table;
        assert_eq!(table.len(), 3);
        assert_eq!(table.time, vec![at(0), at(1), at(2)]);
        assert_eq!(table.n_success(), 3);
        // Samples were written latest-first; the fastest wind is at t=0.
        let expected_vx = [-340.0, -320.0, -300.0];
        for (row, vx) in expected_vx.iter().enumerate() {
            assert!((table.vx[row] - vx).abs() < 5.0, "row {row}: vx {}", table.vx[row]);
            assert!(table.n[row] > 0.0);
            assert!(table.t_par[row] > table.t_perp[row], "row {row}");
        }
    }

    #[test]
    fn pas_grid_samples_fit_too() {
        let out = run_fit_with_day(day(Instrument::Pas), &FitConfig::default()).unwrap();
        assert_eq!(out.table.n_success(), 3);
        assert!(out.table.quality_flag.iter().all(|&q| q == 1));
    }

    #[test]
    fn invalid_config_is_rejected_before_fitting() {
        let config = FitConfig {
            max_evaluations: 0,
            ..FitConfig::default()
        };
        let err = run_fit_with_day(day(Instrument::Span), &config).unwrap_err();
        assert_eq!(err.code(), crate::error::CODE_INVALID_INPUT);
    }
}
