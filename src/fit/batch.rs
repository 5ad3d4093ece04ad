//! Fitting every distribution of a data source.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{FitResult, FitStatus};
use crate::error::AppError;
use crate::fit::fitter::{BiMaxFitter, Fitter};
use crate::fit::table::{FittedSample, OutputTable};
use crate::io::source::SampleSource;

impl BiMaxFitter {
    /// Fit one sample of `source`, honouring `skip_bad_quality`.
    fn fit_index<S: SampleSource + ?Sized>(
        &self,
        source: &S,
        index: usize,
    ) -> Result<FittedSample, AppError> {
        let dist = source.sample(index).inspect_err(|e| {
            warn!(index, error = %e, "failed to load sample");
        })?;

        let result = if self.config().skip_bad_quality && !dist.quality_flag().is_good() {
            FitResult {
                time: dist.time(),
                status: FitStatus::NotAttempted,
                quality_flag: dist.quality_flag(),
                params: None,
            }
        } else {
            self.fit(&dist)
        };

        Ok(FittedSample {
            result,
            mass_kg: dist.mass_kg(),
        })
    }

    /// Fit every sample of `source`, ordered by time.
    ///
    /// Ties in time keep their source order. Per-sample fit failures are
    /// recorded in the result; a sample that cannot be loaded aborts the batch.
    pub fn fit_source<S: SampleSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Vec<FittedSample>, AppError> {
        let n = source.len();
        let mut rows: Vec<(usize, FittedSample)> = if self.config().parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.fit_index(source, i).map(|s| (i, s)))
                .collect::<Result<_, _>>()?
        } else {
            (0..n)
                .map(|i| self.fit_index(source, i).map(|s| (i, s)))
                .collect::<Result<_, _>>()?
        };

        rows.sort_by(|(ia, a), (ib, b)| a.result.time.cmp(&b.result.time).then(ia.cmp(ib)));
        Ok(rows.into_iter().map(|(_, s)| s).collect())
    }

    /// Fit every sample of `source` and assemble the output table.
    pub fn fit_all<S: SampleSource + ?Sized>(&self, source: &S) -> Result<OutputTable, AppError> {
        let samples = self.fit_source(source)?;
        let table = OutputTable::from_samples(&samples);

        let mut by_status = [0usize; 6];
        for s in &samples {
            by_status[s.result.status.code() as usize] += 1;
        }
        info!(
            samples = table.len(),
            success = by_status[1],
            insufficient = by_status[2],
            non_finite_peak = by_status[3],
            failed = by_status[4],
            out_of_bounds = by_status[5],
            skipped = by_status[0],
            "fit batch complete"
        );

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticOptions, span_sample};
    use crate::domain::{AngleUnit, BiMaxParams, DistributionConfig, FitConfig, Species};
    use crate::math::vector::FieldVector;
    use crate::vdf::distribution::{Distribution, RawSample};
    use crate::vdf::geometry::Instrument;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, sec)
            .unwrap()
    }

    /// In-memory source: raw samples with their times and one field vector.
    struct VecSource {
        samples: Vec<(NaiveDateTime, RawSample)>,
        field: [f64; 3],
    }

    impl SampleSource for VecSource {
        fn len(&self) -> usize {
            self.samples.len()
        }

        fn time(&self, index: usize) -> Result<NaiveDateTime, AppError> {
            Ok(self.samples[index].0)
        }

        fn sample(&self, index: usize) -> Result<Distribution, AppError> {
            let (time, raw) = &self.samples[index];
            Distribution::from_raw(
                raw.clone(),
                AngleUnit::Degrees,
                Species::Proton,
                *time,
                FieldVector::new(self.field)?,
                &Instrument::Span.geometry(),
                &DistributionConfig::default(),
            )
        }
    }

    fn truth() -> BiMaxParams {
        BiMaxParams::from_array([1e-10, -350.0, 30.0, 10.0, 40.0, 60.0])
    }

    fn good_sample() -> RawSample {
        span_sample(
            &truth(),
            &FieldVector::new([1.0, -2.0, 3.0]).unwrap(),
            Species::Proton,
            &DistributionConfig::default(),
            &SyntheticOptions::default(),
        )
        .unwrap()
    }

    fn zero_sample() -> RawSample {
        let n = Instrument::Span.geometry().n_samples();
        RawSample::Flux {
            eflux: vec![0.0; n],
            energy: vec![1000.0; n],
            theta: vec![0.0; n],
            phi: vec![0.0; n],
        }
    }

    fn mixed_source() -> VecSource {
        VecSource {
            samples: vec![
                (at(30), good_sample()),
                (at(10), zero_sample()),
                (at(20), good_sample()),
                (at(10), good_sample()),
            ],
            field: [1.0, -2.0, 3.0],
        }
    }

    #[test]
    fn rows_are_sorted_by_time_with_stable_ties() {
        for parallel in [true, false] {
            let fitter = BiMaxFitter::new(FitConfig {
                parallel,
                ..FitConfig::default()
            })
            .unwrap();
            let table = fitter.fit_all(&mixed_source()).unwrap();

            assert_eq!(table.len(), 4);
            assert_eq!(table.time, vec![at(10), at(10), at(20), at(30)]);
            // The two samples at t=10 keep source order: zero flux first.
            assert_eq!(table.fit_status[0], FitStatus::InsufficientData.code());
            assert_eq!(table.quality_flag[0], 3);
            assert!(table.n[0].is_nan());
            assert_eq!(&table.fit_status[1..], &[1, 1, 1]);
        }
    }

    #[test]
    fn synthetic_samples_are_recovered() {
        let fitter = BiMaxFitter::default();
        let table = fitter.fit_all(&mixed_source()).unwrap();
        assert_eq!(table.n_success(), 3);
        let t = truth();
        for row in 1..4 {
            assert!((table.vx[row] - t.vx).abs() < 1.0, "vx row {row}: {}", table.vx[row]);
            assert!((table.vy[row] - t.vy).abs() < 1.0, "vy row {row}: {}", table.vy[row]);
            assert!((table.vz[row] - t.vz).abs() < 1.0, "vz row {row}: {}", table.vz[row]);
            assert!(table.t_par[row] > table.t_perp[row]);
            assert_eq!(table.quality_flag[row], 1);
        }
    }

    #[test]
    fn bad_quality_samples_can_be_skipped() {
        let fitter = BiMaxFitter::new(FitConfig {
            skip_bad_quality: true,
            ..FitConfig::default()
        })
        .unwrap();
        let table = fitter.fit_all(&mixed_source()).unwrap();
        assert_eq!(table.fit_status[0], FitStatus::NotAttempted.code());
        assert_eq!(table.quality_flag[0], 3);
        assert_eq!(table.n_success(), 3);
    }

    #[test]
    fn invalid_field_aborts_the_batch() {
        let source = VecSource {
            samples: vec![(at(0), good_sample())],
            field: [0.0, 0.0, 0.0],
        };
        let err = BiMaxFitter::default().fit_all(&source).unwrap_err();
        assert_eq!(err.code(), crate::error::CODE_MISSING_DATA);
    }

    #[test]
    fn empty_source_gives_empty_table() {
        let source = VecSource {
            samples: Vec::new(),
            field: [0.0, 0.0, 1.0],
        };
        let table = BiMaxFitter::default().fit_all(&source).unwrap();
        assert!(table.is_empty());
    }
}
