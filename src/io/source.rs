//! Data-source abstraction and magnetic-field lookup.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::vector::FieldVector;
use crate::vdf::distribution::Distribution;

/// An indexed collection of distributions.
///
/// Implementations must allow concurrent reads; `fit_all` calls `sample` from
/// rayon worker threads.
pub trait SampleSource: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn time(&self, index: usize) -> Result<NaiveDateTime, AppError>;

    /// Build the distribution at `index`, with its field vector attached.
    fn sample(&self, index: usize) -> Result<Distribution, AppError>;
}

/// Time series of magnetic-field vectors, sorted by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSeriesData", into = "FieldSeriesData")]
pub struct FieldSeries {
    times: Vec<NaiveDateTime>,
    vectors: Vec<[f64; 3]>,
}

#[derive(Serialize, Deserialize)]
struct FieldSeriesData {
    time: Vec<NaiveDateTime>,
    b: Vec<[f64; 3]>,
}

impl FieldSeries {
    /// Build a series; samples are sorted by time (stable).
    pub fn new(times: Vec<NaiveDateTime>, vectors: Vec<[f64; 3]>) -> Result<Self, AppError> {
        if times.len() != vectors.len() {
            return Err(AppError::invalid_input(format!(
                "Field series has {} times but {} vectors.",
                times.len(),
                vectors.len()
            )));
        }

        let mut pairs: Vec<(NaiveDateTime, [f64; 3])> = times.into_iter().zip(vectors).collect();
        pairs.sort_by_key(|(t, _)| *t);
        let (times, vectors) = pairs.into_iter().unzip();
        Ok(Self { times, vectors })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Field vector closest in time to `time`; the earlier one wins on ties.
    ///
    /// Fails on an empty series or when the nearest vector is zero or
    /// non-finite.
    pub fn nearest(&self, time: NaiveDateTime) -> Result<FieldVector, AppError> {
        if self.times.is_empty() {
            return Err(AppError::missing_data(format!(
                "No magnetic-field data available for {time}."
            )));
        }

        let after = self.times.partition_point(|t| *t < time);
        let idx = if after == 0 {
            0
        } else if after == self.times.len() {
            after - 1
        } else {
            let before = after - 1;
            if time - self.times[before] <= self.times[after] - time {
                before
            } else {
                after
            }
        };

        FieldVector::new(self.vectors[idx])
            .map_err(|e| AppError::new(e.code(), format!("Field at {}: {}", self.times[idx], e.message())))
    }
}

impl TryFrom<FieldSeriesData> for FieldSeries {
    type Error = AppError;

    fn try_from(value: FieldSeriesData) -> Result<Self, Self::Error> {
        FieldSeries::new(value.time, value.b)
    }
}

impl From<FieldSeries> for FieldSeriesData {
    fn from(value: FieldSeries) -> Self {
        FieldSeriesData {
            time: value.times,
            b: value.vectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CODE_INVALID_INPUT, CODE_MISSING_DATA};
    use chrono::NaiveDate;

    fn at(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, sec)
            .unwrap()
    }

    fn series() -> FieldSeries {
        FieldSeries::new(
            vec![at(20), at(0), at(10)],
            vec![[0.0, 0.0, 3.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn nearest_picks_closest_sample() {
        let s = series();
        assert_eq!(s.nearest(at(3)).unwrap().components(), [1.0, 0.0, 0.0]);
        assert_eq!(s.nearest(at(8)).unwrap().components(), [0.0, 2.0, 0.0]);
        assert_eq!(s.nearest(at(59)).unwrap().components(), [0.0, 0.0, 3.0]);
    }

    #[test]
    fn ties_go_to_the_earlier_sample() {
        assert_eq!(series().nearest(at(5)).unwrap().components(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_series_is_missing_data() {
        let s = FieldSeries::new(Vec::new(), Vec::new()).unwrap();
        assert_eq!(s.nearest(at(0)).unwrap_err().code(), CODE_MISSING_DATA);
    }

    #[test]
    fn zero_field_is_missing_data() {
        let s = FieldSeries::new(vec![at(0)], vec![[0.0; 3]]).unwrap();
        assert_eq!(s.nearest(at(0)).unwrap_err().code(), CODE_MISSING_DATA);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = FieldSeries::new(vec![at(0)], Vec::new()).unwrap_err();
        assert_eq!(err.code(), CODE_INVALID_INPUT);
    }

    #[test]
    fn json_uses_time_and_b_columns() {
        let s = series();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"time\"") && json.contains("\"b\""));
        let back: FieldSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
