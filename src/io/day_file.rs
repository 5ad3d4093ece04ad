//! Read/write day-file JSON.
//!
//! A day file is the portable, pre-extracted form of one instrument day:
//! - instrument (and optionally an explicit geometry)
//! - species, angle unit and distribution settings
//! - raw per-timestamp samples
//! - the magnetic-field time series used to orient them

use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{AngleUnit, DistributionConfig, Species};
use crate::error::AppError;
use crate::io::source::{FieldSeries, SampleSource};
use crate::vdf::distribution::{Distribution, RawSample};
use crate::vdf::geometry::{Instrument, InstrumentGeometry};

/// Raw arrays for one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSample {
    pub time: NaiveDateTime,
    pub raw: RawSample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFile {
    pub instrument: Instrument,
    /// Overrides the instrument's built-in geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<InstrumentGeometry>,
    pub species: Species,
    #[serde(default)]
    pub angle_unit: AngleUnit,
    #[serde(default)]
    pub config: DistributionConfig,
    pub samples: Vec<TimedSample>,
    pub field: FieldSeries,
}

impl DayFile {
    pub fn geometry(&self) -> InstrumentGeometry {
        self.geometry
            .clone()
            .unwrap_or_else(|| self.instrument.geometry())
    }

    /// Read a day file and check its settings.
    pub fn read_json(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::missing_data(format!("Failed to open day file '{}': {e}", path.display()))
        })?;
        let day: DayFile = serde_json::from_reader(file)
            .map_err(|e| AppError::invalid_input(format!("Invalid day file JSON: {e}")))?;
        day.config.validate()?;
        Ok(day)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), AppError> {
        let file = File::create(path).map_err(|e| {
            AppError::invalid_input(format!("Failed to create day file '{}': {e}", path.display()))
        })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| AppError::invalid_input(format!("Failed to write day file JSON: {e}")))?;
        Ok(())
    }

    fn entry(&self, index: usize) -> Result<&TimedSample, AppError> {
        self.samples.get(index).ok_or_else(|| {
            AppError::missing_data(format!(
                "Sample index {index} out of range (day file has {}).",
                self.samples.len()
            ))
        })
    }
}

impl SampleSource for DayFile {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn time(&self, index: usize) -> Result<NaiveDateTime, AppError> {
        Ok(self.entry(index)?.time)
    }

    fn sample(&self, index: usize) -> Result<Distribution, AppError> {
        let entry = self.entry(index)?;
        let field = self.field.nearest(entry.time)?;
        Distribution::from_raw(
            entry.raw.clone(),
            self.angle_unit,
            self.species,
            entry.time,
            field,
            &self.geometry(),
            &self.config,
        )
    }
}
