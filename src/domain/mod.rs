//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input enums (`Species`, `AngleUnit`)
//! - per-sample outcome codes (`QualityFlag`, `FitStatus`)
//! - fit outputs (`BiMaxParams`, `FitResult`)
//! - configuration structs (`DistributionConfig`, `FitConfig`)

pub mod types;

pub use types::*;
