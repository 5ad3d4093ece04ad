//! Distribution fitting.
//!
//! Responsibilities:
//!
//! - fit a bi-Maxwellian to a single distribution (`fitter`)
//! - fit every sample of a data source, in parallel (`batch`)
//! - collect results into time-indexed columns (`table`)

pub mod batch;
pub mod fitter;
pub mod table;

pub use fitter::*;
pub use table::*;
