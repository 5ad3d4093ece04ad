//! Input/output helpers.
//!
//! - data-source trait + field lookup (`source`)
//! - day-file JSON source (`day_file`)
//! - fitter config JSON (`config`)

pub mod config;
pub mod day_file;
pub mod source;

pub use config::*;
pub use day_file::*;
pub use source::*;
