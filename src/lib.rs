//! `vdf-fit` library crate.
//!
//! Bi-Maxwellian fits of ion velocity distribution functions measured by
//! spacecraft particle instruments:
//!
//! - raw instrument arrays become a [`vdf::Distribution`] (velocities, VDF,
//!   noise mask, quality flag)
//! - each distribution is fitted in the magnetic-field-aligned frame
//!   ([`fit::BiMaxFitter`])
//! - a whole day of samples is fitted in parallel into an [`fit::OutputTable`]

pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod pipeline;
pub mod units;
pub mod vdf;
