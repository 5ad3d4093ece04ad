//! Distribution-function models.
//!
//! Models are implemented as small, pure functions so that the fitter can stay
//! generic over the least-squares machinery.

pub mod bimax;

pub use bimax::*;
