//! Mathematical utilities: field-aligned rotation, linear solves and
//! Levenberg–Marquardt least squares.

pub mod lm;
pub mod solve;
pub mod vector;

pub use lm::*;
pub use solve::*;
pub use vector::*;
