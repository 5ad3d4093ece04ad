//! Velocity distribution functions.
//!
//! - instrument geometry as configuration data (`geometry`)
//! - quality checks on the VDF peak (`quality`)
//! - the per-timestamp distribution itself (`distribution`)

pub mod distribution;
pub mod geometry;
pub mod quality;

pub use distribution::*;
pub use geometry::*;
pub use quality::*;
