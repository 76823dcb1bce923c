//! Hand tracking inputs: landmark frames and distance calibration
//!
//! # Components
//! - `landmarks.rs`: 21-point hand observations produced by the external detector
//! - `calibration.rs`: pixel-to-centimetre hand distance curve

pub mod calibration;
pub mod landmarks;

pub use calibration::{CalibrationTable, Coefficients, DistanceCalibrator};
pub use landmarks::{BoundingBox, HandObservation, Handedness, Point, RawHand};
