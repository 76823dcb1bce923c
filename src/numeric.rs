//! Small numeric helpers shared by the calibrator and the scoring buffers

/// Round half away from zero to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Absolute difference of two pixel coordinates, saturating at `i32::MAX`
pub fn pixel_gap(a: i32, b: i32) -> i32 {
    i32::try_from(a.abs_diff(b)).unwrap_or(i32::MAX)
}
