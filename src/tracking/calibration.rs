//! Distance calibrator: pixel span of the hand → centimetres from the camera
//!
//! The apparent size of a hand shrinks as it moves away from the camera.
//! A quadratic curve fitted once to a fixed table converts the pixel
//! distance between two knuckles into an approximate real-world distance,
//! which the side-to-side exercise uses to pick its movement thresholds.
//!
//! Handles:
//! - Least-squares fit of `cm = A·px² + B·px + C`
//! - Loading fitted coefficients from JSON (or fitting the built-in table)
//! - Saving coefficients for the `calibrate` binary

use crate::error::{Error, Result};
use crate::numeric::round_to;
use crate::tracking::landmarks::{HandObservation, Point, INDEX_MCP, PINKY_MCP};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Knuckle span in pixels, measured at 5 cm steps from 20 to 100 cm
const DEFAULT_PIXELS: [f64; 17] = [
    300.0, 245.0, 200.0, 170.0, 145.0, 130.0, 112.0, 103.0, 93.0, 87.0, 80.0, 75.0, 70.0, 67.0,
    62.0, 59.0, 57.0,
];

const DEFAULT_CENTIMETERS: [f64; 17] = [
    20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0, 90.0,
    95.0, 100.0,
];

/// Paired measurements the curve is fitted to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    pub pixels: Vec<f64>,
    pub centimeters: Vec<f64>,
}

impl Default for CalibrationTable {
    fn default() -> Self {
        CalibrationTable {
            pixels: DEFAULT_PIXELS.to_vec(),
            centimeters: DEFAULT_CENTIMETERS.to_vec(),
        }
    }
}

impl CalibrationTable {
    /// Load a table from a JSON file: `{"pixels": [...], "centimeters": [...]}`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let table: CalibrationTable = serde_json::from_str(&content)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.pixels.len() != self.centimeters.len() {
            return Err(Error::Calibration(format!(
                "table has {} pixel values but {} centimetre values",
                self.pixels.len(),
                self.centimeters.len()
            )));
        }
        if self.pixels.len() < 3 {
            return Err(Error::Calibration(
                "a quadratic fit needs at least 3 points".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of measurement pairs
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Quadratic curve coefficients, highest power first
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Coefficients {
    /// Evaluate the curve without rounding
    pub fn evaluate(&self, pixels: f64) -> f64 {
        self.a * pixels * pixels + self.b * pixels + self.c
    }
}

/// Converts knuckle pixel distance into an estimated hand-to-camera distance
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceCalibrator {
    coefficients: Coefficients,
}

impl DistanceCalibrator {
    /// Calibrator with known coefficients
    pub fn new(coefficients: Coefficients) -> Self {
        DistanceCalibrator { coefficients }
    }

    /// Fit a quadratic to the table by least squares
    pub fn fit(table: &CalibrationTable) -> Result<Self> {
        table.validate()?;

        let n = table.len();
        let design = DMatrix::from_fn(n, 3, |row, col| table.pixels[row].powi(2 - col as i32));
        let target = DVector::from_column_slice(&table.centimeters);

        let solution = design
            .svd(true, true)
            .solve(&target, 1e-12)
            .map_err(|e| Error::Calibration(e.to_string()))?;

        let coefficients = Coefficients {
            a: solution[0],
            b: solution[1],
            c: solution[2],
        };
        if !(coefficients.a.is_finite() && coefficients.b.is_finite() && coefficients.c.is_finite()) {
            return Err(Error::Calibration("fit produced non-finite coefficients".to_string()));
        }

        debug!(
            "Fitted calibration curve over {} points: a={:.6} b={:.6} c={:.6}",
            n, coefficients.a, coefficients.b, coefficients.c
        );
        Ok(DistanceCalibrator { coefficients })
    }

    /// Fit the built-in 17-point table
    pub fn fit_default() -> Result<Self> {
        Self::fit(&CalibrationTable::default())
    }

    /// Load coefficients from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let coefficients: Coefficients = serde_json::from_str(&content)?;
        Ok(DistanceCalibrator { coefficients })
    }

    /// Load coefficients if a file is given and readable, otherwise fit the built-in table
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            match Self::load(path) {
                Ok(calibrator) => return Ok(calibrator),
                Err(e) => warn!(
                    "Could not load calibration from {}: {} (fitting built-in table)",
                    path.display(),
                    e
                ),
            }
        }
        Self::fit_default()
    }

    /// Save coefficients as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(&self.coefficients)?)?;
        Ok(())
    }

    /// Fitted curve coefficients
    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    /// Estimated distance in cm for a pixel span, rounded to 2 decimals
    pub fn estimate_from_pixels(&self, pixels: f64) -> f64 {
        round_to(self.coefficients.evaluate(pixels), 2)
    }

    /// Estimated distance in cm from the pixel distance between two landmarks
    pub fn estimate_distance_cm(&self, p1: Point, p2: Point) -> f64 {
        self.estimate_from_pixels(p1.distance(&p2))
    }

    /// Hand-to-camera distance measured across the index and pinky knuckles
    pub fn hand_distance_cm(&self, hand: &HandObservation) -> f64 {
        self.estimate_distance_cm(hand.point(INDEX_MCP), hand.point(PINKY_MCP))
    }

    /// Fit error (estimate − measured) at every table point
    pub fn residuals(&self, table: &CalibrationTable) -> Vec<f64> {
        table
            .pixels
            .iter()
            .zip(table.centimeters.iter())
            .map(|(&px, &cm)| self.coefficients.evaluate(px) - cm)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fit_reproduces_table() {
        let table = CalibrationTable::default();
        let calibrator = DistanceCalibrator::fit(&table).unwrap();

        // The quadratic is a loose fit; worst residual on this table is ~9.3 cm
        for (&px, &cm) in table.pixels.iter().zip(table.centimeters.iter()) {
            let estimate = calibrator.estimate_from_pixels(px);
            assert!((estimate - cm).abs() < 10.0, "{} px: {} vs {}", px, estimate, cm);
        }

        let worst = calibrator
            .residuals(&table)
            .into_iter()
            .fold(0.0f64, |acc, r| acc.max(r.abs()));
        assert!(worst < 10.0);
    }

    #[test]
    fn test_default_coefficients() {
        let c = DistanceCalibrator::fit_default().unwrap().coefficients();
        assert!((c.a - 0.0020198).abs() < 1e-6);
        assert!((c.b + 0.9888456).abs() < 1e-5);
        assert!((c.c - 140.5392).abs() < 1e-3);
    }

    #[test]
    fn test_exact_quadratic_is_recovered() {
        let pixels: Vec<f64> = (1..=6).map(|i| i as f64 * 10.0).collect();
        let centimeters = pixels.iter().map(|x| 0.5 * x * x - 2.0 * x + 7.0).collect();
        let calibrator = DistanceCalibrator::fit(&CalibrationTable { pixels, centimeters }).unwrap();
        let c = calibrator.coefficients();
        assert!((c.a - 0.5).abs() < 1e-9);
        assert!((c.b + 2.0).abs() < 1e-7);
        assert!((c.c - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_estimate_uses_euclidean_distance_and_rounds() {
        let calibrator = DistanceCalibrator::new(Coefficients { a: 0.0, b: 1.0 / 3.0, c: 0.0 });
        // 3-4-5 triangle → 5 px → 1.666.. → 1.67
        let cm = calibrator.estimate_distance_cm(Point::new(0, 0), Point::new(3, 4));
        assert_eq!(cm, 1.67);
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        let short = CalibrationTable {
            pixels: vec![1.0, 2.0],
            centimeters: vec![1.0, 2.0],
        };
        assert!(matches!(DistanceCalibrator::fit(&short), Err(Error::Calibration(_))));

        let mismatched = CalibrationTable {
            pixels: vec![1.0, 2.0, 3.0],
            centimeters: vec![1.0, 2.0],
        };
        assert!(matches!(DistanceCalibrator::fit(&mismatched), Err(Error::Calibration(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");

        let calibrator = DistanceCalibrator::fit_default().unwrap();
        calibrator.save(&path).unwrap();
        let loaded = DistanceCalibrator::load(&path).unwrap();
        assert_eq!(loaded.estimate_from_pixels(120.0), calibrator.estimate_from_pixels(120.0));

        let missing = dir.path().join("missing.json");
        let fallback = DistanceCalibrator::load_or_default(Some(&missing)).unwrap();
        assert_eq!(fallback.estimate_from_pixels(120.0), calibrator.estimate_from_pixels(120.0));
    }
}
