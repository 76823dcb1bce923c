//! Session driver configuration
//!
//! Defaults match a one-minute exercise with short pauses around advisories.
//! A JSON file may override any subset of fields.

use crate::error::{Error, Result};
use crate::exercise::ExerciseKind;
use crate::tracking::Handedness;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of one exercise in seconds
    pub window_secs: f64,
    /// Frames ignored after "Start the exercise."
    pub start_pause_secs: f64,
    /// Frames ignored after a whole-hand-movement advisory
    pub drift_pause_secs: f64,
    /// Frames ignored after "Proceed with exercise."
    pub resume_pause_secs: f64,
    /// Whole-hand-movement errors tolerated before a lighting warning
    pub drift_warning_limit: u32,
    /// Lighting warnings tolerated before the session is postponed
    pub postpone_limit: u32,
    /// Last exercise of the day; finishing it schedules the next session
    pub final_exercise: ExerciseKind,
    /// Swap detector handedness labels (mirrored camera)
    pub mirror: bool,
    /// Hand to track when several are visible; overrides the stored preference
    pub hand: Option<Handedness>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            window_secs: 60.0,
            start_pause_secs: 2.0,
            drift_pause_secs: 5.0,
            resume_pause_secs: 2.0,
            drift_warning_limit: 5,
            postpone_limit: 3,
            final_exercise: ExerciseKind::UpAndDown,
            mirror: false,
            hand: None,
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable; all duration accessors are total afterwards
    pub fn validate(&self) -> Result<()> {
        let window = duration_from_secs("window_secs", self.window_secs)?;
        if window.is_zero() {
            return Err(Error::Config(format!(
                "window_secs must be positive, got {}",
                self.window_secs
            )));
        }
        duration_from_secs("start_pause_secs", self.start_pause_secs)?;
        duration_from_secs("drift_pause_secs", self.drift_pause_secs)?;
        duration_from_secs("resume_pause_secs", self.resume_pause_secs)?;
        Ok(())
    }

    /// Length of one exercise
    pub fn window(&self) -> Duration {
        saturating_duration(self.window_secs)
    }

    /// Pause after "Start the exercise."
    pub fn start_pause(&self) -> Duration {
        saturating_duration(self.start_pause_secs)
    }

    /// Pause after a whole-hand-movement advisory
    pub fn drift_pause(&self) -> Duration {
        saturating_duration(self.drift_pause_secs)
    }

    /// Pause after "Proceed with exercise."
    pub fn resume_pause(&self) -> Duration {
        saturating_duration(self.resume_pause_secs)
    }
}

fn duration_from_secs(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::Config(format!("{} = {} is not a valid duration: {}", name, secs, e)))
}

/// Unvalidated values clamp instead of panicking: negatives and NaN to zero,
/// anything too large to `Duration::MAX`
fn saturating_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
