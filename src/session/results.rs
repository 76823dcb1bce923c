//! Per-exercise accumulation and the stored summary

use crate::exercise::{Event, QualityLabel, RepetitionTiming};
use crate::numeric::round_to;
use serde::{Deserialize, Serialize};

/// Summary stored once an exercise window completes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseResult {
    /// Floor of the mean score, 0 when no score was produced
    pub score: f64,
    /// Mean timed repetition in seconds, rounded to 3 decimals
    pub time: Option<f64>,
}

/// Running totals for one exercise attempt
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResults {
    pub scores: Vec<f64>,
    pub durations: Vec<f64>,
    pub too_fast: u32,
    pub qualities: Vec<QualityLabel>,
    pub position_errors: u32,
    pub drift_errors: u32,
}

impl SessionResults {
    /// Create empty totals
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one event to the totals
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::PositionError => self.position_errors += 1,
            Event::WholeHandMovementError => self.drift_errors += 1,
            Event::Quality(label) => self.qualities.push(*label),
            Event::Score(score) => self.scores.push(*score),
            Event::Repetition(RepetitionTiming::Seconds(secs)) => self.durations.push(*secs),
            Event::Repetition(RepetitionTiming::TooFast) => self.too_fast += 1,
        }
    }

    /// Floor of the mean score, 0 without scores
    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        (self.scores.iter().sum::<f64>() / self.scores.len() as f64).floor()
    }

    /// Mean timed repetition, rounded to 3 decimals
    pub fn mean_duration(&self) -> Option<f64> {
        if self.durations.is_empty() {
            return None;
        }
        let mean = self.durations.iter().sum::<f64>() / self.durations.len() as f64;
        Some(round_to(mean, 3))
    }

    /// Repetitions counted, timed or not
    pub fn repetitions(&self) -> usize {
        self.durations.len() + self.too_fast as usize
    }

    /// Highest quality label reached
    pub fn best_quality(&self) -> Option<QualityLabel> {
        self.qualities.iter().copied().max()
    }

    /// Result stored when the exercise completes
    pub fn summary(&self) -> ExerciseResult {
        ExerciseResult {
            score: self.mean_score(),
            time: self.mean_duration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let results = SessionResults::new();
        assert_eq!(
            results.summary(),
            ExerciseResult {
                score: 0.0,
                time: None
            }
        );
        assert_eq!(results.repetitions(), 0);
    }

    #[test]
    fn test_summary_floors_score_and_rounds_time() {
        let mut results = SessionResults::new();
        for event in [
            Event::Score(50.0),
            Event::Score(62.5),
            Event::Repetition(RepetitionTiming::Seconds(1.5)),
            Event::Repetition(RepetitionTiming::Seconds(2.0)),
            Event::Repetition(RepetitionTiming::Seconds(1.25)),
            Event::Repetition(RepetitionTiming::TooFast),
            Event::Quality(QualityLabel::Trying),
            Event::Quality(QualityLabel::Nice),
            Event::PositionError,
        ] {
            results.record(&event);
        }

        let summary = results.summary();
        assert_eq!(summary.score, 56.0);
        assert_eq!(summary.time, Some(1.583));
        assert_eq!(results.repetitions(), 4);
        assert_eq!(results.best_quality(), Some(QualityLabel::Nice));
        assert_eq!(results.position_errors, 1);
    }
}
