//! Bucketed hysteresis tracker shared by both exercises
//!
//! One back-and-forth movement is two half-cycles. While the hand travels in
//! one direction the tracker arms a slot for that direction with the highest
//! tier reached and records the peak displacement. When the hand turns back
//! (displacement drops more than `reversal_slack` below the peak) the
//! half-cycle is timed. When travel starts in the opposite direction the armed
//! tier and peak are moved into the quality and score buffers.
//!
//! Buffers are checked before each new observation:
//! - 5 quality tiers → `QualityLabel` of `sum / (count - 1)`
//! - 3 peak displacements → score of `(sum / count) / score_divisor * 100`

use crate::exercise::events::{Event, QualityLabel, RepetitionTiming};
use crate::exercise::tiers::{Tier, TierBounds};
use crate::numeric::round_to;
use log::debug;
use std::time::Duration;

/// Quality tiers collected before a label is emitted
pub const QUALITY_WINDOW: usize = 5;
/// Peak displacements collected before a score is emitted
pub const SCORE_WINDOW: usize = 3;
/// Half-cycles at or under this are reported as too fast
pub const MIN_TIMED_REPETITION: Duration = Duration::from_secs(1);

/// Sign of the displacement relative to the exercise's origin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// The other direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
        }
    }

    fn slot(self) -> usize {
        match self {
            Direction::Positive => 0,
            Direction::Negative => 1,
        }
    }
}

/// Per-exercise constants for the tracker
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerParams {
    /// Pixels the displacement must fall below its peak to count as a turn-around
    pub reversal_slack: i32,
    /// Displacement treated as 100% reach
    pub score_divisor: f64,
}

#[derive(Clone, Debug)]
pub struct RepetitionTracker {
    params: TrackerParams,
    /// Highest tier reached, keyed by the direction of travel that armed it
    armed: [Option<Tier>; 2],
    /// Largest displacement seen in the current half-cycle
    peak: i32,
    rep_started: Option<Duration>,
    /// Set once the current half-cycle has been timed
    half_cycle_done: bool,
    quality_samples: Vec<Tier>,
    score_samples: Vec<i32>,
}

impl RepetitionTracker {
    /// Create a tracker with empty buffers and nothing armed
    pub fn new(params: TrackerParams) -> Self {
        RepetitionTracker {
            params,
            armed: [None; 2],
            peak: 0,
            rep_started: None,
            half_cycle_done: false,
            quality_samples: Vec::with_capacity(QUALITY_WINDOW),
            score_samples: Vec::with_capacity(SCORE_WINDOW),
        }
    }

    /// Feed one displacement sample.
    ///
    /// `direction` is `None` when the hand sits exactly on its origin; buffers
    /// are still flushed but nothing else changes.
    pub fn observe(
        &mut self,
        bounds: &TierBounds,
        direction: Option<Direction>,
        displacement: i32,
        at: Duration,
    ) -> Option<Event> {
        if let Some(event) = self.flush() {
            return Some(event);
        }

        let direction = direction?;

        if let Some(tier) = self.armed[direction.opposite().slot()].take() {
            debug!(
                "Reversal to {:?}: banking tier {:?}, peak {}",
                direction, tier, self.peak
            );
            self.quality_samples.push(tier);
            self.score_samples.push(self.peak);
            self.peak = 0;
            self.half_cycle_done = false;
        }

        let tier = bounds.classify(displacement)?;

        if self.rep_started.is_none() && !self.half_cycle_done {
            self.rep_started = Some(at);
        }

        let slot = &mut self.armed[direction.slot()];
        *slot = Some(slot.map_or(tier, |armed| armed.max(tier)));

        if displacement >= self.peak {
            self.peak = displacement;
            None
        } else if displacement.saturating_add(self.params.reversal_slack) < self.peak {
            self.complete_half_cycle(at)
        } else {
            None
        }
    }

    /// Emit a quality label or a score if a buffer is full. Quality wins.
    fn flush(&mut self) -> Option<Event> {
        if self.quality_samples.len() >= QUALITY_WINDOW {
            let sum: u32 = self.quality_samples.iter().map(|t| t.level()).sum();
            // Divides by count - 1, not count; kept for compatibility with recorded sessions
            let level = sum / (self.quality_samples.len() as u32 - 1);
            self.quality_samples.clear();
            return Some(Event::Quality(QualityLabel::from_level(level)));
        }

        if self.score_samples.len() >= SCORE_WINDOW {
            let sum: i64 = self.score_samples.iter().map(|&s| s as i64).sum();
            let mean = sum / self.score_samples.len() as i64;
            self.score_samples.clear();
            let score = round_to(mean as f64 / self.params.score_divisor * 100.0, 3);
            return Some(Event::Score(score));
        }

        None
    }

    fn complete_half_cycle(&mut self, at: Duration) -> Option<Event> {
        let started = self.rep_started.take()?;
        self.half_cycle_done = true;

        let elapsed = at.saturating_sub(started);
        let timing = if elapsed > MIN_TIMED_REPETITION {
            RepetitionTiming::Seconds(round_to(elapsed.as_secs_f64(), 3))
        } else {
            RepetitionTiming::TooFast
        };
        debug!("Half-cycle complete after {:?}", elapsed);
        Some(Event::Repetition(timing))
    }

    /// Direction whose slot is currently armed, if any
    pub fn armed_direction(&self) -> Option<Direction> {
        [Direction::Positive, Direction::Negative]
            .into_iter()
            .find(|d| self.armed[d.slot()].is_some())
    }

    /// Whether the current half-cycle is being timed
    pub fn rep_in_progress(&self) -> bool {
        self.rep_started.is_some()
    }

    /// Peak displacement of the current half-cycle
    pub fn peak(&self) -> i32 {
        self.peak
    }

    /// Tiers waiting for the next quality label
    pub fn quality_samples(&self) -> &[Tier] {
        &self.quality_samples
    }

    /// Peaks waiting for the next score
    pub fn score_samples(&self) -> &[i32] {
        &self.score_samples
    }

    /// Drop all progress, including partially filled buffers
    pub fn reset(&mut self) {
        self.armed = [None; 2];
        self.peak = 0;
        self.rep_started = None;
        self.half_cycle_done = false;
        self.quality_samples.clear();
        self.score_samples.clear();
    }

    #[cfg(test)]
    pub(crate) fn seed(&mut self, quality: &[Tier], scores: &[i32]) {
        self.quality_samples = quality.to_vec();
        self.score_samples = scores.to_vec();
    }
}
