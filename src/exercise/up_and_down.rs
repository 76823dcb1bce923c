//! Up-and-down wrist exercise
//!
//! With the open palm facing the camera the hand bends at the wrist, so the
//! middle fingertip sweeps sideways relative to the wrist. There is no
//! latched origin; the wrist itself is the origin on every frame.

use crate::exercise::events::Event;
use crate::exercise::tiers::TierBounds;
use crate::exercise::tracker::{Direction, RepetitionTracker, TrackerParams};
use crate::exercise::{ExerciseKind, Phase, RepetitionMachine};
use crate::numeric::pixel_gap;
use crate::tracking::landmarks::{HandObservation, Handedness};
use log::debug;
use std::cmp::Ordering;
use std::time::Duration;

pub const PARAMS: TrackerParams = TrackerParams {
    reversal_slack: 10,
    score_divisor: 200.0,
};

/// Open hand facing the camera: fingertip heights strictly increase thumb → pinky
pub fn is_open_palm(hand: &HandObservation) -> bool {
    hand.fingertips().windows(2).all(|pair| pair[0].y < pair[1].y)
}

#[derive(Clone, Debug)]
pub struct UpAndDown {
    last_change: i32,
    tracker: RepetitionTracker,
}

impl UpAndDown {
    /// Create an idle machine
    pub fn new() -> Self {
        UpAndDown {
            last_change: 0,
            tracker: RepetitionTracker::new(PARAMS),
        }
    }

    /// Process one frame of the whole hand
    pub fn step(&mut self, hand: &HandObservation, at: Duration) -> Option<Event> {
        if !is_open_palm(hand) {
            debug!("Fingertips out of order: {:?}", hand.fingertips());
            return Some(Event::PositionError);
        }

        let wrist = hand.wrist();
        let middle_tip = hand.middle_tip();
        self.last_change = pixel_gap(wrist.x, middle_tip.x);

        // Left and right hands bend the same way on opposite sides of the wrist
        let direction = match middle_tip.x.cmp(&wrist.x) {
            Ordering::Greater => Some(Direction::Positive),
            Ordering::Less => Some(Direction::Negative),
            Ordering::Equal => None,
        }
        .map(|d| match hand.handedness {
            Handedness::Right => d,
            Handedness::Left => d.opposite(),
        });

        self.tracker
            .observe(&TierBounds::up_and_down(), direction, self.last_change, at)
    }

    /// Wrist-to-fingertip offset on the last processed frame
    pub fn last_change(&self) -> i32 {
        self.last_change
    }

    /// Underlying hysteresis tracker
    pub fn tracker(&self) -> &RepetitionTracker {
        &self.tracker
    }
}

impl Default for UpAndDown {
    fn default() -> Self {
        Self::new()
    }
}

impl RepetitionMachine for UpAndDown {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::UpAndDown
    }

    fn process(&mut self, hand: &HandObservation, _distance_cm: f64, at: Duration) -> Option<Event> {
        self.step(hand, at)
    }

    fn phase(&self) -> Phase {
        Phase::from_tracker(&self.tracker)
    }

    fn recalibrate(&mut self) {}

    fn reset(&mut self) {
        self.last_change = 0;
        self.tracker.reset();
    }
}
