//! Side-to-side wrist exercise
//!
//! The forearm stays still while the hand swings left and right from the
//! wrist. Movement is the horizontal travel of the middle fingertip from
//! where it was first seen; if the wrist itself wanders the whole hand is
//! moving and the attempt starts over.

use crate::exercise::events::Event;
use crate::exercise::tiers::{side_span_for, TierBounds};
use crate::exercise::tracker::{Direction, RepetitionTracker, TrackerParams};
use crate::exercise::{ExerciseKind, Phase, RepetitionMachine};
use crate::numeric::pixel_gap;
use crate::tracking::landmarks::{HandObservation, Point};
use log::debug;
use std::cmp::Ordering;
use std::time::Duration;

/// Wrist-to-fingertip height at or below which the hand is side-on
const MIN_VERTICAL_SEPARATION: i32 = 15;
/// Allowed wrist wander around its reference
const DRIFT_TOLERANCE: i32 = 20;

pub const PARAMS: TrackerParams = TrackerParams {
    reversal_slack: 5,
    score_divisor: 160.0,
};

/// x-coordinates latched the first time the hand is seen well
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub wrist_x: i32,
    pub middle_tip_x: i32,
}

#[derive(Clone, Debug)]
pub struct SideToSide {
    reference: Option<Reference>,
    side_span: i32,
    last_change: i32,
    tracker: RepetitionTracker,
}

impl SideToSide {
    /// Create a machine waiting for its first reference frame
    pub fn new() -> Self {
        SideToSide {
            reference: None,
            side_span: 120,
            last_change: 0,
            tracker: RepetitionTracker::new(PARAMS),
        }
    }

    /// Process one frame given the wrist, middle fingertip and hand distance
    pub fn step(&mut self, wrist: Point, middle_tip: Point, distance_cm: f64, at: Duration) -> Option<Event> {
        if pixel_gap(middle_tip.y, wrist.y) <= MIN_VERTICAL_SEPARATION {
            debug!("Hand side-on: wrist {:?}, middle tip {:?}", wrist, middle_tip);
            return Some(Event::PositionError);
        }

        self.side_span = side_span_for(distance_cm);

        let reference = *self.reference.get_or_insert(Reference {
            wrist_x: wrist.x,
            middle_tip_x: middle_tip.x,
        });

        if pixel_gap(wrist.x, reference.wrist_x) > DRIFT_TOLERANCE {
            debug!(
                "Wrist drifted from {} to {}; resetting",
                reference.wrist_x, wrist.x
            );
            self.reset();
            return Some(Event::WholeHandMovementError);
        }

        self.last_change = pixel_gap(reference.middle_tip_x, middle_tip.x);

        let direction = match middle_tip.x.cmp(&reference.middle_tip_x) {
            Ordering::Greater => Some(Direction::Positive),
            Ordering::Less => Some(Direction::Negative),
            Ordering::Equal => None,
        };

        self.tracker.observe(
            &TierBounds::side_to_side(self.side_span),
            direction,
            self.last_change,
            at,
        )
    }

    /// Forget the reference so the next well-seen frame latches a new one.
    /// Progress buffers are kept.
    pub fn recalibrate(&mut self) {
        self.reference = None;
    }

    /// Latched reference, if the hand has been seen well since the last reset
    pub fn reference(&self) -> Option<Reference> {
        self.reference
    }

    /// Span selected from the most recent hand distance
    pub fn side_span(&self) -> i32 {
        self.side_span
    }

    /// Fingertip travel from the reference on the last processed frame
    pub fn last_change(&self) -> i32 {
        self.last_change
    }

    /// Underlying hysteresis tracker
    pub fn tracker(&self) -> &RepetitionTracker {
        &self.tracker
    }
}

impl Default for SideToSide {
    fn default() -> Self {
        Self::new()
    }
}

impl RepetitionMachine for SideToSide {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::SideToSide
    }

    fn process(&mut self, hand: &HandObservation, distance_cm: f64, at: Duration) -> Option<Event> {
        self.step(hand.wrist(), hand.middle_tip(), distance_cm, at)
    }

    fn phase(&self) -> Phase {
        if self.reference.is_none() {
            return Phase::AwaitingReference;
        }
        Phase::from_tracker(&self.tracker)
    }

    fn recalibrate(&mut self) {
        SideToSide::recalibrate(self);
    }

    fn reset(&mut self) {
        self.reference = None;
        self.last_change = 0;
        self.tracker.reset();
    }
}
