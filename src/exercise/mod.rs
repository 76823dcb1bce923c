//! Exercise state machines: repetition detection, grading and scoring
//!
//! # Components
//! - `events.rs`: Event vocabulary (errors, quality labels, scores, timings)
//! - `tiers.rs`: Displacement → magnitude tier bucketing
//! - `tracker.rs`: Generic bucketed hysteresis tracker
//! - `side_to_side.rs`: Side-to-side exercise (posture + drift gates)
//! - `up_and_down.rs`: Up-and-down exercise (finger-order gate)

pub mod events;
pub mod side_to_side;
pub mod tiers;
pub mod tracker;
pub mod up_and_down;

pub use events::{Event, QualityLabel, RepetitionTiming};
pub use side_to_side::SideToSide;
pub use tiers::{Tier, TierBounds};
pub use tracker::{Direction, RepetitionTracker, TrackerParams};
pub use up_and_down::UpAndDown;

use crate::error::{Error, Result};
use crate::tracking::HandObservation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which exercise a session runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    SideToSide,
    UpAndDown,
}

impl ExerciseKind {
    /// Position in the daily rotation
    pub fn from_index(index: u32) -> Result<Self> {
        match index {
            0 => Ok(ExerciseKind::SideToSide),
            1 => Ok(ExerciseKind::UpAndDown),
            other => Err(Error::UnknownExercise(other)),
        }
    }

    /// Inverse of `from_index`
    pub fn index(self) -> u32 {
        match self {
            ExerciseKind::SideToSide => 0,
            ExerciseKind::UpAndDown => 1,
        }
    }

    /// Key under which results are stored
    pub fn result_key(self) -> &'static str {
        match self {
            ExerciseKind::SideToSide => "wristSideToSide",
            ExerciseKind::UpAndDown => "wristUpAndDown",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseKind::SideToSide => write!(f, "side to side"),
            ExerciseKind::UpAndDown => write!(f, "up and down"),
        }
    }
}

/// Coarse state of a machine, for display and logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No reference position latched yet
    AwaitingReference,
    /// Nothing armed: the hand has not left its origin
    Idle,
    Tracking {
        direction: Direction,
        rep_in_progress: bool,
    },
}

impl Phase {
    pub(crate) fn from_tracker(tracker: &RepetitionTracker) -> Self {
        match tracker.armed_direction() {
            Some(direction) => Phase::Tracking {
                direction,
                rep_in_progress: tracker.rep_in_progress(),
            },
            None => Phase::Idle,
        }
    }
}

/// One exercise session's repetition state machine.
///
/// Processing is synchronous and infallible; every frame yields at most one event.
pub trait RepetitionMachine: Send {
    fn kind(&self) -> ExerciseKind;

    /// Consume one hand observation taken `at` since the session started
    fn process(&mut self, hand: &HandObservation, distance_cm: f64, at: Duration) -> Option<Event>;

    fn phase(&self) -> Phase;

    /// Re-latch the reference position on the next frame, keeping progress
    fn recalibrate(&mut self);

    /// Drop all state, as at the start of a session
    fn reset(&mut self);
}

/// Fresh machine for an exercise
pub fn machine_for(kind: ExerciseKind) -> Box<dyn RepetitionMachine> {
    match kind {
        ExerciseKind::SideToSide => Box::new(SideToSide::new()),
        ExerciseKind::UpAndDown => Box::new(UpAndDown::new()),
    }
}

/// A hand observation with its calibrated distance and timestamp
#[derive(Clone, Debug)]
pub struct TimedHand {
    pub hand: HandObservation,
    pub distance_cm: f64,
    pub at: Duration,
}

/// Lazily run a machine over a sequence of observations, yielding only frames that produce events
pub fn events<'a, I>(
    machine: &'a mut dyn RepetitionMachine,
    frames: I,
) -> impl Iterator<Item = Event> + 'a
where
    I: IntoIterator<Item = TimedHand>,
    I::IntoIter: 'a,
{
    frames
        .into_iter()
        .filter_map(move |frame| machine.process(&frame.hand, frame.distance_cm, frame.at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::landmarks::tests::hand_with;
    use crate::tracking::{Handedness, Point};

    fn sweep(xs: &[i32], wrist_x: i32) -> Vec<TimedHand> {
        xs.iter()
            .enumerate()
            .map(|(i, &x)| TimedHand {
                hand: hand_with(Point::new(wrist_x, 400), Point::new(x, 250), Handedness::Right),
                distance_cm: 70.0,
                at: Duration::from_millis(150 * i as u64),
            })
            .collect()
    }

    fn swings() -> Vec<i32> {
        let mut xs = vec![300];
        for swing in 0..7 {
            let sign = if swing % 2 == 0 { 1 } else { -1 };
            for d in [10, 30, 60, 90, 130, 130, 130, 130, 130, 100] {
                xs.push(300 + sign * d);
            }
        }
        xs
    }

    #[test]
    fn test_rotation_index() {
        assert_eq!(ExerciseKind::from_index(0).unwrap(), ExerciseKind::SideToSide);
        assert_eq!(ExerciseKind::from_index(1).unwrap(), ExerciseKind::UpAndDown);
        assert!(matches!(ExerciseKind::from_index(2), Err(Error::UnknownExercise(2))));
        assert_eq!(ExerciseKind::UpAndDown.index(), 1);
    }

    #[test]
    fn test_machine_for_kind() {
        assert_eq!(machine_for(ExerciseKind::SideToSide).kind(), ExerciseKind::SideToSide);
        assert_eq!(machine_for(ExerciseKind::UpAndDown).kind(), ExerciseKind::UpAndDown);
    }

    #[test]
    fn test_lazy_events_yield_only_outcomes() {
        let mut machine = machine_for(ExerciseKind::SideToSide);
        let events: Vec<Event> = events(machine.as_mut(), sweep(&swings(), 300)).collect();
        assert!(!events.is_empty());
        assert!(events.iter().any(|e| matches!(e, Event::Score(_))));
        assert!(events.iter().any(|e| matches!(e, Event::Quality(_))));
        assert!(!events.iter().any(|e| e.is_error()));
    }

    #[test]
    fn test_interleaved_sessions_match_isolated_runs() {
        let frames_a = sweep(&swings(), 300);
        let frames_b: Vec<TimedHand> = sweep(&swings(), 300)
            .into_iter()
            .enumerate()
            .map(|(i, mut f)| {
                // Second user wobbles their wrist and drifts once
                f.hand.landmarks[0].x += if i == 30 { 40 } else { (i % 3) as i32 };
                f
            })
            .collect();

        let mut isolated_a = machine_for(ExerciseKind::SideToSide);
        let expected_a: Vec<_> = frames_a
            .iter()
            .map(|f| isolated_a.process(&f.hand, f.distance_cm, f.at))
            .collect();
        let mut isolated_b = machine_for(ExerciseKind::SideToSide);
        let expected_b: Vec<_> = frames_b
            .iter()
            .map(|f| isolated_b.process(&f.hand, f.distance_cm, f.at))
            .collect();

        let mut a = machine_for(ExerciseKind::SideToSide);
        let mut b = machine_for(ExerciseKind::SideToSide);
        let mut got_a = Vec::new();
        let mut got_b = Vec::new();
        for (fa, fb) in frames_a.iter().zip(frames_b.iter()) {
            got_a.push(a.process(&fa.hand, fa.distance_cm, fa.at));
            got_b.push(b.process(&fb.hand, fb.distance_cm, fb.at));
        }

        assert_eq!(got_a, expected_a);
        assert_eq!(got_b, expected_b);
        assert!(got_b.contains(&Some(Event::WholeHandMovementError)));
    }

    #[test]
    fn test_phase_transitions() {
        let mut machine = SideToSide::new();
        assert_eq!(machine.phase(), Phase::AwaitingReference);
        machine.step(Point::new(300, 400), Point::new(300, 250), 70.0, Duration::ZERO);
        assert_eq!(machine.phase(), Phase::Idle);
        machine.step(Point::new(300, 400), Point::new(340, 250), 70.0, Duration::from_millis(100));
        assert_eq!(
            machine.phase(),
            Phase::Tracking {
                direction: Direction::Positive,
                rep_in_progress: true
            }
        );
    }
}
