//! Events emitted by the repetition state machines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete grade of recent repetitions, from averaged magnitude tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLabel {
    Bad,
    Trying,
    Nice,
    VeryGood,
}

impl QualityLabel {
    /// Label table lookup; levels past the top of the table saturate
    pub fn from_level(level: u32) -> Self {
        match level {
            0 => QualityLabel::Bad,
            1 => QualityLabel::Trying,
            2 => QualityLabel::Nice,
            _ => QualityLabel::VeryGood,
        }
    }

    /// Label as shown to the user
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Bad => "bad",
            QualityLabel::Trying => "trying",
            QualityLabel::Nice => "nice",
            QualityLabel::VeryGood => "very good",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duration of one completed half-cycle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionTiming {
    /// Seconds, rounded to 3 decimals
    Seconds(f64),
    /// Half-cycle finished within a second
    TooFast,
}

/// One classified outcome of a frame. At most one per frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Event {
    /// Hand geometry does not match the exercise pose
    PositionError,
    /// The wrist left its reference band; accumulated progress was reset
    WholeHandMovementError,
    Quality(QualityLabel),
    /// Reach as a percentage of the exercise's full-reach reference
    Score(f64),
    Repetition(RepetitionTiming),
}

impl Event {
    /// Position and whole-hand-movement errors are user-correctable advisories
    pub fn is_error(&self) -> bool {
        matches!(self, Event::PositionError | Event::WholeHandMovementError)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PositionError => write!(f, "Hand position"),
            Event::WholeHandMovementError => write!(f, "Whole hand movement"),
            Event::Quality(label) => write!(f, "{}", label),
            Event::Score(score) => write!(f, "score {:.3}%", score),
            Event::Repetition(RepetitionTiming::Seconds(secs)) => write!(f, "repetition {:.3}s", secs),
            Event::Repetition(RepetitionTiming::TooFast) => write!(f, "repetition too fast"),
        }
    }
}
