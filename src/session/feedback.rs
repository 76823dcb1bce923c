//! Live feedback: what the user is told in response to events
//!
//! Handles:
//! - Mapping events to advisories and encouragement
//! - Suppressing repeats of the error the user was just told about
//! - Counting advisories per kind for the session summary

use crate::error::Result;
use crate::exercise::{Event, QualityLabel};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const START_MESSAGE: &str = "Start the exercise.";
pub const PROCEED_MESSAGE: &str = "Proceed with exercise.";
pub const HANDS_BACK_MESSAGE: &str = "Proceed with the exercise.";
pub const EXERCISE_OVER_MESSAGE: &str = "This exercise is over. Get ready for another exercise.";
pub const DAY_OVER_MESSAGE: &str = "Congratulation for today's exercise, let's meet again tomorrow.";

/// Category of a user-correctable problem
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "Hand position")]
    HandPosition,
    #[serde(rename = "Whole hand movement")]
    WholeHandMovement,
    #[serde(rename = "No hands")]
    NoHands,
    #[serde(rename = "Insufficient light")]
    InsufficientLight,
    #[serde(rename = "Postponed exercise")]
    PostponedExercise,
    #[serde(rename = "Stream failure")]
    StreamFailure,
}

impl ErrorKind {
    /// Error type as stored with live comments
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HandPosition => "Hand position",
            ErrorKind::WholeHandMovement => "Whole hand movement",
            ErrorKind::NoHands => "No hands",
            ErrorKind::InsufficientLight => "Insufficient light",
            ErrorKind::PostponedExercise => "Postponed exercise",
            ErrorKind::StreamFailure => "Stream failure",
        }
    }

    /// Instruction shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::HandPosition => "Please, position your hand as instructed.",
            ErrorKind::WholeHandMovement => {
                "Please try not to move your whole hand. Return your hand to initial position."
            }
            ErrorKind::NoHands => {
                "There is no any hands, Make sure you put the affected hand on the screen."
            }
            ErrorKind::InsufficientLight => {
                "Please make sure you are on a place with sufficient light and then start again, \
                 and trying not to move your whole hand. just move your wrist"
            }
            ErrorKind::PostponedExercise => {
                "The exercise is postponed because of light issues on your area, This can cause \
                 poor exercising and measurement results so let's meet tomorrow."
            }
            ErrorKind::StreamFailure => "Failed to initialize the stream.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

/// One live comment: an optional error plus an optional message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub error: Option<ErrorNotice>,
    pub message: Option<String>,
}

impl Notice {
    /// Notice carrying an error and its standard message
    pub fn error(kind: ErrorKind) -> Self {
        Notice {
            error: Some(ErrorNotice {
                kind,
                message: kind.message().to_string(),
            }),
            message: None,
        }
    }

    /// Notice carrying only a message
    pub fn message(text: impl Into<String>) -> Self {
        Notice {
            error: None,
            message: Some(text.into()),
        }
    }

    /// Error type, if this notice reports one
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => write!(f, "{}: {} ({})", error.kind, error.message, message),
            (Some(error), None) => write!(f, "{}: {}", error.kind, error.message),
            (None, Some(message)) => f.write_str(message),
            (None, None) => Ok(()),
        }
    }
}

/// Encouragement for a quality grade
pub fn encouragement(label: QualityLabel) -> &'static str {
    match label {
        QualityLabel::Bad => "Try your best to push your hand.",
        QualityLabel::Trying => "Good, keep trying hard.",
        QualityLabel::Nice => "Very nice, now push a little bit more.",
        QualityLabel::VeryGood => "You are doing very good.",
    }
}

/// Receives notices and events as they happen (terminal, speech, ...)
pub trait FeedbackSink {
    fn publish(&mut self, notice: &Notice) -> Result<()>;

    fn on_event(&mut self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

impl FeedbackSink for Vec<Notice> {
    fn publish(&mut self, notice: &Notice) -> Result<()> {
        self.push(notice.clone());
        Ok(())
    }
}

/// Decides which events become notices
#[derive(Clone, Debug, Default)]
pub struct FeedbackPolicy {
    /// Last error the user was told about
    last_error: Option<ErrorKind>,
    error_counts: FxHashMap<ErrorKind, u32>,
}

impl FeedbackPolicy {
    /// Create a policy with nothing reported yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Notice for an event, or `None` if the user should not be interrupted.
    /// Scores and timings are recorded silently.
    pub fn notice_for(&mut self, event: &Event) -> Option<Notice> {
        match event {
            Event::PositionError => self.raise(ErrorKind::HandPosition),
            Event::WholeHandMovementError => self.raise(ErrorKind::WholeHandMovement),
            Event::Quality(label) => Some(Notice::message(encouragement(*label))),
            Event::Score(_) | Event::Repetition(_) => None,
        }
    }

    /// Notice for a frame with no hands, once per absence
    pub fn no_hands(&mut self) -> Option<Notice> {
        self.raise(ErrorKind::NoHands)
    }

    /// Notice for hands coming back after an absence
    pub fn hands_returned(&mut self) -> Option<Notice> {
        if self.last_error == Some(ErrorKind::NoHands) {
            self.last_error = None;
            Some(Notice::message(HANDS_BACK_MESSAGE))
        } else {
            None
        }
    }

    /// Record an error that is always shown (lighting, postponement, stream)
    pub fn force(&mut self, kind: ErrorKind) -> Notice {
        *self.error_counts.entry(kind).or_insert(0) += 1;
        Notice::error(kind)
    }

    fn raise(&mut self, kind: ErrorKind) -> Option<Notice> {
        if self.last_error == Some(kind) {
            return None;
        }
        self.last_error = Some(kind);
        Some(self.force(kind))
    }

    /// How many notices of each error kind were shown
    pub fn error_counts(&self) -> &FxHashMap<ErrorKind, u32> {
        &self.error_counts
    }
}
