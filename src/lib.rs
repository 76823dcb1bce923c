//! # Wrist Rehab Coach
//!
//! Turns a stream of hand-skeleton landmarks into live feedback for wrist
//! rehabilitation exercises: posture errors, per-repetition quality grades,
//! reach scores and repetition durations.
//!
//! ## Modules
//!
//! - [`tracking`]: landmark frames and the pixel-to-centimetre distance calibrator
//! - [`exercise`]: the repetition state machines (side-to-side, up-and-down)
//! - [`session`]: the session driver, frame sources, feedback and persistence
//! - [`cli`]: terminal rendering of live feedback
//!
//! ## Data flow
//!
//! ```text
//! FrameSource ──▶ HandObservation ──▶ RepetitionMachine ──▶ Event
//!                                                          │
//!                      SessionStore / FeedbackSink ◀── SessionDriver
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use wrist_rehab_coach::exercise::{machine_for, ExerciseKind};
//! use wrist_rehab_coach::tracking::{DistanceCalibrator, HandObservation};
//!
//! let calibrator = DistanceCalibrator::fit_default().expect("built-in table fits");
//! let mut machine = machine_for(ExerciseKind::SideToSide);
//! # let hand: HandObservation = unimplemented!();
//! let distance = calibrator.hand_distance_cm(&hand);
//! if let Some(event) = machine.process(&hand, distance, Duration::from_millis(33)) {
//!     println!("{:?}", event);
//! }
//! ```

pub mod cli;
pub mod error;
pub mod exercise;
pub mod numeric;
pub mod session;
pub mod tracking;

pub use error::{Error, Result};
pub use exercise::{machine_for, Event, ExerciseKind, QualityLabel, RepetitionMachine, RepetitionTiming};
pub use tracking::{DistanceCalibrator, Handedness, HandObservation, Point};
