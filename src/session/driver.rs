//! Session driver: runs one exercise for one user over a frame stream
//!
//! Handles:
//! - Picking the exercise from the user's rotation and the hand to track
//! - Start, drift and resume pauses (timestamp-driven, never blocking)
//! - "No hands" notices and the lighting → postponement escalation
//! - The exercise window, result storage and rotation to the next exercise

use crate::error::Result;
use crate::exercise::{machine_for, Event, ExerciseKind};
use crate::session::config::SessionConfig;
use crate::session::feedback::{
    ErrorKind, FeedbackPolicy, FeedbackSink, Notice, DAY_OVER_MESSAGE, EXERCISE_OVER_MESSAGE,
    PROCEED_MESSAGE, START_MESSAGE,
};
use crate::session::results::{ExerciseResult, SessionResults};
use crate::session::source::FrameSource;
use crate::session::store::SessionStore;
use crate::tracking::{DistanceCalibrator, HandObservation, Handedness};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use log::{debug, info, warn};
use rand::Rng;
use rustc_hash::FxHashMap;
use std::fmt;
use std::time::Duration;

/// How a session ended
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// The window elapsed; the result was stored
    Completed,
    /// Too many lighting warnings; the user's postpone count was raised
    Postponed,
    /// The frame source failed
    StreamFailure(String),
    /// The frame source ended before the window elapsed; nothing stored
    Interrupted,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed => write!(f, "completed"),
            SessionOutcome::Postponed => write!(f, "postponed"),
            SessionOutcome::StreamFailure(reason) => write!(f, "stream failure: {}", reason),
            SessionOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// What happened during a session
#[derive(Clone, Debug)]
pub struct SessionReport {
    pub user: String,
    pub exercise: ExerciseKind,
    pub outcome: SessionOutcome,
    pub results: SessionResults,
    /// Stored summary, only for completed sessions
    pub stored: Option<ExerciseResult>,
    /// Frame time from the first frame to the last
    pub elapsed: Duration,
    pub frames: u64,
    pub lighting_warnings: u32,
    /// Advisories shown, per error kind
    pub advisories: FxHashMap<ErrorKind, u32>,
    /// Scheduled start of the next session, set after the final exercise
    pub next_session: Option<DateTime<Utc>>,
}

/// Frames before `until` are ignored; `then` is posted once it passes
struct Pause {
    until: Duration,
    then: Option<Notice>,
}

/// Drives one exercise session
pub struct SessionDriver {
    config: SessionConfig,
    calibrator: DistanceCalibrator,
    user: String,
    exercise: Option<ExerciseKind>,
    now: Option<DateTime<Utc>>,
}

impl SessionDriver {
    /// Create a driver for one user's session
    pub fn new(config: SessionConfig, calibrator: DistanceCalibrator, user: impl Into<String>) -> Self {
        SessionDriver {
            config,
            calibrator,
            user: user.into(),
            exercise: None,
            now: None,
        }
    }

    /// Run this exercise instead of the one the rotation points at
    pub fn with_exercise(mut self, exercise: Option<ExerciseKind>) -> Self {
        self.exercise = exercise;
        self
    }

    /// Fix the wall clock used for the result date and scheduling
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn post(
        &self,
        notice: &Notice,
        store: &mut dyn SessionStore,
        sink: &mut dyn FeedbackSink,
    ) -> Result<()> {
        info!("[{}] {}", self.user, notice);
        sink.publish(notice)?;
        store.post_live_comment(&self.user, self.today(), notice)
    }

    /// Run the session until the window elapses, the session is postponed,
    /// or the source ends or fails
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        store: &mut dyn SessionStore,
        sink: &mut dyn FeedbackSink,
    ) -> Result<SessionReport> {
        self.config.validate()?;

        let kind = match self.exercise {
            Some(kind) => kind,
            None => ExerciseKind::from_index(store.exercise_index(&self.user)?)?,
        };
        let preferred = match self.config.hand {
            Some(hand) => Some(hand),
            None => store.paralysed_hand(&self.user)?,
        };
        info!(
            "Starting {} for {} (hand: {})",
            kind,
            self.user,
            preferred.map_or_else(|| "any".to_string(), |h| h.to_string())
        );

        let mut policy = FeedbackPolicy::new();
        let mut report = SessionReport {
            user: self.user.clone(),
            exercise: kind,
            outcome: SessionOutcome::Interrupted,
            results: SessionResults::new(),
            stored: None,
            elapsed: Duration::ZERO,
            frames: 0,
            lighting_warnings: 0,
            advisories: FxHashMap::default(),
            next_session: None,
        };
        self.drive(kind, preferred, &mut report, &mut policy, source, store, sink)?;
        report.advisories = policy.error_counts().clone();
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn drive(
        &self,
        kind: ExerciseKind,
        preferred: Option<Handedness>,
        report: &mut SessionReport,
        policy: &mut FeedbackPolicy,
        source: &mut dyn FrameSource,
        store: &mut dyn SessionStore,
        sink: &mut dyn FeedbackSink,
    ) -> Result<()> {
        let mut machine = machine_for(kind);
        let mut started_at: Option<Duration> = None;
        let mut pause: Option<Pause> = None;
        let mut drift_errors = 0u32;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!("Frame stream ended after {:?}", report.elapsed);
                    report.outcome = SessionOutcome::Interrupted;
                    return Ok(());
                }
                Err(e) => {
                    warn!("Frame stream failed: {}", e);
                    let notice = policy.force(ErrorKind::StreamFailure);
                    self.post(&notice, store, sink)?;
                    report.outcome = SessionOutcome::StreamFailure(e.to_string());
                    return Ok(());
                }
            };
            report.frames += 1;

            let start = match started_at {
                Some(start) => start,
                None => {
                    started_at = Some(frame.at);
                    self.post(&Notice::message(START_MESSAGE), store, sink)?;
                    pause = Some(Pause {
                        until: frame.at.saturating_add(self.config.start_pause()),
                        then: None,
                    });
                    frame.at
                }
            };
            report.elapsed = frame.at.saturating_sub(start);

            if report.elapsed >= self.config.window() {
                return self.complete(kind, report, store, sink);
            }

            if let Some(current) = pause.take() {
                if frame.at < current.until {
                    pause = Some(current);
                    continue;
                }
                if let Some(notice) = current.then {
                    self.post(&notice, store, sink)?;
                    pause = Some(Pause {
                        until: frame.at.saturating_add(self.config.resume_pause()),
                        then: None,
                    });
                    continue;
                }
            }

            if frame.hands.is_empty() {
                if let Some(notice) = policy.no_hands() {
                    self.post(&notice, store, sink)?;
                }
                continue;
            }
            if let Some(notice) = policy.hands_returned() {
                // The hand may come back somewhere else; latch a new origin
                machine.recalibrate();
                self.post(&notice, store, sink)?;
            }

            if drift_errors >= self.config.drift_warning_limit {
                if report.lighting_warnings < self.config.postpone_limit {
                    let notice = policy.force(ErrorKind::InsufficientLight);
                    self.post(&notice, store, sink)?;
                    drift_errors = 0;
                    report.lighting_warnings += 1;
                    continue;
                }
                let notice = policy.force(ErrorKind::PostponedExercise);
                self.post(&notice, store, sink)?;
                store.record_postpone(&self.user)?;
                report.outcome = SessionOutcome::Postponed;
                return Ok(());
            }

            let Some(hand) = select_hand(&frame.hands, preferred) else {
                continue;
            };
            let distance_cm = self.calibrator.hand_distance_cm(hand);
            let Some(event) = machine.process(hand, distance_cm, frame.at) else {
                continue;
            };
            debug!(
                "{:?} at {:?}: {} ({:?})",
                kind,
                frame.at,
                event,
                machine.phase()
            );

            sink.on_event(&event)?;
            report.results.record(&event);
            if event == Event::WholeHandMovementError {
                drift_errors += 1;
            }
            if let Some(notice) = policy.notice_for(&event) {
                self.post(&notice, store, sink)?;
                if event == Event::WholeHandMovementError {
                    pause = Some(Pause {
                        until: frame.at.saturating_add(self.config.drift_pause()),
                        then: Some(Notice::message(PROCEED_MESSAGE)),
                    });
                }
            }
        }
    }

    fn complete(
        &self,
        kind: ExerciseKind,
        report: &mut SessionReport,
        store: &mut dyn SessionStore,
        sink: &mut dyn FeedbackSink,
    ) -> Result<()> {
        let last_of_day = kind == self.config.final_exercise;
        let message = if last_of_day {
            DAY_OVER_MESSAGE
        } else {
            EXERCISE_OVER_MESSAGE
        };
        self.post(&Notice::message(message), store, sink)?;

        let next_session = if last_of_day {
            Some(next_session_time(self.now(), &mut rand::thread_rng()))
        } else {
            None
        };
        store.advance_exercise(&self.user, next_session)?;

        let summary = report.results.summary();
        store.record_result(&self.user, self.today(), kind, &summary)?;
        info!(
            "{} finished {}: score {}, time {:?}",
            self.user, kind, summary.score, summary.time
        );

        report.outcome = SessionOutcome::Completed;
        report.stored = Some(summary);
        report.next_session = next_session;
        Ok(())
    }
}

/// The hand matching the preference, or the first one seen
pub fn select_hand(
    hands: &[HandObservation],
    preferred: Option<Handedness>,
) -> Option<&HandObservation> {
    preferred
        .and_then(|wanted| hands.iter().find(|hand| hand.handedness == wanted))
        .or_else(|| hands.first())
}

/// Tomorrow, at a random hour between 12 and 16 UTC
pub fn next_session_time<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
    let tomorrow = now + ChronoDuration::days(1);
    tomorrow.with_hour(rng.gen_range(12..=16)).unwrap_or(tomorrow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::source::{Frame, ReplaySource};
    use crate::session::store::MemoryStore;
    use crate::tracking::landmarks::tests::hand_with;
    use crate::tracking::Point;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap()
    }

    fn driver(config: SessionConfig) -> SessionDriver {
        let calibrator = DistanceCalibrator::fit_default().unwrap();
        SessionDriver::new(config, calibrator, "ana").with_clock(clock())
    }

    fn frame(ms: u64, wrist_x: i32, tip_x: i32) -> Frame {
        Frame {
            at: Duration::from_millis(ms),
            hands: vec![hand_with(
                Point::new(wrist_x, 400),
                Point::new(tip_x, 200),
                Handedness::Right,
            )],
        }
    }

    fn empty(ms: u64) -> Frame {
        Frame {
            at: Duration::from_millis(ms),
            hands: vec![],
        }
    }

    fn no_pauses() -> SessionConfig {
        SessionConfig {
            start_pause_secs: 0.0,
            drift_pause_secs: 0.0,
            resume_pause_secs: 0.0,
            ..SessionConfig::default()
        }
    }

    struct FailingSource {
        frames: ReplaySource,
    }

    impl FrameSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            match self.frames.next_frame()? {
                Some(frame) => Ok(Some(frame)),
                None => Err(Error::Frame {
                    line: 3,
                    reason: "camera unplugged".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_start_pause_ignores_frames() {
        let mut source = ReplaySource::new(vec![
            frame(0, 300, 300),
            frame(1000, 340, 300),
            frame(2000, 300, 300),
            frame(2100, 300, 300),
        ]);
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(SessionConfig::default())
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Interrupted);
        assert_eq!(report.frames, 4);
        assert_eq!(report.results.drift_errors, 0);
        assert_eq!(notices, vec![Notice::message(START_MESSAGE)]);
        assert!(store.day("ana", clock().date_naive()).unwrap().results.is_empty());
    }

    #[test]
    fn test_no_hands_notice_is_posted_once() {
        let mut source = ReplaySource::new(vec![
            frame(0, 300, 300),
            empty(100),
            empty(200),
            empty(300),
            frame(400, 300, 300),
            frame(500, 300, 300),
        ]);
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        driver(no_pauses())
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(notices.len(), 3);
        assert_eq!(notices[1].error_kind(), Some(ErrorKind::NoHands));
        assert_eq!(notices[2].message.as_deref(), Some("Proceed with the exercise."));
        assert_eq!(
            store.day("ana", clock().date_naive()).unwrap().live_comment,
            Some(notices[2].clone())
        );
    }

    #[test]
    fn test_repeated_drift_postpones_the_session() {
        let config = SessionConfig {
            drift_warning_limit: 1,
            postpone_limit: 1,
            ..no_pauses()
        };
        let mut source = ReplaySource::new(vec![
            frame(0, 300, 300),   // reference latched
            frame(100, 340, 300), // drift
            frame(200, 340, 300), // "Proceed with exercise."
            frame(300, 340, 300), // lighting warning
            frame(400, 300, 300), // new reference
            frame(500, 340, 300), // drift again, advisory suppressed
            frame(600, 300, 300), // postponed
            frame(700, 300, 300),
        ]);
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(config)
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Postponed);
        assert_eq!(report.frames, 7);
        assert_eq!(report.lighting_warnings, 1);
        assert_eq!(report.results.drift_errors, 2);
        assert_eq!(source.remaining(), 1);

        let kinds: Vec<_> = notices.iter().map(|n| n.error_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                None,
                Some(ErrorKind::WholeHandMovement),
                None,
                Some(ErrorKind::InsufficientLight),
                Some(ErrorKind::PostponedExercise),
            ]
        );
        assert_eq!(notices[2].message.as_deref(), Some(PROCEED_MESSAGE));
        assert_eq!(store.user("ana").unwrap().postponed, 1);
        assert_eq!(report.advisories[&ErrorKind::WholeHandMovement], 1);
        assert_eq!(report.advisories[&ErrorKind::InsufficientLight], 1);
        assert_eq!(report.advisories[&ErrorKind::PostponedExercise], 1);
    }

    #[test]
    fn test_returning_hand_latches_a_new_origin() {
        let mut source = ReplaySource::new(vec![
            frame(0, 300, 300),
            empty(100),
            frame(200, 340, 340),
            frame(300, 345, 345),
        ]);
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(no_pauses())
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(report.results.drift_errors, 0);
        assert_eq!(report.advisories[&ErrorKind::NoHands], 1);
        assert!(!report.advisories.contains_key(&ErrorKind::WholeHandMovement));
    }

    #[test]
    fn test_drift_pause_holds_back_frames() {
        let config = SessionConfig {
            drift_pause_secs: 5.0,
            resume_pause_secs: 2.0,
            ..no_pauses()
        };
        let mut source = ReplaySource::new(vec![
            frame(0, 300, 300),
            frame(100, 340, 300),  // drift, pause until 5.1 s
            frame(3000, 300, 300), // ignored
            frame(5100, 300, 300), // "Proceed with exercise.", pause until 7.1 s
            frame(6000, 340, 300), // ignored
            frame(7100, 300, 300), // latches a new reference
        ]);
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(config)
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(report.results.drift_errors, 1);
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[2].message.as_deref(), Some(PROCEED_MESSAGE));
        assert_eq!(report.elapsed, Duration::from_millis(7100));
    }

    #[test]
    fn test_window_completes_and_rotates() {
        let mut frames = Vec::new();
        let mut ms = 0;
        while ms <= 61_000 {
            // Swing the middle fingertip 130 px either side every 1.5 s
            let phase = (ms / 150) % 20;
            let offset = match phase {
                0..=4 => 30 * phase as i32,
                5..=9 => 130,
                10..=14 => -30 * (phase as i32 - 10),
                _ => -130,
            };
            frames.push(frame(ms, 300, 300 + offset));
            ms += 150;
        }
        let mut source = ReplaySource::new(frames);
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(no_pauses())
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.exercise, ExerciseKind::SideToSide);
        assert_eq!(report.next_session, None);
        assert_eq!(
            notices.last().unwrap().message.as_deref(),
            Some(EXERCISE_OVER_MESSAGE)
        );

        let stored = report.stored.unwrap();
        assert_eq!(stored, report.results.summary());
        let day = store.day("ana", clock().date_naive()).unwrap();
        assert_eq!(day.results["wristSideToSide"], stored);
        assert_eq!(store.user("ana").unwrap().exercise, Some(1));
    }

    #[test]
    fn test_final_exercise_schedules_tomorrow() {
        let frames: Vec<Frame> = (0..=20).map(|i| frame(i * 3_000, 300, 300)).collect();
        let mut source = ReplaySource::new(frames);
        let mut store = MemoryStore::new();
        store.advance_exercise("ana", None).unwrap();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(SessionConfig::default())
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert_eq!(report.exercise, ExerciseKind::UpAndDown);
        assert_eq!(report.outcome, SessionOutcome::Completed);
        // Fingertips of the test hand are not ordered like an open palm
        let position_notices = notices
            .iter()
            .filter(|n| n.error_kind() == Some(ErrorKind::HandPosition))
            .count();
        assert_eq!(position_notices, 1);
        assert_eq!(notices.last().unwrap().message.as_deref(), Some(DAY_OVER_MESSAGE));

        let record = store.user("ana").unwrap();
        assert_eq!(record.exercise, None);
        let next = record.next_session.unwrap();
        assert_eq!(next.date_naive(), clock().date_naive().succ_opt().unwrap());
        assert!((12..=16).contains(&next.hour()));
        assert_eq!(report.next_session, Some(next));
        assert_eq!(
            store.day("ana", clock().date_naive()).unwrap().results["wristUpAndDown"],
            ExerciseResult {
                score: 0.0,
                time: None
            }
        );
    }

    #[test]
    fn test_stream_failure_is_reported() {
        let mut source = FailingSource {
            frames: ReplaySource::new(vec![frame(0, 300, 300)]),
        };
        let mut store = MemoryStore::new();
        let mut notices: Vec<Notice> = Vec::new();

        let report = driver(SessionConfig::default())
            .run(&mut source, &mut store, &mut notices)
            .unwrap();

        assert!(matches!(report.outcome, SessionOutcome::StreamFailure(_)));
        assert_eq!(
            notices.last().unwrap().error_kind(),
            Some(ErrorKind::StreamFailure)
        );
    }

    #[test]
    fn test_unknown_rotation_index_is_an_error() {
        let mut store = MemoryStore::new();
        store.advance_exercise("ana", None).unwrap();
        store.advance_exercise("ana", None).unwrap();
        let mut source = ReplaySource::new(vec![frame(0, 300, 300)]);
        let mut notices: Vec<Notice> = Vec::new();

        let result = driver(SessionConfig::default()).run(&mut source, &mut store, &mut notices);
        assert!(matches!(result, Err(Error::UnknownExercise(2))));
        assert!(notices.is_empty());
    }

    #[test]
    fn test_select_hand_prefers_configured_side() {
        let left = hand_with(Point::new(100, 400), Point::new(100, 200), Handedness::Left);
        let right = hand_with(Point::new(500, 400), Point::new(500, 200), Handedness::Right);
        let hands = vec![left.clone(), right.clone()];

        assert_eq!(select_hand(&hands, Some(Handedness::Right)), Some(&right));
        assert_eq!(select_hand(&hands, None), Some(&left));
        assert_eq!(select_hand(&hands[..1], Some(Handedness::Right)), Some(&left));
        assert_eq!(select_hand(&[], None), None);
    }

    #[test]
    fn test_next_session_is_tomorrow_afternoon() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let next = next_session_time(clock(), &mut rng);
            assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
            assert!((12..=16).contains(&next.hour()));
            assert_eq!(next.minute(), 30);
        }
    }
}
