//! Session management: everything around the repetition state machine
//!
//! # Components
//! - `config.rs`: SessionConfig with window, pauses and escalation limits
//! - `source.rs`: FrameSource trait, JSON-lines and in-memory replay sources
//! - `feedback.rs`: Notices, event → notice policy, FeedbackSink trait
//! - `results.rs`: Per-exercise score and duration accumulation
//! - `store.rs`: SessionStore trait, in-memory and JSON file stores
//! - `driver.rs`: SessionDriver running one exercise for one user

pub mod config;
pub mod driver;
pub mod feedback;
pub mod results;
pub mod source;
pub mod store;

pub use config::SessionConfig;
pub use driver::{next_session_time, select_hand, SessionDriver, SessionOutcome, SessionReport};
pub use feedback::{ErrorKind, ErrorNotice, FeedbackPolicy, FeedbackSink, Notice};
pub use results::{ExerciseResult, SessionResults};
pub use source::{Frame, FrameSource, JsonLinesSource, ReplaySource};
pub use store::{DayRecord, JsonFileStore, MemoryStore, SessionStore, UserRecord};
