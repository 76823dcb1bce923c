//! Crate-wide error type
//!
//! The repetition state machines never fail; everything here comes from the
//! boundaries (frame parsing, calibration files, the session store).

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the core state machines
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed frame on line {line}: {reason}")]
    Frame { line: usize, reason: String },

    #[error("Invalid landmarks: {0}")]
    Landmarks(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Unknown exercise requested: {0}")]
    UnknownExercise(u32),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
