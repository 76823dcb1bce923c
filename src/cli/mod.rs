//! CLI Interface: terminal rendering of live feedback
//!
//! # Components
//! - `display.rs`: crossterm Display, a FeedbackSink for the terminal

pub mod display;

pub use display::Display;
