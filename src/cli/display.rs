//! Terminal rendering of live feedback
//!
//! Features:
//! - Session header (user, exercise, window)
//! - Colour-coded notices: errors in red, encouragement in green
//! - Optional per-event trace (scores, repetition timings, quality grades)
//! - End-of-session summary

use crate::error::Result;
use crate::exercise::{Event, ExerciseKind, QualityLabel, RepetitionTiming};
use crate::session::{ErrorKind, FeedbackSink, Notice, SessionOutcome, SessionReport};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{stdout, Stdout, Write};

fn quality_color(label: QualityLabel) -> Color {
    match label {
        QualityLabel::Bad => Color::Red,
        QualityLabel::Trying => Color::Yellow,
        QualityLabel::Nice => Color::Cyan,
        QualityLabel::VeryGood => Color::Green,
    }
}

fn error_color(kind: ErrorKind) -> Color {
    match kind {
        ErrorKind::HandPosition | ErrorKind::WholeHandMovement | ErrorKind::NoHands => {
            Color::Red
        }
        ErrorKind::InsufficientLight => Color::Yellow,
        ErrorKind::PostponedExercise | ErrorKind::StreamFailure => Color::Magenta,
    }
}

/// Line-oriented feedback display
pub struct Display<W: Write> {
    out: W,
    /// Also print every event, not only the notices
    show_events: bool,
}

impl Display<Stdout> {
    /// Display writing to standard output
    pub fn stdout() -> Self {
        Display::new(stdout())
    }
}

impl<W: Write> Display<W> {
    /// Display writing to any sink, notices only
    pub fn new(out: W) -> Self {
        Display {
            out,
            show_events: false,
        }
    }

    /// Also print every event
    pub fn with_events(mut self, show_events: bool) -> Self {
        self.show_events = show_events;
        self
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the session header
    pub fn show_header(&mut self, user: &str, exercise: Option<ExerciseKind>, window_secs: f64) -> Result<()> {
        let exercise = exercise.map_or_else(|| "from rotation".to_string(), |e| e.to_string());
        queue!(
            self.out,
            SetForegroundColor(Color::Blue),
            Print("─".repeat(50)),
            Print("\n"),
            ResetColor,
            Print(format!(
                "User: {}  |  Exercise: {}  |  Window: {:.0}s\n",
                user, exercise, window_secs
            )),
            SetForegroundColor(Color::Blue),
            Print("─".repeat(50)),
            Print("\n"),
            ResetColor,
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Print a live comment
    pub fn show_notice(&mut self, notice: &Notice) -> Result<()> {
        if let Some(error) = &notice.error {
            queue!(
                self.out,
                SetForegroundColor(error_color(error.kind)),
                Print(format!("⚠ {}: ", error.kind)),
                ResetColor,
                Print(&error.message),
                Print("\n"),
            )?;
        }
        if let Some(message) = &notice.message {
            queue!(
                self.out,
                SetForegroundColor(Color::Green),
                Print("▶ "),
                ResetColor,
                Print(message),
                Print("\n"),
            )?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Print a single event
    pub fn show_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Quality(label) => queue!(
                self.out,
                Print("  quality: "),
                SetForegroundColor(quality_color(*label)),
                Print(label),
                ResetColor,
                Print("\n"),
            )?,
            Event::Score(score) => queue!(
                self.out,
                Print("  score: "),
                SetForegroundColor(if *score >= 75.0 {
                    Color::Green
                } else if *score >= 50.0 {
                    Color::Yellow
                } else {
                    Color::Red
                }),
                Print(format!("{:.1}%", score)),
                ResetColor,
                Print("\n"),
            )?,
            Event::Repetition(RepetitionTiming::Seconds(secs)) => {
                queue!(self.out, Print(format!("  repetition: {:.3}s\n", secs)))?
            }
            Event::Repetition(RepetitionTiming::TooFast) => queue!(
                self.out,
                Print("  repetition: "),
                SetForegroundColor(Color::Yellow),
                Print("too fast"),
                ResetColor,
                Print("\n"),
            )?,
            Event::PositionError | Event::WholeHandMovementError => queue!(
                self.out,
                SetForegroundColor(Color::DarkGrey),
                Print(format!("  {}\n", event)),
                ResetColor,
            )?,
        }
        self.out.flush()?;
        Ok(())
    }

    /// Print the end-of-session summary
    pub fn show_summary(&mut self, report: &SessionReport) -> Result<()> {
        let outcome_color = match report.outcome {
            SessionOutcome::Completed => Color::Green,
            SessionOutcome::Postponed => Color::Yellow,
            SessionOutcome::StreamFailure(_) | SessionOutcome::Interrupted => Color::Red,
        };
        let results = &report.results;
        let summary = results.summary();

        queue!(
            self.out,
            SetForegroundColor(Color::Blue),
            Print("─".repeat(50)),
            Print("\n"),
            ResetColor,
            Print(format!("{} for {}: ", report.exercise, report.user)),
            SetForegroundColor(outcome_color),
            Print(&report.outcome),
            ResetColor,
            Print(format!(
                "\nScore: {:.0}  |  Avg time: {}  |  Repetitions: {} ({} too fast)\n",
                summary.score,
                summary
                    .time
                    .map_or_else(|| "-".to_string(), |t| format!("{:.3}s", t)),
                results.repetitions(),
                results.too_fast
            )),
            Print(format!(
                "Position errors: {}  |  Whole hand movements: {}  |  Lighting warnings: {}\n",
                results.position_errors, results.drift_errors, report.lighting_warnings
            )),
            Print(format!(
                "Frames: {}  |  Elapsed: {:.1}s\n",
                report.frames,
                report.elapsed.as_secs_f64()
            )),
        )?;
        if !report.advisories.is_empty() {
            let mut advisories: Vec<_> = report.advisories.iter().collect();
            advisories.sort_by_key(|(kind, _)| kind.as_str());
            let listed: Vec<String> = advisories
                .iter()
                .map(|(kind, count)| format!("{} ×{}", kind, count))
                .collect();
            queue!(
                self.out,
                Print(format!("Advisories: {}\n", listed.join(", ")))
            )?;
        }
        if let Some(best) = results.best_quality() {
            queue!(
                self.out,
                Print("Best quality: "),
                SetForegroundColor(quality_color(best)),
                Print(best),
                ResetColor,
                Print("\n"),
            )?;
        }
        if let Some(next) = report.next_session {
            queue!(
                self.out,
                Print(format!("Next session: {}\n", next.format("%Y-%m-%d %H:%M UTC")))
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> FeedbackSink for Display<W> {
    fn publish(&mut self, notice: &Notice) -> Result<()> {
        self.show_notice(notice)
    }

    fn on_event(&mut self, event: &Event) -> Result<()> {
        if self.show_events {
            self.show_event(event)?;
        }
        Ok(())
    }
}
