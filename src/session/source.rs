//! Frame sources: where timestamped landmark frames come from
//!
//! The driver is timestamp-driven: every frame carries its time since the
//! stream began, so a recorded replay and a live feed behave the same.

use crate::error::{Error, Result};
use crate::tracking::{HandObservation, RawHand};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

/// Every hand seen in one video frame
#[derive(Clone, Debug)]
pub struct Frame {
    pub at: Duration,
    pub hands: Vec<HandObservation>,
}

/// Produces frames until the stream ends (`Ok(None)`) or fails (`Err`)
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// One line of a recorded stream: `{"t_ms": 33, "hands": [...]}`
#[derive(Debug, Deserialize)]
struct RawFrame {
    t_ms: u64,
    #[serde(default)]
    hands: Vec<RawHand>,
}

/// Reads newline-delimited JSON frames
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    line: usize,
    mirror: bool,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a recorded stream file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(JsonLinesSource::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Read frames from any buffered reader
    pub fn new(reader: R) -> Self {
        JsonLinesSource {
            reader,
            line: 0,
            mirror: false,
        }
    }

    /// Swap handedness labels on every hand (mirrored camera image)
    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    fn parse(&self, text: &str) -> Result<Frame> {
        let raw: RawFrame = serde_json::from_str(text).map_err(|e| Error::Frame {
            line: self.line,
            reason: e.to_string(),
        })?;

        let hands = raw
            .hands
            .into_iter()
            .map(|hand| {
                HandObservation::try_from(hand)
                    .map(|h| if self.mirror { h.mirrored() } else { h })
                    .map_err(|e| Error::Frame {
                        line: self.line,
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Frame {
            at: Duration::from_millis(raw.t_ms),
            hands,
        })
    }
}

impl<R: BufRead> FrameSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            if self.reader.read_line(&mut buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = buffer.trim();
            if text.is_empty() {
                continue;
            }
            return self.parse(text).map(Some);
        }
    }
}

/// Frames held in memory, mostly for tests and synthetic sessions
#[derive(Clone, Debug, Default)]
pub struct ReplaySource {
    frames: VecDeque<Frame>,
}

impl ReplaySource {
    /// Replay frames in order
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        ReplaySource {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frames not yet handed out
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::Handedness;
    use std::io::Cursor;

    fn hand_json(handedness: &str) -> String {
        let points: Vec<String> = (0..21).map(|i| format!("[{}, {}]", 100 + i, 400 - 10 * i)).collect();
        format!(r#"{{"landmarks": [{}], "handedness": "{}"}}"#, points.join(","), handedness)
    }

    #[test]
    fn test_reads_frames_and_skips_blank_lines() {
        let text = format!(
            "{{\"t_ms\": 0, \"hands\": []}}\n\n{{\"t_ms\": 33, \"hands\": [{}]}}\n{{\"t_ms\": 66}}\n",
            hand_json("Right")
        );
        let mut source = JsonLinesSource::new(Cursor::new(text));

        let first = source.next_frame().unwrap().unwrap();
        assert!(first.hands.is_empty());

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.at, Duration::from_millis(33));
        assert_eq!(second.hands[0].handedness, Handedness::Right);
        assert_eq!(second.hands[0].wrist().x, 100);

        let third = source.next_frame().unwrap().unwrap();
        assert!(third.hands.is_empty());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_mirroring_swaps_labels() {
        let text = format!("{{\"t_ms\": 0, \"hands\": [{}]}}\n", hand_json("Left"));
        let mut source = JsonLinesSource::new(Cursor::new(text)).mirrored(true);
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.hands[0].handedness, Handedness::Right);
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let text = "{\"t_ms\": 0}\n{\"t_ms\": \"soon\"}\n";
        let mut source = JsonLinesSource::new(Cursor::new(text));
        assert!(source.next_frame().unwrap().is_some());
        match source.next_frame() {
            Err(Error::Frame { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected frame error, got {:?}", other),
        }

        let short = "{\"t_ms\": 0, \"hands\": [{\"landmarks\": [[1, 2]], \"handedness\": \"Left\"}]}\n";
        let mut source = JsonLinesSource::new(Cursor::new(short));
        assert!(matches!(source.next_frame(), Err(Error::Frame { line: 1, .. })));
    }

    #[test]
    fn test_replay_source_drains_in_order() {
        let frames = (0..3).map(|i| Frame {
            at: Duration::from_millis(i * 10),
            hands: vec![],
        });
        let mut source = ReplaySource::new(frames);
        assert_eq!(source.remaining(), 3);
        assert_eq!(source.next_frame().unwrap().unwrap().at, Duration::ZERO);
        assert_eq!(source.remaining(), 2);
    }
}
