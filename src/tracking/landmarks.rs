//! Landmark frames: one detected hand per video frame
//!
//! Coordinates are integer pixels. The detector scales its normalised
//! output by the image size and truncates, so all thresholds downstream
//! are expressed in whole pixels.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// HAND LANDMARK INDICES (MediaPipe hand model)
// ============================================================================

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Number of landmarks per hand
pub const LANDMARK_COUNT: usize = 21;

/// Largest coordinate magnitude accepted from the detector
pub const MAX_COORDINATE: i32 = 1 << 20;

/// Fingertips ordered thumb → pinky
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A pixel-space point, serialized as `[x, y]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a point from pixel coordinates
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// Euclidean distance in pixels
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = (other.x as i64 - self.x as i64) as f64;
        let dy = (other.y as i64 - self.y as i64) as f64;
        dx.hypot(dy)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Which hand the detector believes it is looking at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// The other hand. Used when the camera image is mirrored.
    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => write!(f, "Left"),
            Handedness::Right => write!(f, "Right"),
        }
    }
}

/// Axis-aligned box around all landmarks: origin plus size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Tightest box around a set of points
    pub fn around(points: &[Point]) -> Option<Self> {
        let xmin = points.iter().map(|p| p.x).min()?;
        let xmax = points.iter().map(|p| p.x).max()?;
        let ymin = points.iter().map(|p| p.y).min()?;
        let ymax = points.iter().map(|p| p.y).max()?;

        Some(BoundingBox {
            x: xmin,
            y: ymin,
            width: xmax.saturating_sub(xmin),
            height: ymax.saturating_sub(ymin),
        })
    }

    /// Centre point, halving with integer division
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Hand as it arrives from the detector, before validation
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawHand {
    pub landmarks: Vec<Point>,
    pub handedness: Handedness,
}

/// One validated hand observation for one video frame
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HandObservation {
    pub landmarks: [Point; LANDMARK_COUNT],
    pub bbox: BoundingBox,
    pub center: Point,
    pub handedness: Handedness,
}

impl HandObservation {
    /// Build an observation, deriving the bounding box and its centre
    pub fn new(landmarks: [Point; LANDMARK_COUNT], handedness: Handedness) -> Self {
        // A fixed-size array is never empty, so the box always exists
        let bbox = BoundingBox::around(&landmarks).unwrap_or_default();
        HandObservation {
            landmarks,
            bbox,
            center: bbox.center(),
            handedness,
        }
    }

    /// Landmark by index (see the constants at the top of this module)
    pub fn point(&self, index: usize) -> Point {
        self.landmarks[index]
    }

    /// Landmark 0
    pub fn wrist(&self) -> Point {
        self.landmarks[WRIST]
    }

    /// Landmark 12
    pub fn middle_tip(&self) -> Point {
        self.landmarks[MIDDLE_TIP]
    }

    /// Fingertips ordered thumb → pinky
    pub fn fingertips(&self) -> [Point; 5] {
        FINGERTIPS.map(|i| self.landmarks[i])
    }

    /// Swap the handedness label, for mirrored camera images
    pub fn mirrored(mut self) -> Self {
        self.handedness = self.handedness.opposite();
        self
    }
}

impl TryFrom<RawHand> for HandObservation {
    type Error = Error;

    fn try_from(raw: RawHand) -> Result<Self> {
        let count = raw.landmarks.len();
        let landmarks: [Point; LANDMARK_COUNT] = raw.landmarks.try_into().map_err(|_| {
            Error::Landmarks(format!(
                "expected {} landmarks, got {}",
                LANDMARK_COUNT, count
            ))
        })?;
        if let Some((index, p)) = landmarks
            .iter()
            .enumerate()
            .find(|(_, p)| p.x.abs() > MAX_COORDINATE || p.y.abs() > MAX_COORDINATE)
        {
            return Err(Error::Landmarks(format!(
                "landmark {} at ({}, {}) is outside ±{} px",
                index, p.x, p.y, MAX_COORDINATE
            )));
        }
        Ok(HandObservation::new(landmarks, raw.handedness))
    }
}
