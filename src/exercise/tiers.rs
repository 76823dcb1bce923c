//! Magnitude tiers: bucketing a displacement into four reach levels
//!
//! Each exercise partitions displacement into a dead zone below its floor
//! and four contiguous tiers above it. Boundaries are upper-inclusive.

use serde::{Deserialize, Serialize};

/// Reach level of a movement, lowest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Slight = 0,
    Moderate = 1,
    Wide = 2,
    Full = 3,
}

impl Tier {
    /// Numeric level, 0 for `Slight` up to 3 for `Full`
    pub fn level(self) -> u32 {
        self as u32
    }
}

/// Tier boundaries for one exercise at one threshold setting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierBounds {
    /// Smallest displacement that counts as movement at all
    pub floor: i32,
    pub floor_inclusive: bool,
    /// Upper edge of `Slight`
    pub slight: i32,
    /// Upper edge of `Moderate`
    pub moderate: i32,
    /// Upper edge of `Wide`; anything beyond is `Full`
    pub wide: i32,
}

impl TierBounds {
    /// `[5,20] (20,span-40] (span-40,span] (span,∞)`
    pub fn side_to_side(side_span: i32) -> Self {
        TierBounds {
            floor: 5,
            floor_inclusive: true,
            slight: 20,
            moderate: side_span - 40,
            wide: side_span,
        }
    }

    /// `(6,100] (100,150] (150,200] (200,∞)`
    pub fn up_and_down() -> Self {
        TierBounds {
            floor: 6,
            floor_inclusive: false,
            slight: 100,
            moderate: 150,
            wide: 200,
        }
    }

    /// Tier for a displacement, or `None` inside the dead zone
    pub fn classify(&self, displacement: i32) -> Option<Tier> {
        let below_floor = if self.floor_inclusive {
            displacement < self.floor
        } else {
            displacement <= self.floor
        };

        if below_floor {
            None
        } else if displacement <= self.slight {
            Some(Tier::Slight)
        } else if displacement <= self.moderate {
            Some(Tier::Moderate)
        } else if displacement <= self.wide {
            Some(Tier::Wide)
        } else {
            Some(Tier::Full)
        }
    }
}

/// Side-to-side threshold from the calibrated hand distance.
/// Farther hands look smaller, so they get a smaller on-screen span.
pub fn side_span_for(distance_cm: f64) -> i32 {
    if distance_cm > 100.0 {
        100
    } else if distance_cm <= 50.0 {
        160
    } else {
        120
    }
}
