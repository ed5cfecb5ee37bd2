//! Core time/position types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::rate::Rational;

/// Canonical engine time unit: microseconds of media time.
pub type TimeUs = i64;

/// Frame number on a frame grid.
///
/// Signed: transport math may briefly produce positions past either content
/// edge (reverse shuttle below zero, unclamped seeks past the end) before
/// boundary handling clamps or latches them.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FrameNumber(pub i64);

impl FrameNumber {
    pub const ZERO: Self = Self(0);

    pub fn new(frame: i64) -> Self {
        Self(frame)
    }

    /// Exact conversion to media microseconds at the given rate.
    pub fn to_us(self, rate: Rational) -> TimeUs {
        crate::time::frame_to_us(self, rate)
    }
}

impl Add<i64> for FrameNumber {
    type Output = Self;
    fn add(self, rhs: i64) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub<i64> for FrameNumber {
    type Output = Self;
    fn sub(self, rhs: i64) -> Self {
        Self(self.0 - rhs)
    }
}

impl Sub for FrameNumber {
    type Output = i64;
    fn sub(self, rhs: Self) -> i64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}
