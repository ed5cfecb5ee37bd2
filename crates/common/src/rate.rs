//! Rational frame rates (e.g. 30000/1001 for 29.97 fps) with canonical snapping.
//!
//! Rates are always carried as an exact numerator/denominator pair. Repeated
//! seek/advance cycles convert between frames and microseconds thousands of
//! times; a bare float rate would walk off true frame boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rational frame rate: fps = num/den.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const FPS_23_976: Self = Self {
        num: 24000,
        den: 1001,
    };
    pub const FPS_24: Self = Self { num: 24, den: 1 };
    pub const FPS_25: Self = Self { num: 25, den: 1 };
    pub const FPS_29_97: Self = Self {
        num: 30000,
        den: 1001,
    };
    pub const FPS_30: Self = Self { num: 30, den: 1 };
    pub const FPS_50: Self = Self { num: 50, den: 1 };
    pub const FPS_59_94: Self = Self {
        num: 60000,
        den: 1001,
    };
    pub const FPS_60: Self = Self { num: 60, den: 1 };

    /// The broadcast rates a nearly-equal measured rate snaps to.
    pub const CANONICAL: [Self; 8] = [
        Self::FPS_23_976,
        Self::FPS_24,
        Self::FPS_25,
        Self::FPS_29_97,
        Self::FPS_30,
        Self::FPS_50,
        Self::FPS_59_94,
        Self::FPS_60,
    ];

    pub fn new(num: u32, den: u32) -> Self {
        assert!(num > 0, "Rational numerator must be > 0");
        assert!(den > 0, "Rational denominator must be > 0");
        Self { num, den }
    }

    /// fps as a float, for display and closeness comparison only, never
    /// for position math.
    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Whether two rates are within 0.2% of each other.
    ///
    /// This tolerance treats 23.976↔24 and 29.97↔30 as "close", which is
    /// what source-viewer grid selection wants.
    pub fn is_close_to(self, other: Rational) -> bool {
        let a = self.as_f64();
        let b = other.as_f64();
        if b == 0.0 {
            return false;
        }
        ((a - b) / b).abs() <= 0.002
    }

    /// Snap to the nearest canonical rate if one is close, else return self.
    pub fn snap_to_canonical(self) -> Self {
        for canonical in Self::CANONICAL {
            if self.is_close_to(canonical) {
                return canonical;
            }
        }
        self
    }

    /// Pick the frame grid for a source viewer: the clip's nominal rate,
    /// unless the sequence rate is close enough to use instead (keeps the
    /// source and timeline monitors on the same grid when they agree).
    pub fn select_grid_rate(nominal: Rational, sequence: Rational) -> Self {
        let snapped = nominal.snap_to_canonical();
        if snapped.is_close_to(sequence) {
            sequence
        } else {
            snapped
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_display() {
        assert_eq!(Rational::FPS_30.to_string(), "30");
        assert_eq!(Rational::FPS_29_97.to_string(), "30000/1001");
    }

    #[test]
    #[should_panic]
    fn zero_denominator_rejected() {
        let _ = Rational::new(24, 0);
    }

    #[test]
    #[should_panic]
    fn zero_numerator_rejected() {
        let _ = Rational::new(0, 1);
    }

    #[test]
    fn close_rates() {
        assert!(Rational::FPS_23_976.is_close_to(Rational::FPS_24));
        assert!(Rational::FPS_29_97.is_close_to(Rational::FPS_30));
        assert!(!Rational::FPS_24.is_close_to(Rational::FPS_25));
        assert!(!Rational::FPS_30.is_close_to(Rational::FPS_60));
    }

    #[test]
    fn snap_to_canonical_near_miss() {
        // A measured 23.98-ish rate snaps to 24000/1001
        let measured = Rational::new(2398, 100);
        assert_eq!(measured.snap_to_canonical(), Rational::FPS_23_976);
    }

    #[test]
    fn snap_leaves_odd_rates_alone() {
        let odd = Rational::new(12, 1);
        assert_eq!(odd.snap_to_canonical(), odd);
    }

    #[test]
    fn grid_rate_prefers_sequence_when_close() {
        // 23.976 clip in a 24 fps sequence displays on the 24 fps grid
        let grid = Rational::select_grid_rate(Rational::FPS_23_976, Rational::FPS_24);
        assert_eq!(grid, Rational::FPS_24);
    }

    #[test]
    fn grid_rate_keeps_nominal_when_far() {
        let grid = Rational::select_grid_rate(Rational::FPS_60, Rational::FPS_24);
        assert_eq!(grid, Rational::FPS_60);
    }

    #[test]
    fn serialize_roundtrip() {
        let json = serde_json::to_string(&Rational::FPS_59_94).unwrap();
        let back: Rational = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rational::FPS_59_94);
    }
}
