//! Exact frame ↔ microsecond conversion.
//!
//! All position math in the engine goes through these helpers. Frame
//! positions are never stored as accumulating floats: every conversion is
//! integer rational arithmetic, so a position seeked and re-derived
//! thousands of times lands on exactly the same microsecond.

use crate::rate::Rational;
use crate::types::{FrameNumber, TimeUs};

/// Media time of a frame: `floor(frame * 1_000_000 * den / num)`.
///
/// Flooring division (`div_euclid`) so the result is well defined for
/// positions past either content edge.
pub fn frame_to_us(frame: FrameNumber, rate: Rational) -> TimeUs {
    let num = rate.num as i128;
    let den = rate.den as i128;
    let t = frame.0 as i128 * 1_000_000 * den;
    t.div_euclid(num) as TimeUs
}

/// Frame containing a media time: `floor(us * num / (1_000_000 * den))`.
///
/// Inverse of [`frame_to_us`]: for every non-negative integer frame `f`,
/// `us_to_frame(frame_to_us(f, r), r) == f`.
pub fn us_to_frame(us: TimeUs, rate: Rational) -> FrameNumber {
    let num = rate.num as i128;
    let den = rate.den as i128;
    let f = (us as i128 * num).div_euclid(1_000_000 * den);
    FrameNumber(f as i64)
}

/// Duration of one frame in microseconds (floored).
pub fn frame_duration_us(rate: Rational) -> i64 {
    (1_000_000i64 * rate.den as i64) / rate.num as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_rate_conversion() {
        let r = Rational::FPS_24;
        assert_eq!(frame_to_us(FrameNumber(0), r), 0);
        assert_eq!(frame_to_us(FrameNumber(24), r), 1_000_000);
        assert_eq!(frame_to_us(FrameNumber(1), r), 41_666);
        assert_eq!(us_to_frame(1_000_000, r), FrameNumber(24));
    }

    #[test]
    fn ntsc_rate_conversion() {
        let r = Rational::FPS_29_97;
        // One second of 29.97 is 30 frames at 1001/30000 s each
        assert_eq!(frame_to_us(FrameNumber(30), r), 1_001_000);
        assert_eq!(us_to_frame(1_001_000, r), FrameNumber(30));
    }

    #[test]
    fn round_trip_all_canonical_rates() {
        for rate in Rational::CANONICAL {
            for f in [0i64, 1, 2, 3, 29, 30, 1000, 86_399, 1_000_000] {
                let frame = FrameNumber(f);
                let us = frame_to_us(frame, rate);
                assert_eq!(
                    us_to_frame(us, rate),
                    frame,
                    "round trip failed for frame {f} at {rate}"
                );
            }
        }
    }

    #[test]
    fn round_trip_dense_ntsc() {
        // The 1001 denominators are where naive float math drifts;
        // sweep a dense run of frames to make sure integer math does not.
        let r = Rational::FPS_59_94;
        for f in 0..10_000 {
            let frame = FrameNumber(f);
            assert_eq!(us_to_frame(frame_to_us(frame, r), r), frame);
        }
    }

    #[test]
    fn negative_positions_floor() {
        let r = Rational::FPS_24;
        // Flooring, not truncation toward zero
        assert_eq!(frame_to_us(FrameNumber(-24), r), -1_000_000);
        assert_eq!(frame_to_us(FrameNumber(-1), r), -41_667);
        assert_eq!(us_to_frame(-1, r), FrameNumber(-1));
    }

    #[test]
    fn mid_frame_times_floor_to_frame() {
        let r = Rational::FPS_24;
        // Anywhere inside frame 1's interval reports frame 1
        assert_eq!(us_to_frame(41_667, r), FrameNumber(1));
        assert_eq!(us_to_frame(60_000, r), FrameNumber(1));
        assert_eq!(us_to_frame(83_332, r), FrameNumber(1));
        assert_eq!(us_to_frame(83_334, r), FrameNumber(2));
    }

    #[test]
    fn frame_durations() {
        assert_eq!(frame_duration_us(Rational::FPS_24), 41_666);
        assert_eq!(frame_duration_us(Rational::FPS_25), 40_000);
        assert_eq!(frame_duration_us(Rational::FPS_29_97), 33_366);
        assert_eq!(frame_duration_us(Rational::FPS_60), 16_666);
    }

    #[test]
    fn no_drift_over_long_conversion_chains() {
        // Re-deriving a position through us and back many times must be
        // a fixed point after the first conversion.
        let r = Rational::FPS_29_97;
        let mut frame = FrameNumber(86_400); // ~48 minutes in
        for _ in 0..10_000 {
            let us = frame_to_us(frame, r);
            frame = us_to_frame(us, r);
        }
        assert_eq!(frame, FrameNumber(86_400));
    }
}
