//! One-shot tick scheduling seam.
//!
//! The host's timer primitive has no cancel. Every armed callback carries
//! the generation it was armed with; the engine bumps its generation on
//! stop and on transport restarts, so a stale callback reaching
//! `on_tick(generation)` is discarded instead of double-driving the loop.

use kino_common::{frame_duration_us, Rational};
use std::time::Duration;

use crate::state::ShuttleSpeed;

/// Arms a one-shot timer. After `after` elapses the host must call
/// `PlaybackEngine::on_tick(generation)` exactly once.
pub trait TickScheduler {
    fn arm(&mut self, after: Duration, generation: u64);
}

/// Tick interval for a rate and shuttle speed.
///
/// Slow motion stretches the interval (half speed ticks every two frame
/// durations) instead of stepping fractional frames; fast shuttle keeps
/// the frame-duration interval and steps multiple frames per tick. The
/// floor caps the refresh near 60 Hz for high-rate content.
pub fn tick_interval(rate: Rational, speed: ShuttleSpeed, floor_ms: u64) -> Duration {
    let frame_us = frame_duration_us(rate) * speed.slowdown_factor();
    let floor_us = (floor_ms * 1000) as i64;
    Duration::from_micros(frame_us.max(floor_us) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_speed_uses_frame_duration() {
        let d = tick_interval(Rational::FPS_24, ShuttleSpeed::X1, 16);
        assert_eq!(d, Duration::from_micros(41_666));
    }

    #[test]
    fn half_speed_doubles_interval() {
        let d = tick_interval(Rational::FPS_24, ShuttleSpeed::Half, 16);
        assert_eq!(d, Duration::from_micros(83_332));
    }

    #[test]
    fn fast_shuttle_keeps_frame_interval() {
        // 8x advances 8 frames per tick; the tick rate itself is unchanged
        let d = tick_interval(Rational::FPS_24, ShuttleSpeed::X8, 16);
        assert_eq!(d, Duration::from_micros(41_666));
    }

    #[test]
    fn floor_caps_refresh_rate() {
        // 60 fps frame duration is 16666us, just over the 16ms floor
        let d = tick_interval(Rational::FPS_60, ShuttleSpeed::X1, 16);
        assert_eq!(d, Duration::from_micros(16_666));

        // A hypothetical 120 fps source still ticks at the floor
        let d = tick_interval(Rational::new(120, 1), ShuttleSpeed::X1, 16);
        assert_eq!(d, Duration::from_micros(16_000));
    }
}
