//! Tick snapshot/result exchange types and content bounds.
//!
//! Every timer tick the coordinator builds an immutable [`TickSnapshot`],
//! hands it to the active mode's tick function, and commits the returned
//! [`TickResult`]. The mode functions never mutate transport state
//! directly; the pair is the contract that keeps commits in one place.

use kino_common::{frame_to_us, ClipId, FrameNumber, Rational, TimeUs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::state::{Latch, ShuttleSpeed, TransportMode};

/// Extent of the loaded content, derived from its rate. Recomputed on mode
/// entry and on an explicit refresh after the underlying sequence changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBounds {
    /// Number of frames; valid positions are `0..total_frames`.
    pub total_frames: i64,
    /// Media time at the content end, where audio freezes on an end latch.
    pub max_media_time_us: TimeUs,
}

impl ContentBounds {
    pub fn new(total_frames: i64, rate: Rational) -> Self {
        Self {
            total_frames,
            max_media_time_us: frame_to_us(FrameNumber(total_frames), rate),
        }
    }

    /// The last displayable frame (zero for empty content).
    pub fn last_frame(self) -> FrameNumber {
        FrameNumber((self.total_frames - 1).max(0))
    }

    pub fn is_empty(self) -> bool {
        self.total_frames == 0
    }
}

/// Current active media reference: which clip feeds the monitor (video) or
/// one audio track. Replaced when the resolved clip changes, cleared on gap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipBinding {
    pub clip_id: ClipId,
    pub media_path: PathBuf,
    pub source_time_us: TimeUs,
}

/// Read-only view of the coordinator's state at the start of a tick.
#[derive(Clone, Debug)]
pub struct TickSnapshot {
    /// Generation the timer callback was armed with.
    pub generation: u64,
    pub position: FrameNumber,
    pub direction: i32,
    pub speed: ShuttleSpeed,
    pub mode: TransportMode,
    pub latch: Latch,
    pub rate: Rational,
    pub bounds: ContentBounds,
    /// Frame the audio device reported on the previous tick; the
    /// stuckness detector compares this against the current report.
    pub last_audio_frame: Option<FrameNumber>,
}

/// What a tick decided; the coordinator commits it verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct TickResult {
    pub position: FrameNumber,
    pub latch: Latch,
    /// Whether to re-arm the timer for another tick.
    pub continue_running: bool,
    /// Frame the audio device reported this tick, if it was consulted.
    pub audio_frame: Option<FrameNumber>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_media_time() {
        let b = ContentBounds::new(24, Rational::FPS_24);
        assert_eq!(b.max_media_time_us, 1_000_000);
        assert_eq!(b.last_frame(), FrameNumber(23));
        assert!(!b.is_empty());
    }

    #[test]
    fn empty_bounds() {
        let b = ContentBounds::new(0, Rational::FPS_24);
        assert!(b.is_empty());
        assert_eq!(b.last_frame(), FrameNumber::ZERO);
    }

    #[test]
    fn ntsc_bounds_are_exact() {
        let b = ContentBounds::new(30, Rational::FPS_29_97);
        assert_eq!(b.max_media_time_us, 1_001_000);
    }

    #[test]
    fn binding_roundtrip() {
        let b = ClipBinding {
            clip_id: ClipId::new("c1"),
            media_path: PathBuf::from("/media/c1.mov"),
            source_time_us: 41_666,
        };
        let json = serde_json::to_string(&b).unwrap();
        let back: ClipBinding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
