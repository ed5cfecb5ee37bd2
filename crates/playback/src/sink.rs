//! Viewer-side seams: the media buffer that serves decoded frames and the
//! display callbacks the host binds at construction.
//!
//! The engine never touches pixels. It asks the media buffer for an opaque
//! frame handle and forwards it to `on_show_frame`; decode threads, caches,
//! and upload paths all live behind the [`MediaBuffer`] trait.

use kino_common::{ClipId, FrameNumber, Rational, TrackId};
use kino_timeline::Clip;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Opaque reference to a decoded frame owned by the media buffer.
pub trait FrameHandle: fmt::Debug + Send + Sync {}

/// What the media buffer returned for one video lookup.
///
/// `frame == None` with `offline == false` means the decode missed (the
/// viewer keeps the last good frame, no black flash); `offline == true`
/// means the backing file is missing.
#[derive(Clone, Debug)]
pub struct VideoFrameResult {
    pub frame: Option<Arc<dyn FrameHandle>>,
    pub clip_id: Option<ClipId>,
    pub media_path: Option<PathBuf>,
    pub source_frame: FrameNumber,
    pub rotation: i32,
    pub offline: bool,
}

impl VideoFrameResult {
    /// A gap result: nothing to show at this position.
    pub fn gap() -> Self {
        Self {
            frame: None,
            clip_id: None,
            media_path: None,
            source_frame: FrameNumber::ZERO,
            rotation: 0,
            offline: false,
        }
    }
}

/// The frame-buffer/decoder collaborator.
///
/// Fed incrementally: the engine pushes the clip layout window per track as
/// the playhead moves, plus a directional playhead hint so the buffer can
/// pre-decode in the direction of travel.
pub trait MediaBuffer {
    /// Constant-time lookup of the decoded frame for a track position.
    fn get_video_frame(&mut self, track: TrackId, frame: FrameNumber) -> VideoFrameResult;

    /// Replace the clip layout window for one track (active clip + next few).
    fn set_track_clips(&mut self, track: TrackId, clips: Vec<Clip>);

    /// Transport hint for pre-buffer direction and pacing.
    fn set_playhead(&mut self, frame: FrameNumber, direction: i32, speed: f64);
}

/// Everything the viewer needs to present one frame.
#[derive(Clone, Debug)]
pub struct FrameMetadata {
    pub timeline_frame: FrameNumber,
    pub clip_id: Option<ClipId>,
    pub media_path: Option<PathBuf>,
    pub source_frame: FrameNumber,
    pub rate: Rational,
    pub rotation: i32,
    pub offline: bool,
}

/// Display callbacks bound at engine construction. The engine invokes
/// them; the host never calls into the engine from inside one.
pub struct PlaybackCallbacks {
    pub on_show_frame: Box<dyn FnMut(Arc<dyn FrameHandle>, &FrameMetadata)>,
    pub on_show_gap: Box<dyn FnMut()>,
    pub on_set_rotation: Box<dyn FnMut(i32)>,
    pub on_position_changed: Box<dyn FnMut(FrameNumber)>,
}

impl PlaybackCallbacks {
    /// Callbacks that ignore every notification. Useful for headless hosts
    /// that only poll `get_status()`.
    pub fn noop() -> Self {
        Self {
            on_show_frame: Box::new(|_, _| {}),
            on_show_gap: Box::new(|| {}),
            on_set_rotation: Box::new(|_| {}),
            on_position_changed: Box::new(|_| {}),
        }
    }
}

impl fmt::Debug for PlaybackCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCallbacks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_result_is_empty() {
        let r = VideoFrameResult::gap();
        assert!(r.frame.is_none());
        assert!(r.clip_id.is_none());
        assert!(!r.offline);
    }

    #[test]
    fn noop_callbacks_are_callable() {
        let mut cb = PlaybackCallbacks::noop();
        (cb.on_show_gap)();
        (cb.on_set_rotation)(90);
        (cb.on_position_changed)(FrameNumber(5));
    }
}
