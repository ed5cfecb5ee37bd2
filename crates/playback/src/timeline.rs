//! Timeline-monitor tick: multi-track playback with per-frame clip
//! re-resolution and dynamic source re-binding.
//!
//! On top of the follow/fallback advancement this layers:
//!
//! - **External-move detection**: the shared playhead cell may have been
//!   moved by another actor (UI click, keyboard jog, undo) since the last
//!   commit; the tick adopts that position instead of overwriting it.
//! - **Clip switching**: whenever the resolved video clip changes, the
//!   media buffer gets a fresh clip window and the viewer a rotation
//!   update; gaps clear the binding.
//! - **Boundary stop**: the timeline monitor never latches; both play and
//!   shuttle stop outright at content edges.

use kino_common::{FrameNumber, PlaybackConfig, SequenceId, TrackId};
use kino_timeline::{resolve_audio_at, resolve_video_at, video_clip_window, Sequence, SharedPlayhead};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::session::{Advance, AudioSession};
use crate::sink::{FrameMetadata, MediaBuffer, PlaybackCallbacks};
use crate::snapshot::{ClipBinding, ContentBounds, TickResult, TickSnapshot};
use crate::state::Latch;

/// The bound sequence monitor: sequence snapshot, shared playhead, and the
/// per-tick clip tracking state.
pub(crate) struct TimelineTarget {
    pub sequence_id: SequenceId,
    pub sequence: Arc<Sequence>,
    pub playhead: SharedPlayhead,
    pub bounds: ContentBounds,
    /// Active video clip feeding the monitor; `None` in a gap.
    pub video_binding: Option<ClipBinding>,
    /// Last rotation pushed to the viewer.
    rotation: i32,
    /// The gap callback fired for the current gap (avoid re-firing each tick).
    gap_visible: bool,
}

impl TimelineTarget {
    pub(crate) fn new(sequence: Arc<Sequence>, playhead: SharedPlayhead) -> Self {
        let bounds = ContentBounds::new(sequence.content_end().0, sequence.rate);
        Self {
            sequence_id: sequence.id.clone(),
            sequence,
            playhead,
            bounds,
            video_binding: None,
            rotation: 0,
            gap_visible: false,
        }
    }

    /// Swap in a fresh sequence snapshot after the model changed, and
    /// recompute the content bounds from it.
    pub(crate) fn refresh(&mut self, sequence: Arc<Sequence>) {
        self.bounds = ContentBounds::new(sequence.content_end().0, sequence.rate);
        self.sequence = sequence;
        self.video_binding = None; // clip layout may have changed under us
        debug!(sequence = %self.sequence_id, total_frames = self.bounds.total_frames,
               "content bounds refreshed");
    }

    /// Resolve and present the frame at `position`, updating the clip
    /// binding and pushing viewer/media-buffer updates on a clip switch.
    pub(crate) fn display(
        &mut self,
        position: FrameNumber,
        config: &PlaybackConfig,
        media: &mut dyn MediaBuffer,
        callbacks: &mut PlaybackCallbacks,
    ) {
        match resolve_video_at(&self.sequence, position) {
            Some(resolved) => {
                let switched = self
                    .video_binding
                    .as_ref()
                    .map_or(true, |b| b.clip_id != resolved.clip_id);

                if switched {
                    let window =
                        video_clip_window(&self.sequence, resolved.track, position, config.clip_window);
                    media.set_track_clips(TrackId::video(resolved.track), window);
                    if resolved.rotation != self.rotation {
                        (callbacks.on_set_rotation)(resolved.rotation);
                        self.rotation = resolved.rotation;
                    }
                    debug!(clip = %resolved.clip_id, track = resolved.track, frame = %position,
                           "video source switched");
                }

                self.video_binding = Some(ClipBinding {
                    clip_id: resolved.clip_id.clone(),
                    media_path: resolved.media_path.clone(),
                    source_time_us: resolved.source_time_us,
                });
                self.gap_visible = false;

                let result = media.get_video_frame(TrackId::video(resolved.track), position);
                match result.frame {
                    Some(handle) => {
                        let metadata = FrameMetadata {
                            timeline_frame: position,
                            clip_id: Some(resolved.clip_id),
                            media_path: Some(resolved.media_path),
                            source_frame: resolved.source_frame,
                            rate: self.sequence.rate,
                            rotation: resolved.rotation,
                            offline: resolved.offline,
                        };
                        (callbacks.on_show_frame)(handle, &metadata);
                    }
                    None if resolved.offline => {
                        debug!(clip = %resolved.clip_id, "clip media offline");
                        (callbacks.on_show_gap)();
                    }
                    None => {
                        trace!(frame = %position, "frame not decoded yet; keeping last good frame");
                    }
                }
            }
            None => {
                // Gap: clear clip tracking so the next real clip triggers a
                // fresh switch notification.
                if self.video_binding.is_some() || !self.gap_visible {
                    (callbacks.on_show_gap)();
                    self.gap_visible = true;
                }
                self.video_binding = None;
            }
        }
    }

    /// Resolve the full audio clip set at `position` and rebind the device
    /// if it changed.
    pub(crate) fn sync_audio(&self, position: FrameNumber, session: &mut AudioSession) {
        let clips = resolve_audio_at(&self.sequence, position);
        session.sync_sources(&clips);
    }
}

/// One timeline-mode tick.
pub(crate) fn tick(
    snapshot: &TickSnapshot,
    target: &mut TimelineTarget,
    config: &PlaybackConfig,
    session: &mut AudioSession,
    media: &mut dyn MediaBuffer,
    callbacks: &mut PlaybackCallbacks,
) -> TickResult {
    // The timeline monitor never latches; a latched snapshot here would be
    // a committed-state bug upstream.
    debug_assert!(!snapshot.latch.is_active());

    // External-move detection: someone moved the playhead outside the tick
    // loop. Adopt their position, re-anchor audio, and force re-resolution
    // rather than overwriting it with ours.
    let external = target.playhead.load();
    let base = if external != snapshot.position {
        debug!(ours = %snapshot.position, external = %external,
               "playhead moved externally; re-anchoring");
        session.anchor(external, snapshot.rate);
        target.video_binding = None;
        external
    } else {
        snapshot.position
    };

    let Advance { next, reported } = session.advance_from(snapshot, base);
    let last = snapshot.bounds.last_frame();

    let crossed_end = snapshot.direction > 0 && next > last;
    let crossed_start = snapshot.direction < 0 && next < FrameNumber::ZERO;
    if crossed_end || crossed_start {
        let clamp = if crossed_end { last } else { FrameNumber::ZERO };
        target.display(clamp, config, media, callbacks);
        session.stop();
        target.playhead.store(clamp);
        debug!(frame = %clamp, "stopped at sequence boundary");
        return TickResult {
            position: clamp,
            latch: Latch::Unlatched,
            continue_running: false,
            audio_frame: reported,
        };
    }

    target.display(next, config, media, callbacks);
    target.sync_audio(next, session);
    media.set_playhead(next, snapshot.direction, snapshot.speed.as_f64());
    target.playhead.store(next);

    TickResult {
        position: next,
        latch: Latch::Unlatched,
        continue_running: true,
        audio_frame: reported,
    }
}
