//! Source-monitor tick: single-clip playback against one frame grid.
//!
//! Pure per-tick function: consumes a read-only snapshot, performs its side
//! effects (frame draw, audio freeze, prefetch hint), and returns a result
//! the coordinator commits. It never touches transport state directly.

use kino_common::{FrameNumber, Rational, TrackId};
use tracing::{debug, trace};

use crate::session::{Advance, AudioSession};
use crate::sink::{FrameMetadata, MediaBuffer, PlaybackCallbacks};
use crate::snapshot::{TickResult, TickSnapshot};
use crate::state::{Boundary, Latch, TransportMode};

/// The loaded source media: a single clip viewed on its own grid.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SourceTarget {
    pub rate: Rational,
    pub total_frames: i64,
}

/// Fetch and present the frame at `frame`. A missing frame with online
/// media is a decode miss: the viewer keeps the last good frame rather
/// than flashing black; offline media shows the gap.
pub(crate) fn display(
    frame: FrameNumber,
    rate: Rational,
    media: &mut dyn MediaBuffer,
    callbacks: &mut PlaybackCallbacks,
) {
    let result = media.get_video_frame(TrackId::video(0), frame);
    match result.frame {
        Some(handle) => {
            let metadata = FrameMetadata {
                timeline_frame: frame,
                clip_id: result.clip_id.clone(),
                media_path: result.media_path.clone(),
                source_frame: result.source_frame,
                rate,
                rotation: result.rotation,
                offline: result.offline,
            };
            (callbacks.on_show_frame)(handle, &metadata);
        }
        None if result.offline => {
            debug!(frame = %frame, path = ?result.media_path, "source media offline");
            (callbacks.on_show_gap)();
        }
        None => {
            trace!(frame = %frame, "frame not decoded yet; keeping last good frame");
        }
    }
}

/// One source-mode tick.
pub(crate) fn tick(
    snapshot: &TickSnapshot,
    session: &mut AudioSession,
    media: &mut dyn MediaBuffer,
    callbacks: &mut PlaybackCallbacks,
) -> TickResult {
    // Latched: stay frozen on the boundary frame, keep the loop alive so a
    // reversing shuttle can resume.
    if snapshot.latch.is_active() {
        return TickResult {
            position: snapshot.position,
            latch: snapshot.latch,
            continue_running: true,
            audio_frame: snapshot.last_audio_frame,
        };
    }

    let Advance { next, reported } = session.advance(snapshot);
    let last = snapshot.bounds.last_frame();

    if snapshot.direction > 0 && next > last {
        return boundary_hit(Boundary::End, last, snapshot, session, media, callbacks, reported);
    }
    if snapshot.direction < 0 && next < FrameNumber::ZERO {
        return boundary_hit(
            Boundary::Start,
            FrameNumber::ZERO,
            snapshot,
            session,
            media,
            callbacks,
            reported,
        );
    }

    display(next, snapshot.rate, media, callbacks);
    media.set_playhead(next, snapshot.direction, snapshot.speed.as_f64());

    TickResult {
        position: next,
        latch: Latch::Unlatched,
        continue_running: true,
        audio_frame: reported,
    }
}

/// Advancing would cross a content edge: clamp and either latch (shuttle)
/// or stop outright (play).
#[allow(clippy::too_many_arguments)]
fn boundary_hit(
    boundary: Boundary,
    clamp: FrameNumber,
    snapshot: &TickSnapshot,
    session: &mut AudioSession,
    media: &mut dyn MediaBuffer,
    callbacks: &mut PlaybackCallbacks,
    reported: Option<FrameNumber>,
) -> TickResult {
    display(clamp, snapshot.rate, media, callbacks);

    match snapshot.mode {
        TransportMode::Shuttle => {
            let freeze_us = match boundary {
                Boundary::Start => 0,
                Boundary::End => snapshot.bounds.max_media_time_us,
            };
            session.freeze(freeze_us);
            debug!(boundary = ?boundary, frame = %clamp, "latched at content boundary");
            TickResult {
                position: clamp,
                latch: Latch::Latched(boundary),
                continue_running: true,
                audio_frame: reported,
            }
        }
        _ => {
            session.stop();
            debug!(boundary = ?boundary, frame = %clamp, "stopped at content boundary");
            TickResult {
                position: clamp,
                latch: Latch::Unlatched,
                continue_running: false,
                audio_frame: reported,
            }
        }
    }
}
