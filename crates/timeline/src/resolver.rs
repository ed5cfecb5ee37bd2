//! Active-clip resolution at a playhead position.
//!
//! The two resolution rules are deliberately asymmetric:
//!
//! - **Video is exclusive**: exactly one clip can be on the monitor, the
//!   one on the lowest-indexed unmuted track covering the frame (standard
//!   compositing priority).
//! - **Audio is inclusive**: every covering clip on every unmuted audio
//!   track plays; audio tracks mix rather than occlude.
//!
//! All queries are binary searches over sorted clip lists; they run every
//! tick and must stay cheap.

use kino_common::{ClipId, FrameNumber, Rational, TimeUs};
use std::path::PathBuf;

use crate::types::{Clip, Sequence, Track};

/// A clip resolved at a specific playhead frame, with the source mapping
/// already computed on the clip's own frame grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedClip {
    pub clip_id: ClipId,
    /// Index of the track (within its kind) the clip sits on.
    pub track: usize,
    pub media_path: PathBuf,
    /// The clip's native rate.
    pub clip_rate: Rational,
    /// Source frame under the playhead, on the clip's grid.
    pub source_frame: FrameNumber,
    /// Media time under the playhead.
    pub source_time_us: TimeUs,
    /// Clip extent in timeline frames (end exclusive).
    pub clip_start: FrameNumber,
    pub clip_end: FrameNumber,
    pub rotation: i32,
    pub offline: bool,
}

fn resolve_clip(clip: &Clip, track: usize, frame: FrameNumber, sequence_rate: Rational) -> ResolvedClip {
    ResolvedClip {
        clip_id: clip.id.clone(),
        track,
        media_path: clip.media_path.clone(),
        clip_rate: clip.rate,
        source_frame: clip.source_frame_at(frame, sequence_rate),
        source_time_us: clip.source_time_us_at(frame, sequence_rate),
        clip_start: clip.timeline_start,
        clip_end: clip.timeline_end(),
        rotation: clip.rotation,
        offline: clip.offline,
    }
}

/// The single video clip visible at `frame`, or `None` for a gap.
///
/// Tracks are scanned in priority order (index 0 first); the first unmuted
/// covering clip wins and lower-priority clips are never consulted.
pub fn resolve_video_at(sequence: &Sequence, frame: FrameNumber) -> Option<ResolvedClip> {
    sequence
        .video_tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.muted)
        .find_map(|(idx, t)| {
            t.clip_at(frame)
                .map(|c| resolve_clip(c, idx, frame, sequence.rate))
        })
}

/// Every audio clip active at `frame`, across all unmuted audio tracks.
pub fn resolve_audio_at(sequence: &Sequence, frame: FrameNumber) -> Vec<ResolvedClip> {
    sequence
        .audio_tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.muted)
        .filter_map(|(idx, t)| {
            t.clip_at(frame)
                .map(|c| resolve_clip(c, idx, frame, sequence.rate))
        })
        .collect()
}

fn next_start_after(tracks: &[Track], frame: FrameNumber) -> Option<FrameNumber> {
    tracks
        .iter()
        .filter(|t| !t.muted)
        .filter_map(|t| t.next_start_after(frame))
        .min()
}

fn prev_end_before(tracks: &[Track], frame: FrameNumber) -> Option<FrameNumber> {
    tracks
        .iter()
        .filter(|t| !t.muted)
        .filter_map(|t| t.prev_end_before(frame))
        .max()
}

/// Start of the next video clip after `frame` on any track.
pub fn next_video_start_after(sequence: &Sequence, frame: FrameNumber) -> Option<FrameNumber> {
    next_start_after(&sequence.video_tracks, frame)
}

/// Last frame of the previous video clip before `frame` on any track.
pub fn prev_video_end_before(sequence: &Sequence, frame: FrameNumber) -> Option<FrameNumber> {
    prev_end_before(&sequence.video_tracks, frame)
}

/// Start of the next audio clip after `frame` on any track.
pub fn next_audio_start_after(sequence: &Sequence, frame: FrameNumber) -> Option<FrameNumber> {
    next_start_after(&sequence.audio_tracks, frame)
}

/// Last frame of the previous audio clip before `frame` on any track.
pub fn prev_audio_end_before(sequence: &Sequence, frame: FrameNumber) -> Option<FrameNumber> {
    prev_end_before(&sequence.audio_tracks, frame)
}

/// Clip layout window for a video track: active clip plus the next `ahead`.
pub fn video_clip_window(
    sequence: &Sequence,
    track: usize,
    frame: FrameNumber,
    ahead: usize,
) -> Vec<Clip> {
    sequence
        .video_tracks
        .get(track)
        .map(|t| t.window(frame, ahead))
        .unwrap_or_default()
}

/// Clip layout window for an audio track: active clip plus the next `ahead`.
pub fn audio_clip_window(
    sequence: &Sequence,
    track: usize,
    frame: FrameNumber,
    ahead: usize,
) -> Vec<Clip> {
    sequence
        .audio_tracks
        .get(track)
        .map(|t| t.window(frame, ahead))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, start: i64, duration: i64) -> Clip {
        Clip::new(id, format!("/media/{id}.mov"), start, duration, 0, Rational::FPS_24)
    }

    fn two_video_tracks() -> Sequence {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        seq.add_video_track().add_clip(clip("top", 0, 100));
        seq.add_video_track().add_clip(clip("under", 0, 100));
        seq
    }

    #[test]
    fn video_is_exclusive_lowest_track_wins() {
        let seq = two_video_tracks();
        let resolved = resolve_video_at(&seq, FrameNumber(50)).unwrap();
        assert_eq!(resolved.clip_id, ClipId::new("top"));
        assert_eq!(resolved.track, 0);
    }

    #[test]
    fn muted_video_track_falls_through() {
        let mut seq = two_video_tracks();
        seq.video_tracks[0].muted = true;
        let resolved = resolve_video_at(&seq, FrameNumber(50)).unwrap();
        assert_eq!(resolved.clip_id, ClipId::new("under"));
        assert_eq!(resolved.track, 1);
    }

    #[test]
    fn video_gap_resolves_to_none() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        seq.add_video_track().add_clip(clip("a", 0, 10));
        assert!(resolve_video_at(&seq, FrameNumber(20)).is_none());
    }

    #[test]
    fn lower_track_fills_upper_gap() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        seq.add_video_track().add_clip(clip("a", 0, 10));
        seq.add_video_track().add_clip(clip("bed", 0, 100));
        // After "a" ends the lower track shows through
        let resolved = resolve_video_at(&seq, FrameNumber(20)).unwrap();
        assert_eq!(resolved.clip_id, ClipId::new("bed"));
    }

    #[test]
    fn audio_is_inclusive_across_all_tracks() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        for i in 0..3 {
            seq.add_audio_track().add_clip(clip(&format!("a{i}"), 0, 100));
        }
        let resolved = resolve_audio_at(&seq, FrameNumber(10));
        assert_eq!(resolved.len(), 3);
        let tracks: Vec<_> = resolved.iter().map(|r| r.track).collect();
        assert_eq!(tracks, [0, 1, 2]);
    }

    #[test]
    fn muted_audio_track_excluded_from_mix() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        seq.add_audio_track().add_clip(clip("a0", 0, 100));
        seq.add_audio_track().add_clip(clip("a1", 0, 100));
        seq.audio_tracks[1].muted = true;
        let resolved = resolve_audio_at(&seq, FrameNumber(10));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].clip_id, ClipId::new("a0"));
    }

    #[test]
    fn resolved_source_mapping() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        let mut c = clip("c", 100, 50);
        c.source_in = FrameNumber(12);
        seq.add_video_track().add_clip(c);

        let resolved = resolve_video_at(&seq, FrameNumber(110)).unwrap();
        assert_eq!(resolved.source_frame, FrameNumber(22));
        assert_eq!(resolved.source_time_us, kino_common::frame_to_us(FrameNumber(22), Rational::FPS_24));
        assert_eq!(resolved.clip_start, FrameNumber(100));
        assert_eq!(resolved.clip_end, FrameNumber(150));
    }

    #[test]
    fn neighbor_lookups_span_tracks() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        seq.add_video_track().add_clip(clip("a", 0, 10));
        seq.add_video_track().add_clip(clip("b", 40, 10));

        assert_eq!(next_video_start_after(&seq, FrameNumber(15)), Some(FrameNumber(40)));
        assert_eq!(prev_video_end_before(&seq, FrameNumber(15)), Some(FrameNumber(9)));
        assert_eq!(next_video_start_after(&seq, FrameNumber(40)), None);
    }

    #[test]
    fn audio_neighbor_lookups() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        seq.add_audio_track().add_clip(clip("a", 20, 10));
        assert_eq!(next_audio_start_after(&seq, FrameNumber(0)), Some(FrameNumber(20)));
        assert_eq!(prev_audio_end_before(&seq, FrameNumber(50)), Some(FrameNumber(29)));
    }

    #[test]
    fn clip_window_helpers() {
        let mut seq = Sequence::new("seq", Rational::FPS_24);
        let track = seq.add_video_track();
        track.add_clip(clip("a", 0, 10));
        track.add_clip(clip("b", 10, 10));
        track.add_clip(clip("c", 20, 10));

        let w = video_clip_window(&seq, 0, FrameNumber(5), 1);
        let ids: Vec<_> = w.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        // Out-of-range track index yields an empty window
        assert!(video_clip_window(&seq, 7, FrameNumber(5), 1).is_empty());
    }
}
