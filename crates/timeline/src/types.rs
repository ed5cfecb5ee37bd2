//! Timeline data model types: `Sequence`, `Track`, `Clip`.
//!
//! These are the read-side types the resolver consumes every tick. Clips
//! keep their own native frame rate: a 23.976 clip cut into a 25 fps
//! sequence maps timeline offsets into its own grid through exact rational
//! rescaling, never through a float rate.

use kino_common::{frame_to_us, us_to_frame, ClipId, FrameNumber, Rational, SequenceId, TimeUs, TrackKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A clip placed on a track. References a media file and describes how it
/// maps onto the sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip identifier.
    pub id: ClipId,
    /// Media file backing this clip.
    pub media_path: PathBuf,
    /// Where this clip starts on the timeline, in sequence frames.
    pub timeline_start: FrameNumber,
    /// Clip length on the timeline, in sequence frames.
    pub duration: i64,
    /// Source in-point, in frames of the clip's own rate.
    pub source_in: FrameNumber,
    /// The clip's native frame rate (may differ from the sequence rate).
    pub rate: Rational,
    /// Display rotation in degrees (0, 90, 180, 270).
    pub rotation: i32,
    /// Whether the backing media file is currently missing.
    pub offline: bool,
}

impl Clip {
    /// Create a clip with no rotation and online media.
    pub fn new(
        id: impl Into<String>,
        media_path: impl Into<PathBuf>,
        timeline_start: i64,
        duration: i64,
        source_in: i64,
        rate: Rational,
    ) -> Self {
        Self {
            id: ClipId::new(id),
            media_path: media_path.into(),
            timeline_start: FrameNumber(timeline_start),
            duration,
            source_in: FrameNumber(source_in),
            rate,
            rotation: 0,
            offline: false,
        }
    }

    /// First timeline frame past this clip (exclusive end).
    pub fn timeline_end(&self) -> FrameNumber {
        self.timeline_start + self.duration
    }

    /// Whether the clip covers the given timeline frame.
    pub fn covers(&self, frame: FrameNumber) -> bool {
        frame >= self.timeline_start && frame < self.timeline_end()
    }

    /// Source frame (on the clip's own grid) corresponding to a timeline
    /// frame. The timeline offset is rescaled exactly: sequence frames →
    /// microseconds → clip frames.
    pub fn source_frame_at(&self, frame: FrameNumber, sequence_rate: Rational) -> FrameNumber {
        let offset = FrameNumber(frame - self.timeline_start);
        let offset_us = frame_to_us(offset, sequence_rate);
        self.source_in + us_to_frame(offset_us, self.rate).0
    }

    /// Media time (microseconds into the source file) at a timeline frame.
    pub fn source_time_us_at(&self, frame: FrameNumber, sequence_rate: Rational) -> TimeUs {
        frame_to_us(self.source_frame_at(frame, sequence_rate), self.rate)
    }
}

/// A single track containing clips ordered by `timeline_start`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    /// Track kind (video or audio).
    pub kind: TrackKind,
    /// Clips, kept sorted by `timeline_start`.
    pub clips: Vec<Clip>,
    /// Muted tracks resolve to nothing.
    pub muted: bool,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            clips: Vec::new(),
            muted: false,
        }
    }

    /// Insert a clip, keeping the list sorted by start frame so lookups
    /// stay binary searches.
    pub fn add_clip(&mut self, clip: Clip) {
        let at = self
            .clips
            .partition_point(|c| c.timeline_start <= clip.timeline_start);
        self.clips.insert(at, clip);
    }

    /// The clip covering `frame`, if any.
    pub fn clip_at(&self, frame: FrameNumber) -> Option<&Clip> {
        let idx = self.clips.partition_point(|c| c.timeline_start <= frame);
        if idx == 0 {
            return None;
        }
        let clip = &self.clips[idx - 1];
        clip.covers(frame).then_some(clip)
    }

    /// Start frame of the first clip beginning strictly after `frame`.
    pub fn next_start_after(&self, frame: FrameNumber) -> Option<FrameNumber> {
        let idx = self.clips.partition_point(|c| c.timeline_start <= frame);
        self.clips.get(idx).map(|c| c.timeline_start)
    }

    /// Last frame of the nearest clip ending at or before `frame`.
    pub fn prev_end_before(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.clips
            .iter()
            .rev()
            .find(|c| c.timeline_end() <= frame)
            .map(|c| c.timeline_end() - 1)
    }

    /// The active clip at `frame` (if any) plus the next `ahead` clips:
    /// the incremental layout window handed to the media buffer.
    pub fn window(&self, frame: FrameNumber, ahead: usize) -> Vec<Clip> {
        let idx = self.clips.partition_point(|c| c.timeline_start <= frame);
        let from = if idx > 0 && self.clips[idx - 1].covers(frame) {
            idx - 1
        } else {
            idx
        };
        let to = (from + 1 + ahead).min(self.clips.len());
        self.clips[from..to].to_vec()
    }

    /// First frame past the last clip on this track (0 when empty).
    pub fn end(&self) -> FrameNumber {
        self.clips
            .iter()
            .map(Clip::timeline_end)
            .max()
            .unwrap_or(FrameNumber::ZERO)
    }
}

/// A multi-track sequence: the timeline document the resolver reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence identifier.
    pub id: SequenceId,
    /// The sequence frame rate: the grid the playhead moves on.
    pub rate: Rational,
    /// Video tracks, index 0 = highest priority for display.
    pub video_tracks: Vec<Track>,
    /// Audio tracks; all of them mix.
    pub audio_tracks: Vec<Track>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, rate: Rational) -> Self {
        Self {
            id: SequenceId::new(id),
            rate,
            video_tracks: Vec::new(),
            audio_tracks: Vec::new(),
        }
    }

    /// Append a video track and return a mutable reference to it.
    pub fn add_video_track(&mut self) -> &mut Track {
        self.video_tracks.push(Track::new(TrackKind::Video));
        self.video_tracks.last_mut().expect("just pushed")
    }

    /// Append an audio track and return a mutable reference to it.
    pub fn add_audio_track(&mut self) -> &mut Track {
        self.audio_tracks.push(Track::new(TrackKind::Audio));
        self.audio_tracks.last_mut().expect("just pushed")
    }

    /// First frame past all content on any track.
    pub fn content_end(&self) -> FrameNumber {
        self.video_tracks
            .iter()
            .chain(self.audio_tracks.iter())
            .map(Track::end)
            .max()
            .unwrap_or(FrameNumber::ZERO)
    }
}
