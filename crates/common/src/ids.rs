//! Identifier newtypes shared across the engine crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a clip placed on a track.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a sequence (a multi-track timeline document).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub String);

impl SequenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Track kind. Video and audio tracks are numbered independently, so the
/// kind is part of the identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Composite track identifier: kind + index within that kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId {
    pub kind: TrackKind,
    pub index: usize,
}

impl TrackId {
    pub fn video(index: usize) -> Self {
        Self {
            kind: TrackKind::Video,
            index,
        }
    }

    pub fn audio(index: usize) -> Self {
        Self {
            kind: TrackKind::Audio,
            index,
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TrackKind::Video => write!(f, "V{}", self.index),
            TrackKind::Audio => write!(f, "A{}", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_id_display() {
        assert_eq!(TrackId::video(0).to_string(), "V0");
        assert_eq!(TrackId::audio(2).to_string(), "A2");
    }

    #[test]
    fn track_ids_distinct_across_kinds() {
        assert_ne!(TrackId::video(1), TrackId::audio(1));
        assert_eq!(TrackId::video(1), TrackId::video(1));
    }

    #[test]
    fn clip_id_roundtrip() {
        let id = ClipId::new("clip_0042");
        let json = serde_json::to_string(&id).unwrap();
        let back: ClipId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert_eq!(back.to_string(), "clip_0042");
    }
}
