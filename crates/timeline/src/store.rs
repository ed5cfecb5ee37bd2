//! Read access to sequences and their shared playheads.
//!
//! The playback engine never owns sequence data: it reads immutable
//! snapshots through [`SequenceStore`] and mirrors the externally visible
//! playhead through [`SharedPlayhead`]. Editing code publishes a fresh
//! `Arc<Sequence>` after every structural change; the engine picks it up
//! on the next explicit refresh.

use kino_common::{FrameNumber, SequenceId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::types::Sequence;

/// The externally visible playhead of one sequence monitor.
///
/// UI clicks, keyboard jog, and undo move this cell between ticks; the
/// engine compares it against the last frame it committed to detect
/// external moves. Relaxed ordering is enough: everything runs on one
/// event-loop thread and readers only need eventual consistency.
#[derive(Clone, Debug, Default)]
pub struct SharedPlayhead(Arc<AtomicI64>);

impl SharedPlayhead {
    pub fn new(frame: FrameNumber) -> Self {
        Self(Arc::new(AtomicI64::new(frame.0)))
    }

    pub fn load(&self) -> FrameNumber {
        FrameNumber(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, frame: FrameNumber) {
        self.0.store(frame.0, Ordering::Relaxed);
    }
}

/// Indexed read access to the sequences the model layer owns.
pub trait SequenceStore {
    /// Current immutable snapshot of a sequence, if it exists.
    fn sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>>;

    /// The shared playhead cell for a sequence's monitor.
    fn shared_playhead(&self, id: &SequenceId) -> Option<SharedPlayhead>;
}

/// In-memory sequence store: the model layer used by headless hosts and
/// tests. Each entry pairs a sequence snapshot with its playhead cell;
/// updating a sequence replaces the snapshot but keeps the playhead.
#[derive(Default)]
pub struct MemorySequenceStore {
    entries: HashMap<SequenceId, (Arc<Sequence>, SharedPlayhead)>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sequence, returning its playhead cell.
    pub fn insert(&mut self, sequence: Sequence) -> SharedPlayhead {
        let id = sequence.id.clone();
        let playhead = SharedPlayhead::new(FrameNumber::ZERO);
        debug!(sequence = %id, "Sequence registered");
        self.entries
            .insert(id, (Arc::new(sequence), playhead.clone()));
        playhead
    }

    /// Replace a sequence snapshot after an edit, keeping its playhead.
    /// Inserts if the sequence was not registered yet.
    pub fn update(&mut self, sequence: Sequence) -> SharedPlayhead {
        let id = sequence.id.clone();
        match self.entries.get_mut(&id) {
            Some((snapshot, playhead)) => {
                *snapshot = Arc::new(sequence);
                debug!(sequence = %id, "Sequence snapshot replaced");
                playhead.clone()
            }
            None => self.insert(sequence),
        }
    }
}

impl SequenceStore for MemorySequenceStore {
    fn sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>> {
        self.entries.get(id).map(|(seq, _)| Arc::clone(seq))
    }

    fn shared_playhead(&self, id: &SequenceId) -> Option<SharedPlayhead> {
        self.entries.get(id).map(|(_, ph)| ph.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kino_common::Rational;

    #[test]
    fn playhead_load_store() {
        let ph = SharedPlayhead::new(FrameNumber(5));
        assert_eq!(ph.load(), FrameNumber(5));
        ph.store(FrameNumber(42));
        assert_eq!(ph.load(), FrameNumber(42));
    }

    #[test]
    fn playhead_clones_share_state() {
        let a = SharedPlayhead::new(FrameNumber::ZERO);
        let b = a.clone();
        a.store(FrameNumber(7));
        assert_eq!(b.load(), FrameNumber(7));
    }

    #[test]
    fn store_lookup() {
        let mut store = MemorySequenceStore::new();
        store.insert(Sequence::new("seq_a", Rational::FPS_24));

        let id = SequenceId::new("seq_a");
        assert!(store.sequence(&id).is_some());
        assert!(store.shared_playhead(&id).is_some());
        assert!(store.sequence(&SequenceId::new("missing")).is_none());
    }

    #[test]
    fn update_keeps_playhead() {
        let mut store = MemorySequenceStore::new();
        let ph = store.insert(Sequence::new("seq_a", Rational::FPS_24));
        ph.store(FrameNumber(30));

        let mut edited = Sequence::new("seq_a", Rational::FPS_24);
        edited.add_video_track();
        let ph2 = store.update(edited);

        assert_eq!(ph2.load(), FrameNumber(30));
        let snap = store.sequence(&SequenceId::new("seq_a")).unwrap();
        assert_eq!(snap.video_tracks.len(), 1);
    }
}
