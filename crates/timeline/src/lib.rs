//! `kino-timeline` — Sequence model and active-clip resolution for the
//! Kinocut playback engine.
//!
//! This crate answers the question the playback tick asks sixty times a
//! second: *which media is under the playhead right now?* It provides:
//!
//! - **Model**: `Sequence`, `Track`, `Clip`, the read-side timeline shape
//!   (clips sorted by start frame so every query is a binary search)
//! - **Resolution**: `resolve_video_at` (exclusive: lowest track index
//!   wins) and `resolve_audio_at` (inclusive: every covering clip mixes)
//! - **Prefetch support**: next/previous clip lookups and clip windows for
//!   feeding the media buffer incrementally
//! - **Store**: `SequenceStore` trait and the shared playhead cell external
//!   actors (UI clicks, keyboard jog, undo) move between ticks

pub mod resolver;
pub mod store;
pub mod types;

// Re-export primary API
pub use resolver::{
    audio_clip_window, next_audio_start_after, next_video_start_after, prev_audio_end_before,
    prev_video_end_before, resolve_audio_at, resolve_video_at, video_clip_window, ResolvedClip,
};
pub use store::{MemorySequenceStore, SequenceStore, SharedPlayhead};
pub use types::{Clip, Sequence, Track};
