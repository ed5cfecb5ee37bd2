//! Configuration for the playback engine.

use serde::{Deserialize, Serialize};

/// Tunables for the playback coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Minimum tick interval in milliseconds. Caps the display refresh
    /// near 60 Hz regardless of sequence rate or shuttle speed.
    pub tick_floor_ms: u64,
    /// How many upcoming clips per track are pushed to the media buffer
    /// for pre-buffering as the playhead moves.
    pub clip_window: usize,
    /// Length of the audio burst played for a single-frame jog, in frames.
    pub audio_burst_frames: i64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_floor_ms: 16,
            clip_window: 3,
            audio_burst_frames: 1,
        }
    }
}
