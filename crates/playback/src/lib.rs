//! `kino-playback` — Transport control and audio/video playback
//! synchronization for the Kinocut editor.
//!
//! This crate is the playback core: it decides which frame is on the
//! monitor at every instant, keeps video locked to the independently
//! clocked audio device, and survives being interrupted mid-playback by
//! external actors. It provides:
//!
//! - **Transport**: play, stop, JKL-style shuttle with an unwind-then-
//!   reverse speed ladder, slow motion, frame-accurate seek
//! - **Sync**: video-follows-audio while the device clock advances, with a
//!   stuckness detector that falls back to frame accumulation when the
//!   clock silently stalls
//! - **Boundary latch**: shuttle freezes at content edges and resumes on
//!   reversal; plain play stops outright
//! - **Modes**: source (single clip) and timeline (multi-track, with
//!   per-tick clip re-resolution and dynamic source re-binding)
//! - **Scheduling**: cooperative one-shot ticks with generation-counter
//!   cancellation
//! - **Audio ownership**: one engine per monitor, one owner for the
//!   process-wide audio device
//!
//! The engine owns no media: decode, audio hardware, and sequence data sit
//! behind the [`MediaBuffer`], [`AudioDevice`], and
//! [`SequenceStore`](kino_timeline::SequenceStore) seams.

pub mod audio;
pub mod engine;
pub mod sched;
pub mod sink;
pub mod snapshot;
pub mod state;

mod session;
mod source;
mod timeline;

// Re-export primary API
pub use audio::{
    AudioArbiter, AudioDevice, AudioDeviceError, AudioSourceSpec, EngineId, MixState,
};
pub use engine::{PlaybackEngine, TransportStatus};
pub use sched::{tick_interval, TickScheduler};
pub use sink::{FrameHandle, FrameMetadata, MediaBuffer, PlaybackCallbacks, VideoFrameResult};
pub use snapshot::{ClipBinding, ContentBounds, TickResult, TickSnapshot};
pub use state::{Boundary, Latch, PlayState, ShuttleSpeed, TransportMode, TransportState};
