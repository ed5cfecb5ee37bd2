//! `kino-common` — Shared types and time math for the Kinocut playback engine.
//!
//! This crate is the foundation the other engine crates depend on.
//! It defines the core abstractions:
//!
//! - **Types**: `FrameNumber`, `TimeUs` (newtypes/aliases for safety)
//! - **Rates**: `Rational` frame rates with canonical-rate snapping
//! - **Time math**: exact frame ↔ microsecond conversion (no float drift)
//! - **Ids**: `ClipId`, `SequenceId`, `TrackId` (track kind + index)
//! - **Config**: `PlaybackConfig` (tick floor, prefetch window, burst length)

pub mod config;
pub mod ids;
pub mod rate;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use config::PlaybackConfig;
pub use ids::{ClipId, SequenceId, TrackId, TrackKind};
pub use rate::Rational;
pub use time::{frame_duration_us, frame_to_us, us_to_frame};
pub use types::{FrameNumber, TimeUs};
