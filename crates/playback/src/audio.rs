//! Audio device seam and the single-ownership arbiter.
//!
//! The audio device is a process-wide resource: several sequence monitors
//! can exist, but only one engine may drive the device at a time. Ownership
//! is explicit: an engine claims it through the arbiter and every device
//! call checks the claim. There is no implicit handoff.

use kino_common::{ClipId, Rational, TimeUs};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Audio device error. Failures here are recovered locally: the session
/// logs and swallows them, and the video tick loop continues.
#[derive(Error, Debug)]
pub enum AudioDeviceError {
    /// Device is not open or has no usable output.
    #[error("Audio device not ready")]
    NotReady,

    /// Seeking the device to a media time failed.
    #[error("Audio seek to {time_us}us failed: {reason}")]
    Seek { time_us: i64, reason: String },

    /// Start/stop/speed transport call failed.
    #[error("Audio transport error: {0}")]
    Transport(String),

    /// Binding sources or applying the mix failed.
    #[error("Audio source error: {0}")]
    Sources(String),

    /// Anything else the device driver reports.
    #[error("Audio device error: {0}")]
    Device(String),
}

/// One audio source bound to the device: a clip on an audio track with the
/// media time to read from.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSourceSpec {
    pub track: usize,
    pub clip_id: ClipId,
    pub media_path: PathBuf,
    pub source_time_us: TimeUs,
    pub clip_rate: Rational,
}

/// Per-track gains applied after (re)binding sources.
#[derive(Clone, Debug, PartialEq)]
pub struct MixState {
    pub track_gains: Vec<f64>,
}

impl MixState {
    /// Unity gain for `tracks` sources.
    pub fn unity(tracks: usize) -> Self {
        Self {
            track_gains: vec![1.0; tracks],
        }
    }
}

/// The audio hardware abstraction the engine drives.
///
/// The device owns its own clock; [`time_us`](Self::time_us) is the master
/// time the video follows while the device is playing.
pub trait AudioDevice {
    /// Whether the device is open and usable.
    fn is_ready(&self) -> bool;

    /// Reposition the device clock to a media time.
    fn seek(&mut self, us: TimeUs) -> Result<(), AudioDeviceError>;

    /// Begin rendering from the current position.
    fn start(&mut self) -> Result<(), AudioDeviceError>;

    /// Stop rendering; the clock holds its position.
    fn stop(&mut self) -> Result<(), AudioDeviceError>;

    /// Playback rate multiplier (1.0 = realtime).
    fn set_speed(&mut self, speed: f64) -> Result<(), AudioDeviceError>;

    /// Device-reported media time, the master clock for sync.
    fn time_us(&self) -> Result<TimeUs, AudioDeviceError>;

    /// Freeze output with the clock pinned at a boundary time.
    fn latch(&mut self, us: TimeUs) -> Result<(), AudioDeviceError>;

    /// Play a short burst starting at `us` (single-frame jog audio).
    fn play_burst(&mut self, us: TimeUs, duration_us: i64) -> Result<(), AudioDeviceError>;

    /// Replace the bound source set.
    fn set_sources(&mut self, sources: &[AudioSourceSpec]) -> Result<(), AudioDeviceError>;

    /// Apply per-track gains for the bound sources.
    fn apply_mix(&mut self, mix: &MixState) -> Result<(), AudioDeviceError>;
}

/// Identity of one engine instance for ownership bookkeeping.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

impl EngineId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Process-wide single-owner token for the shared audio device.
///
/// Engines share one arbiter; `try_claim` succeeds for the current owner or
/// when the device is free. Everything runs on one event-loop thread; the
/// mutex provides logical exclusion between engine instances, not thread
/// safety against concurrent ticks.
#[derive(Default)]
pub struct AudioArbiter {
    owner: Mutex<Option<EngineId>>,
}

impl AudioArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the device. Succeeds if free or already owned by `id`.
    pub fn try_claim(&self, id: EngineId) -> bool {
        let mut owner = self.owner.lock();
        match *owner {
            None => {
                *owner = Some(id);
                true
            }
            Some(current) => current == id,
        }
    }

    /// Release the device if `id` owns it.
    pub fn release(&self, id: EngineId) {
        let mut owner = self.owner.lock();
        if *owner == Some(id) {
            *owner = None;
        }
    }

    pub fn is_owner(&self, id: EngineId) -> bool {
        *self.owner.lock() == Some(id)
    }

    pub fn owner(&self) -> Option<EngineId> {
        *self.owner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_ids_are_unique() {
        let a = EngineId::next();
        let b = EngineId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn claim_and_release() {
        let arbiter = AudioArbiter::new();
        let a = EngineId::next();
        let b = EngineId::next();

        assert!(arbiter.try_claim(a));
        assert!(arbiter.is_owner(a));
        assert!(!arbiter.try_claim(b)); // second engine is refused
        assert!(!arbiter.is_owner(b));

        arbiter.release(a);
        assert_eq!(arbiter.owner(), None);
        assert!(arbiter.try_claim(b));
    }

    #[test]
    fn reclaim_by_owner_is_idempotent() {
        let arbiter = AudioArbiter::new();
        let a = EngineId::next();
        assert!(arbiter.try_claim(a));
        assert!(arbiter.try_claim(a));
        assert!(arbiter.is_owner(a));
    }

    #[test]
    fn release_by_non_owner_is_ignored() {
        let arbiter = AudioArbiter::new();
        let a = EngineId::next();
        let b = EngineId::next();
        arbiter.try_claim(a);
        arbiter.release(b);
        assert!(arbiter.is_owner(a));
    }

    #[test]
    fn unity_mix() {
        let mix = MixState::unity(3);
        assert_eq!(mix.track_gains, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn error_display() {
        let err = AudioDeviceError::Seek {
            time_us: 1000,
            reason: "device lost".to_string(),
        };
        assert_eq!(err.to_string(), "Audio seek to 1000us failed: device lost");
    }
}
