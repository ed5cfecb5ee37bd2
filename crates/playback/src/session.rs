//! Audio session: the coordinator's bookkeeping around the shared device.
//!
//! Wraps every device call with the ownership check and the
//! log-and-swallow fault policy: audio may fail, video must not. Also
//! tracks which clip sources are currently bound so rebinding only happens
//! when the resolved set actually changes.

use kino_common::{frame_duration_us, frame_to_us, us_to_frame, ClipId, FrameNumber, Rational, TimeUs};
use kino_timeline::ResolvedClip;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::audio::{AudioArbiter, AudioDevice, AudioDeviceError, AudioSourceSpec, EngineId, MixState};
use crate::snapshot::TickSnapshot;

/// Outcome of the per-tick position computation (follow-audio or fall back
/// to frame accumulation).
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Advance {
    /// Position the tick should move to (before boundary handling).
    pub next: FrameNumber,
    /// What the device reported this tick, for the stuckness detector.
    pub reported: Option<FrameNumber>,
}

/// One engine's handle on the shared audio device.
pub struct AudioSession {
    device: Box<dyn AudioDevice>,
    arbiter: Arc<AudioArbiter>,
    engine: EngineId,
    /// Currently bound (track, clip) source set.
    bound: Vec<(usize, ClipId)>,
    /// We told the device to start and have not stopped/frozen since.
    running: bool,
    /// Frozen at a boundary by a latch.
    frozen: bool,
}

impl AudioSession {
    pub(crate) fn new(device: Box<dyn AudioDevice>, arbiter: Arc<AudioArbiter>, engine: EngineId) -> Self {
        Self {
            device,
            arbiter,
            engine,
            bound: Vec::new(),
            running: false,
            frozen: false,
        }
    }

    /// Claim device ownership. Returns false if another engine holds it.
    pub fn activate(&mut self) -> bool {
        let claimed = self.arbiter.try_claim(self.engine);
        debug!(engine = ?self.engine, claimed, "audio ownership claim");
        claimed
    }

    /// Stop the device (if we were driving it) and release ownership.
    pub fn deactivate(&mut self) {
        if self.owns() {
            self.stop();
            self.arbiter.release(self.engine);
            debug!(engine = ?self.engine, "audio ownership released");
        }
    }

    pub fn owns(&self) -> bool {
        self.arbiter.is_owner(self.engine)
    }

    /// Fault isolation for device calls: log and swallow, never propagate.
    fn guard<T>(&self, call: &str, result: Result<T, AudioDeviceError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(call, error = %error, "audio device call failed; video continues");
                None
            }
        }
    }

    fn usable(&self) -> bool {
        self.owns() && self.device.is_ready()
    }

    /// Whether the device clock is actively advancing and should be
    /// followed as the master clock.
    pub(crate) fn is_driving(&self) -> bool {
        self.running && !self.frozen && self.usable()
    }

    /// Re-seek the device clock to a frame position.
    pub(crate) fn anchor(&mut self, frame: FrameNumber, rate: Rational) {
        if !self.usable() {
            return;
        }
        let us = frame_to_us(frame, rate);
        let result = self.device.seek(us);
        self.guard("seek", result);
        self.frozen = false;
        trace!(frame = %frame, us, "audio anchored");
    }

    /// Start rendering at a speed multiplier.
    pub(crate) fn start(&mut self, speed: f64) {
        if !self.usable() {
            return;
        }
        let result = self.device.set_speed(speed);
        self.guard("set_speed", result);
        let started = self.device.start();
        if self.guard("start", started).is_some() {
            self.running = true;
            self.frozen = false;
        }
    }

    /// Stop rendering; the device clock holds.
    pub(crate) fn stop(&mut self) {
        if self.usable() && self.running {
            let result = self.device.stop();
            self.guard("stop", result);
        }
        self.running = false;
        self.frozen = false;
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        if !self.usable() {
            return;
        }
        let result = self.device.set_speed(speed);
        self.guard("set_speed", result);
    }

    /// Freeze output with the clock pinned at a boundary time (latch).
    pub(crate) fn freeze(&mut self, us: TimeUs) {
        if self.usable() {
            let result = self.device.latch(us);
            self.guard("latch", result);
        }
        self.running = false;
        self.frozen = true;
        debug!(us, "audio frozen at boundary");
    }

    /// Device-reported position converted to frames, if the device is
    /// consultable. Valid while frozen too: latch release re-anchors from
    /// this value.
    pub(crate) fn reported_frame(&self, rate: Rational) -> Option<FrameNumber> {
        if !self.usable() {
            return None;
        }
        self.guard("time_us", self.device.time_us())
            .map(|us| us_to_frame(us, rate))
    }

    /// Compute the next position from `base` per the follow/fallback rule:
    /// follow the device clock while it is driving and actually advancing;
    /// otherwise accumulate whole frames. Two consecutive identical device
    /// reports while in motion mean the clock stalled (silent gap,
    /// exhausted content); fall back so video does not stall with it.
    pub(crate) fn advance_from(&self, snapshot: &TickSnapshot, base: FrameNumber) -> Advance {
        let reported = if snapshot.direction > 0 && self.is_driving() {
            self.reported_frame(snapshot.rate)
        } else {
            None
        };

        let stuck = reported.is_some() && reported == snapshot.last_audio_frame;
        if stuck {
            trace!(frame = ?reported, "audio clock stalled; falling back to frame accumulation");
        }

        let next = match reported {
            Some(frame) if !stuck => frame,
            _ => base + snapshot.direction as i64 * snapshot.speed.step_frames(),
        };

        Advance { next, reported }
    }

    pub(crate) fn advance(&self, snapshot: &TickSnapshot) -> Advance {
        self.advance_from(snapshot, snapshot.position)
    }

    /// Bind the resolved audio clip set to the device, if it changed.
    /// Pushes the source list and re-applies the mix in one step.
    pub(crate) fn sync_sources(&mut self, clips: &[ResolvedClip]) {
        if !self.usable() {
            return;
        }
        let key: Vec<(usize, ClipId)> = clips
            .iter()
            .map(|c| (c.track, c.clip_id.clone()))
            .collect();
        if key == self.bound {
            return;
        }

        let specs: Vec<AudioSourceSpec> = clips
            .iter()
            .map(|c| AudioSourceSpec {
                track: c.track,
                clip_id: c.clip_id.clone(),
                media_path: c.media_path.clone(),
                source_time_us: c.source_time_us,
                clip_rate: c.clip_rate,
            })
            .collect();

        let result = self.device.set_sources(&specs);
        if self.guard("set_sources", result).is_some() {
            let mix = MixState::unity(specs.len());
            let applied = self.device.apply_mix(&mix);
            self.guard("apply_mix", applied);
            debug!(sources = specs.len(), "audio sources rebound");
            self.bound = key;
        }
    }

    /// Drop all bound sources (leaving timeline mode, unloading).
    pub(crate) fn clear_sources(&mut self) {
        if self.bound.is_empty() {
            return;
        }
        if self.usable() {
            let result = self.device.set_sources(&[]);
            self.guard("set_sources", result);
        }
        self.bound.clear();
    }

    /// Single-frame jog audio: a short burst at the frame's media time.
    pub(crate) fn play_burst(&mut self, frame: FrameNumber, rate: Rational, frames: i64) {
        if !self.usable() {
            return;
        }
        let us = frame_to_us(frame, rate);
        let duration_us = frame_duration_us(rate) * frames.max(1);
        let result = self.device.play_burst(us, duration_us);
        self.guard("play_burst", result);
    }
}
