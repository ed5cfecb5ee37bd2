//! Playback coordinator: canonical transport state, timer scheduling,
//! audio ownership, and the boundary latch.
//!
//! Architecture:
//!
//! ```text
//! UI / keyboard            PlaybackEngine                collaborators
//! ┌────────────┐   ops    ┌───────────────────┐   trait  ┌─────────────┐
//! │ play/stop/ ├─────────►│ transport state   ├─────────►│ AudioDevice │
//! │ shuttle/   │          │ tick generation   │          ├─────────────┤
//! │ seek/jog   │  arm(Δt) │ boundary latch    ├─────────►│ MediaBuffer │
//! └────────────┘ ◄────────┤ mode dispatch     │          ├─────────────┤
//!    on_tick(gen)         │  Source|Timeline  ├─────────►│ SequenceStore│
//!                         └───────────────────┘          └─────────────┘
//! ```
//!
//! Every timer tick builds a read-only snapshot, dispatches to the active
//! mode's tick function, and commits the returned result. Mode functions
//! perform their side effects (display, audio) before the commit, so no
//! half-applied tick is ever observable. The scheduler primitive has no
//! cancel; the generation counter is the cancellation mechanism.

use kino_common::{FrameNumber, PlaybackConfig, Rational, SequenceId};
use kino_timeline::SequenceStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::audio::{AudioArbiter, AudioDevice, EngineId};
use crate::sched::{tick_interval, TickScheduler};
use crate::session::AudioSession;
use crate::sink::{MediaBuffer, PlaybackCallbacks};
use crate::snapshot::{ContentBounds, TickResult, TickSnapshot};
use crate::source::{self, SourceTarget};
use crate::state::{Boundary, Latch, PlayState, ShuttleSpeed, TransportMode, TransportState};
use crate::timeline::{self, TimelineTarget};

/// What the monitor is currently bound to.
enum EngineMode {
    Unloaded,
    Source(SourceTarget),
    Timeline(TimelineTarget),
}

/// Transport snapshot for UI polling.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransportStatus {
    pub play_state: PlayState,
    pub direction: i32,
    pub speed: f64,
    pub position: FrameNumber,
    pub mode: TransportMode,
    pub latched: bool,
    pub boundary: Option<Boundary>,
}

/// One playback engine per monitor. Owns the transport state machine and
/// drives the shared audio device while it holds the ownership token.
pub struct PlaybackEngine {
    config: PlaybackConfig,
    store: Arc<dyn SequenceStore>,
    media: Box<dyn MediaBuffer>,
    scheduler: Box<dyn TickScheduler>,
    callbacks: PlaybackCallbacks,
    session: AudioSession,
    mode: EngineMode,
    /// Source target parked while the monitor is in timeline mode.
    saved_source: Option<(SourceTarget, FrameNumber)>,
    transport: TransportState,
    /// Bumped whenever the pending timer callback must be superseded;
    /// callbacks armed with an older generation are discarded.
    generation: u64,
    /// Audio frame reported on the previous tick (stuckness detector).
    last_audio_frame: Option<FrameNumber>,
}

impl PlaybackEngine {
    pub fn new(
        config: PlaybackConfig,
        store: Arc<dyn SequenceStore>,
        device: Box<dyn AudioDevice>,
        arbiter: Arc<AudioArbiter>,
        media: Box<dyn MediaBuffer>,
        scheduler: Box<dyn TickScheduler>,
        callbacks: PlaybackCallbacks,
    ) -> Self {
        let engine_id = EngineId::next();
        info!(engine = ?engine_id, "playback engine created");
        Self {
            config,
            store,
            media,
            scheduler,
            callbacks,
            session: AudioSession::new(device, arbiter, engine_id),
            mode: EngineMode::Unloaded,
            saved_source: None,
            transport: TransportState::default(),
            generation: 0,
            last_audio_frame: None,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_position(&self) -> FrameNumber {
        self.transport.position
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn get_status(&self) -> TransportStatus {
        TransportStatus {
            play_state: self.transport.play_state,
            direction: self.transport.direction,
            speed: self.transport.speed.as_f64(),
            position: self.transport.position,
            mode: self.transport.mode,
            latched: self.transport.latch.is_active(),
            boundary: self.transport.latch.boundary(),
        }
    }

    // -----------------------------------------------------------------------
    // Audio ownership
    // -----------------------------------------------------------------------

    /// Claim the shared audio device for this engine. While unowned, every
    /// audio-touching method is a no-op.
    pub fn activate_audio(&mut self) -> bool {
        self.session.activate()
    }

    /// Stop driving the device and release the ownership token.
    pub fn deactivate_audio(&mut self) {
        self.session.deactivate()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Bind the monitor to a single source clip.
    pub fn set_source(&mut self, total_frames: i64, rate: Rational) {
        assert!(total_frames >= 0, "source length cannot be negative");
        if self.transport.is_playing() {
            self.stop();
        } else {
            self.generation += 1;
        }
        self.session.clear_sources();

        let rate = rate.snap_to_canonical();
        self.saved_source = None;
        self.mode = EngineMode::Source(SourceTarget { rate, total_frames });
        self.transport = TransportState::default();
        self.last_audio_frame = None;

        self.display_position(FrameNumber::ZERO);
        self.session.anchor(FrameNumber::ZERO, rate);
        (self.callbacks.on_position_changed)(FrameNumber::ZERO);
        info!(total_frames, rate = %rate, "source loaded");
    }

    /// Enter or leave timeline mode. Entering binds the monitor to the
    /// sequence's shared playhead; leaving restores the parked source (if
    /// any). The sequence must exist; an unknown id is an upstream bug.
    pub fn set_timeline_mode(&mut self, enabled: bool, sequence_id: Option<&SequenceId>) {
        if enabled {
            let id = sequence_id.expect("set_timeline_mode: sequence id required to enable");
            let sequence = self
                .store
                .sequence(id)
                .unwrap_or_else(|| panic!("set_timeline_mode: unknown sequence {id}"));
            let playhead = self
                .store
                .shared_playhead(id)
                .unwrap_or_else(|| panic!("set_timeline_mode: no playhead for sequence {id}"));

            if self.transport.is_playing() {
                self.stop();
            } else {
                self.generation += 1;
            }

            let previous = std::mem::replace(&mut self.mode, EngineMode::Unloaded);
            if let EngineMode::Source(target) = previous {
                self.saved_source = Some((target, self.transport.position));
            }

            let target = TimelineTarget::new(sequence, playhead);
            let position = target.playhead.load();
            self.mode = EngineMode::Timeline(target);
            self.transport = TransportState::default();
            self.transport.position = position;
            self.last_audio_frame = None;

            self.display_position(position);
            let rate = self.rate();
            self.session.anchor(position, rate);
            (self.callbacks.on_position_changed)(position);
            info!(sequence = %id, position = %position, "timeline mode entered");
        } else {
            if self.transport.is_playing() {
                self.stop();
            } else {
                self.generation += 1;
            }
            self.session.clear_sources();

            self.transport = TransportState::default();
            self.mode = match self.saved_source.take() {
                Some((target, position)) => {
                    self.transport.position = position;
                    EngineMode::Source(target)
                }
                None => EngineMode::Unloaded,
            };
            self.last_audio_frame = None;

            if let EngineMode::Source(target) = &self.mode {
                let rate = target.rate;
                let position = self.transport.position;
                source::display(position, rate, self.media.as_mut(), &mut self.callbacks);
                self.session.anchor(position, rate);
                (self.callbacks.on_position_changed)(position);
            }
            info!("timeline mode exited");
        }
    }

    /// Re-read the bound sequence from the store and recompute content
    /// bounds. Call after edits that change the sequence's extent; gaps
    /// seeked past the old end do not extend content on their own.
    pub fn refresh_content_bounds(&mut self) {
        if let EngineMode::Timeline(target) = &mut self.mode {
            if let Some(sequence) = self.store.sequence(&target.sequence_id) {
                target.refresh(sequence);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Normal playback: forward, speed 1. Boundaries stop outright.
    pub fn play(&mut self) {
        let _ = self.rate(); // loaded-content contract
        self.launch(1, ShuttleSpeed::X1, TransportMode::Play);
        debug!(position = %self.transport.position, "play");
    }

    /// Variable-speed shuttle with the unwind-then-reverse ladder.
    ///
    /// Same direction doubles the speed (capped at 8x). Opposite direction
    /// halves it until 1x, then stops rather than reversing directly. On a
    /// latched boundary: a request away from the edge resumes at 1x from
    /// the audio device's last reported time; a request into the edge is a
    /// no-op.
    pub fn shuttle(&mut self, direction: i32) {
        assert!(
            direction == 1 || direction == -1,
            "shuttle direction must be +1 or -1"
        );
        let rate = self.rate();

        if let Latch::Latched(boundary) = self.transport.latch {
            let away = matches!(
                (boundary, direction),
                (Boundary::End, -1) | (Boundary::Start, 1)
            );
            if !away {
                debug!(?boundary, direction, "shuttle into latched boundary ignored");
                return;
            }
            let resume = self
                .session
                .reported_frame(rate)
                .unwrap_or(self.transport.position);
            let moved = resume != self.transport.position;
            self.transport.position = resume;
            self.launch(direction, ShuttleSpeed::X1, TransportMode::Shuttle);
            if moved {
                (self.callbacks.on_position_changed)(resume);
            }
            debug!(direction, position = %resume, "latch released");
            return;
        }

        if !self.transport.is_playing() {
            self.launch(direction, ShuttleSpeed::X1, TransportMode::Shuttle);
            debug!(direction, "shuttle started");
            return;
        }

        if self.transport.direction == direction {
            self.transport.speed = self.transport.speed.doubled();
            self.transport.mode = TransportMode::Shuttle;
            if direction > 0 {
                self.session.set_speed(self.transport.speed.as_f64());
            }
            debug!(speed = %self.transport.speed, "shuttle speed up");
        } else if self.transport.speed > ShuttleSpeed::X1 {
            self.transport.speed = self.transport.speed.halved();
            self.transport.mode = TransportMode::Shuttle;
            if self.transport.direction > 0 {
                self.session.set_speed(self.transport.speed.as_f64());
            }
            debug!(speed = %self.transport.speed, "shuttle unwinding");
        } else {
            // Unwound to 1x: an opposing request stops, never reverses.
            self.stop();
        }
    }

    /// Slow motion: forces half speed in shuttle mode.
    pub fn slow_play(&mut self, direction: i32) {
        assert!(
            direction == 1 || direction == -1,
            "slow_play direction must be +1 or -1"
        );
        let rate = self.rate();

        if let Latch::Latched(boundary) = self.transport.latch {
            let away = matches!(
                (boundary, direction),
                (Boundary::End, -1) | (Boundary::Start, 1)
            );
            if !away {
                debug!(?boundary, direction, "slow_play into latched boundary ignored");
                return;
            }
            let resume = self
                .session
                .reported_frame(rate)
                .unwrap_or(self.transport.position);
            let moved = resume != self.transport.position;
            self.transport.position = resume;
            self.launch(direction, ShuttleSpeed::Half, TransportMode::Shuttle);
            if moved {
                (self.callbacks.on_position_changed)(resume);
            }
            return;
        }

        self.launch(direction, ShuttleSpeed::Half, TransportMode::Shuttle);
        debug!(direction, "slow play");
    }

    /// Full stop: resets every transport scalar, releases the audio device
    /// from playback, and supersedes any armed timer callback.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.transport.halt();
        self.session.stop();
        self.last_audio_frame = None;
        debug!(position = %self.transport.position, "transport stopped");
    }

    /// Move the playhead. Unclamped: off-content positions are allowed and
    /// display as gap. A no-op when already at rest on the requested frame.
    pub fn seek(&mut self, frame: FrameNumber) {
        let rate = self.rate();
        if self.transport.at_rest() && self.transport.position == frame {
            trace!(frame = %frame, "seek to current resting position ignored");
            return;
        }

        self.transport.position = frame;
        self.transport.latch = Latch::Unlatched;
        self.last_audio_frame = None;

        self.display_position(frame);
        self.session.anchor(frame, rate);
        self.media
            .set_playhead(frame, self.transport.direction, self.transport.speed.as_f64());
        (self.callbacks.on_position_changed)(frame);
        trace!(frame = %frame, "seek");
    }

    /// Audible single-frame jog: play a short burst of the audio under the
    /// frame without starting the transport.
    pub fn play_frame_audio(&mut self, frame: FrameNumber) {
        let rate = self.rate();
        if let EngineMode::Timeline(target) = &self.mode {
            target.sync_audio(frame, &mut self.session);
        }
        self.session
            .play_burst(frame, rate, self.config.audio_burst_frames);
        trace!(frame = %frame, "frame audio burst");
    }

    // -----------------------------------------------------------------------
    // Tick loop
    // -----------------------------------------------------------------------

    /// Timer callback entry point. `generation` is the value captured when
    /// the callback was armed; a mismatch means the transport was stopped
    /// or restarted since, and the callback must do nothing.
    pub fn on_tick(&mut self, generation: u64) {
        if generation != self.generation {
            trace!(
                generation,
                current = self.generation,
                "stale tick callback discarded"
            );
            return;
        }
        if !self.transport.is_playing() {
            return;
        }

        let snapshot = TickSnapshot {
            generation,
            position: self.transport.position,
            direction: self.transport.direction,
            speed: self.transport.speed,
            mode: self.transport.mode,
            latch: self.transport.latch,
            rate: self.rate(),
            bounds: self.bounds(),
            last_audio_frame: self.last_audio_frame,
        };

        let result = match &mut self.mode {
            EngineMode::Source(_) => source::tick(
                &snapshot,
                &mut self.session,
                self.media.as_mut(),
                &mut self.callbacks,
            ),
            EngineMode::Timeline(target) => timeline::tick(
                &snapshot,
                target,
                &self.config,
                &mut self.session,
                self.media.as_mut(),
                &mut self.callbacks,
            ),
            EngineMode::Unloaded => unreachable!("tick while no source is loaded"),
        };

        self.commit(result);
    }

    /// Commit a tick result: position, latch, stuckness memory, and the
    /// continuation decision. This is the only place mode results become
    /// canonical state.
    fn commit(&mut self, result: TickResult) {
        let moved = result.position != self.transport.position;
        self.transport.position = result.position;
        self.transport.latch = result.latch;
        self.last_audio_frame = result.audio_frame;
        if moved {
            (self.callbacks.on_position_changed)(result.position);
        }

        if result.continue_running {
            self.arm_tick();
        } else {
            self.transport.halt();
            self.session.stop();
            self.last_audio_frame = None;
        }
        debug_assert!(
            self.transport.invariants_ok(),
            "transport invariants violated after commit"
        );
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn rate(&self) -> Rational {
        match &self.mode {
            EngineMode::Source(target) => target.rate,
            EngineMode::Timeline(target) => target.sequence.rate,
            EngineMode::Unloaded => {
                panic!("transport operation before a source or sequence is loaded")
            }
        }
    }

    fn bounds(&self) -> ContentBounds {
        match &self.mode {
            EngineMode::Source(target) => ContentBounds::new(target.total_frames, target.rate),
            EngineMode::Timeline(target) => target.bounds,
            EngineMode::Unloaded => {
                panic!("transport operation before a source or sequence is loaded")
            }
        }
    }

    /// Put the transport in motion and arm the first tick. Forward motion
    /// anchors and starts audio; reverse stops it (the device cannot render
    /// reversed audio, so the accumulation fallback carries the video).
    fn launch(&mut self, direction: i32, speed: ShuttleSpeed, mode: TransportMode) {
        self.transport.begin(direction, speed, mode);
        let position = self.transport.position;

        if direction > 0 {
            if let EngineMode::Timeline(target) = &self.mode {
                target.sync_audio(position, &mut self.session);
            }
            let rate = self.rate();
            self.session.anchor(position, rate);
            self.session.start(speed.as_f64());
        } else {
            self.session.stop();
        }

        self.generation += 1; // supersede any pending callback
        self.last_audio_frame = None;
        self.arm_tick();
    }

    fn arm_tick(&mut self) {
        let after = tick_interval(self.rate(), self.transport.speed, self.config.tick_floor_ms);
        self.scheduler.arm(after, self.generation);
    }

    /// Present the frame at `position` through the active mode path.
    fn display_position(&mut self, position: FrameNumber) {
        match &mut self.mode {
            EngineMode::Source(target) => {
                source::display(position, target.rate, self.media.as_mut(), &mut self.callbacks);
            }
            EngineMode::Timeline(target) => {
                target.display(position, &self.config, self.media.as_mut(), &mut self.callbacks);
                target.sync_audio(position, &mut self.session);
                target.playhead.store(position);
            }
            EngineMode::Unloaded => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioDeviceError, AudioSourceSpec, MixState};
    use crate::sink::VideoFrameResult;
    use kino_common::{TimeUs, TrackId};
    use kino_timeline::MemorySequenceStore;
    use parking_lot::Mutex;

    struct NullDevice;
    impl AudioDevice for NullDevice {
        fn is_ready(&self) -> bool {
            false
        }
        fn seek(&mut self, _us: TimeUs) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn start(&mut self) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn stop(&mut self) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn set_speed(&mut self, _speed: f64) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn time_us(&self) -> Result<TimeUs, AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn latch(&mut self, _us: TimeUs) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn play_burst(&mut self, _us: TimeUs, _duration_us: i64) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn set_sources(&mut self, _sources: &[AudioSourceSpec]) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
        fn apply_mix(&mut self, _mix: &MixState) -> Result<(), AudioDeviceError> {
            Err(AudioDeviceError::NotReady)
        }
    }

    struct NullBuffer;
    impl MediaBuffer for NullBuffer {
        fn get_video_frame(&mut self, _track: TrackId, _frame: FrameNumber) -> VideoFrameResult {
            VideoFrameResult::gap()
        }
        fn set_track_clips(&mut self, _track: TrackId, _clips: Vec<kino_timeline::Clip>) {}
        fn set_playhead(&mut self, _frame: FrameNumber, _direction: i32, _speed: f64) {}
    }

    #[derive(Default)]
    struct ArmLog(Vec<u64>);

    struct RecordingScheduler(Arc<Mutex<ArmLog>>);
    impl TickScheduler for RecordingScheduler {
        fn arm(&mut self, _after: std::time::Duration, generation: u64) {
            self.0.lock().0.push(generation);
        }
    }

    fn engine() -> (PlaybackEngine, Arc<Mutex<ArmLog>>) {
        let arms = Arc::new(Mutex::new(ArmLog::default()));
        let engine = PlaybackEngine::new(
            PlaybackConfig::default(),
            Arc::new(MemorySequenceStore::new()),
            Box::new(NullDevice),
            Arc::new(AudioArbiter::new()),
            Box::new(NullBuffer),
            Box::new(RecordingScheduler(Arc::clone(&arms))),
            PlaybackCallbacks::noop(),
        );
        (engine, arms)
    }

    #[test]
    fn new_engine_is_stopped_at_zero() {
        let (engine, _) = engine();
        assert!(!engine.is_playing());
        assert_eq!(engine.get_position(), FrameNumber::ZERO);
        let status = engine.get_status();
        assert_eq!(status.play_state, PlayState::Stopped);
        assert_eq!(status.direction, 0);
        assert!(!status.latched);
    }

    #[test]
    #[should_panic(expected = "before a source or sequence is loaded")]
    fn play_without_content_is_a_contract_violation() {
        let (mut engine, _) = engine();
        engine.play();
    }

    #[test]
    #[should_panic(expected = "shuttle direction")]
    fn invalid_shuttle_direction_is_a_contract_violation() {
        let (mut engine, _) = engine();
        engine.set_source(10, Rational::FPS_24);
        engine.shuttle(2);
    }

    #[test]
    fn play_arms_tick_with_current_generation() {
        let (mut engine, arms) = engine();
        engine.set_source(100, Rational::FPS_24);
        engine.play();
        assert!(engine.is_playing());

        let armed = arms.lock().0.clone();
        let latest = *armed.last().unwrap();
        // Ticking with the armed generation works...
        engine.on_tick(latest);
        assert_eq!(engine.get_position(), FrameNumber(1));
        // ...and with a stale one does nothing
        engine.on_tick(latest.wrapping_sub(1));
        assert_eq!(engine.get_position(), FrameNumber(1));
    }

    #[test]
    fn stop_invalidates_pending_tick() {
        let (mut engine, arms) = engine();
        engine.set_source(100, Rational::FPS_24);
        engine.play();
        let pending = *arms.lock().0.last().unwrap();

        engine.stop();
        engine.on_tick(pending);
        // The pending callback was stale; nothing moved
        assert_eq!(engine.get_position(), FrameNumber::ZERO);
        assert!(!engine.is_playing());
    }

    #[test]
    fn audio_failures_never_break_the_video_loop() {
        // NullDevice fails every call; playback must still advance.
        let (mut engine, arms) = engine();
        engine.set_source(100, Rational::FPS_24);
        assert!(engine.activate_audio());
        engine.play();
        for _ in 0..4 {
            let generation = *arms.lock().0.last().unwrap();
            engine.on_tick(generation);
        }
        assert_eq!(engine.get_position(), FrameNumber(4));
    }

    #[test]
    fn status_reflects_shuttle_ladder() {
        let (mut engine, _) = engine();
        engine.set_source(1000, Rational::FPS_24);
        engine.shuttle(1);
        engine.shuttle(1);
        let status = engine.get_status();
        assert_eq!(status.speed, 2.0);
        assert_eq!(status.direction, 1);
        assert_eq!(status.mode, TransportMode::Shuttle);
    }
}
