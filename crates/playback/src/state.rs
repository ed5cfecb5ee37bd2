//! Transport state: play state, shuttle speed ladder, boundary latch.

use kino_common::FrameNumber;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the transport is running.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// How the transport was put in motion. Boundary behavior depends on it:
/// `Shuttle` latches at content edges, `Play` stops outright.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportMode {
    #[default]
    Idle,
    Shuttle,
    Play,
}

/// The shuttle speed ladder. Values are presentation-rate multipliers;
/// `Half` stretches the tick interval rather than stepping fractional
/// frames, so positions stay integral.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ShuttleSpeed {
    Half,
    #[default]
    X1,
    X2,
    X4,
    X8,
}

impl ShuttleSpeed {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Half => 0.5,
            Self::X1 => 1.0,
            Self::X2 => 2.0,
            Self::X4 => 4.0,
            Self::X8 => 8.0,
        }
    }

    /// Frames advanced per tick when falling back to frame accumulation.
    pub fn step_frames(self) -> i64 {
        match self {
            Self::Half | Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }

    /// Tick-interval stretch factor (slow motion ticks less often).
    pub fn slowdown_factor(self) -> i64 {
        match self {
            Self::Half => 2,
            _ => 1,
        }
    }

    /// One rung up the ladder, capped at 8x.
    pub fn doubled(self) -> Self {
        match self {
            Self::Half => Self::X1,
            Self::X1 => Self::X2,
            Self::X2 => Self::X4,
            Self::X4 | Self::X8 => Self::X8,
        }
    }

    /// One rung down the ladder, floored at 1x. The unwind logic stops the
    /// transport instead of halving below 1x.
    pub fn halved(self) -> Self {
        match self {
            Self::X8 => Self::X4,
            Self::X4 => Self::X2,
            Self::X2 | Self::X1 => Self::X1,
            Self::Half => Self::Half,
        }
    }
}

impl fmt::Display for ShuttleSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f64())
    }
}

/// Which content edge a latch is pinned to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    Start,
    End,
}

/// Boundary latch: a frozen-at-the-edge state distinct from a full stop.
/// Only reachable in shuttle mode; released by reversing direction, or by
/// seek/stop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Latch {
    #[default]
    Unlatched,
    Latched(Boundary),
}

impl Latch {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Latched(_))
    }

    pub fn boundary(self) -> Option<Boundary> {
        match self {
            Self::Latched(b) => Some(b),
            Self::Unlatched => None,
        }
    }
}

/// Canonical transport state owned by the coordinator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    pub play_state: PlayState,
    /// -1, 0, or 1. Zero exactly when stopped.
    pub direction: i32,
    pub speed: ShuttleSpeed,
    pub mode: TransportMode,
    pub position: FrameNumber,
    pub latch: Latch,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    /// Fully at rest: stopped and not pinned at a boundary.
    pub fn at_rest(&self) -> bool {
        self.play_state == PlayState::Stopped && !self.latch.is_active()
    }

    /// Put the transport in motion.
    pub fn begin(&mut self, direction: i32, speed: ShuttleSpeed, mode: TransportMode) {
        debug_assert!(direction == 1 || direction == -1);
        self.play_state = PlayState::Playing;
        self.direction = direction;
        self.speed = speed;
        self.mode = mode;
        self.latch = Latch::Unlatched;
    }

    /// Reset every transport scalar; the position is kept.
    pub fn halt(&mut self) {
        self.play_state = PlayState::Stopped;
        self.direction = 0;
        self.speed = ShuttleSpeed::X1;
        self.mode = TransportMode::Idle;
        self.latch = Latch::Unlatched;
    }

    /// Structural invariants: direction is zero exactly when stopped, and
    /// a latch can only exist in shuttle mode.
    pub fn invariants_ok(&self) -> bool {
        let dir_matches = (self.direction == 0) == (self.play_state == PlayState::Stopped);
        let latch_ok = !self.latch.is_active() || self.mode == TransportMode::Shuttle;
        dir_matches && latch_ok
    }
}
