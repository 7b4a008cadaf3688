//! Playback session types.
//!
//! A PlaybackSession tracks one playback attempt through the engine's
//! state machine. At most one non-terminal session exists per engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Playback state machine states.
///
/// Transitions: Idle → Loading → Playing ⇄ Paused → Stopped/Ended → Idle.
/// Error is reachable from Loading, Playing, and Paused. Stopped, Ended,
/// and Error are momentary: the engine emits the terminal event and resets
/// to Idle immediately, so a subsequent play() is always possible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Initial and resting state; no device resources held.
    #[default]
    Idle,
    /// Asset file being opened and device acquired.
    Loading,
    /// Audio flowing to the device.
    Playing,
    /// Device held, output suspended.
    Paused,
    /// Explicitly stopped by the caller.
    Stopped,
    /// Reached the natural end of the asset.
    Ended,
    /// Device or decode failure.
    Error,
}

impl PlaybackState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Ended => "ended",
            PlaybackState::Error => "error",
        }
    }

    /// Returns true for states that hold device resources.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Paused
        )
    }
}

/// Why a session ended.
///
/// Callers cannot otherwise distinguish a natural end from an explicit
/// stop; both emit the same playback_end notification with this reason
/// attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// Playback reached the natural end of the asset.
    Completed,
    /// The caller stopped playback explicitly.
    Stopped,
    /// A new play() interrupted this session.
    Interrupted,
}

impl EndReason {
    /// Returns the string representation of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::Stopped => "stopped",
            EndReason::Interrupted => "interrupted",
        }
    }
}

/// One active or recently-active playback attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSession {
    /// Monotonically increasing session identifier.
    pub session_id: u64,

    /// Path of the asset being played.
    pub path: PathBuf,

    /// Output gain scalar, clamped to [0, 1].
    pub volume: f32,

    /// Whether gain ramps up from 0 instead of jumping to `volume`.
    pub fade_in: bool,

    /// Current state machine state.
    pub state: PlaybackState,

    /// When the session was started.
    #[serde(skip)]
    pub started_at: Option<SystemTime>,
}

impl PlaybackSession {
    /// Creates a new session in the Loading state.
    pub fn new(session_id: u64, path: PathBuf, volume: f32, fade_in: bool) -> Self {
        Self {
            session_id,
            path,
            volume: volume.clamp(0.0, 1.0),
            fade_in,
            state: PlaybackState::Loading,
            started_at: Some(SystemTime::now()),
        }
    }
}
