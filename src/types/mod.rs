//! Core types for the vibe-daemon.
//!
//! This module re-exports all the core data types used throughout the daemon:
//! - [`GenerationRequest`]: A request for music generation
//! - [`AudioAsset`]: A successfully generated audio file on disk
//! - [`PlaybackSession`]: One playback attempt and its state machine state

mod asset;
mod session;

// Re-export all types at the module level
pub use asset::{
    compute_asset_id, AudioAsset, GenerationMode, GenerationOptions, GenerationRequest,
    OutputFormat, DEFAULT_DURATION_SEC, DEFAULT_STEPS, MAX_PROMPT_LEN,
};
pub use session::{EndReason, PlaybackSession, PlaybackState};
