//! vibe-daemon: AI music generation and playback daemon.
//!
//! Generates music through external text-to-audio providers (Stable
//! Audio, Udio via PiAPI) and plays the results locally, controlled
//! over newline-delimited JSON-RPC 2.0 on stdin/stdout.
//!
//! # Modules
//!
//! - [`types`]: Core data types (GenerationRequest, AudioAsset, PlaybackSession)
//! - [`config`]: Runtime configuration (DaemonConfig)
//! - [`error`]: Error types and codes (DaemonError, ErrorCode)
//! - [`providers`]: Provider clients and registry
//! - [`generation`]: The generate pipeline over the registry
//! - [`playback`]: Local audio playback engine
//! - [`prompt`]: Code-to-prompt analysis
//! - [`rpc`]: The JSON-RPC server
//!
//! # Example
//!
//! ```rust,ignore
//! use vibe_daemon::{
//!     config::DaemonConfig,
//!     types::{GenerationOptions, GenerationRequest},
//! };
//!
//! let config = DaemonConfig::from_env();
//! let request = GenerationRequest {
//!     prompt: "lofi hip hop beats to relax to".to_string(),
//!     options: GenerationOptions {
//!         duration_sec: 60.0,
//!         ..Default::default()
//!     },
//! };
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod playback;
pub mod prompt;
pub mod providers;
pub mod rpc;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::DaemonConfig;
pub use error::{DaemonError, ErrorCode, Result};
pub use types::{
    compute_asset_id, AudioAsset, GenerationMode, GenerationOptions, GenerationRequest,
    OutputFormat, PlaybackSession, PlaybackState,
};
