//! JSON-RPC module for daemon communication.
//!
//! Provides the JSON-RPC 2.0 server implementation for:
//! - `list_tools`: Enumerate available methods
//! - `generate`: Generate music via a provider
//! - `play` / `pause` / `resume` / `stop`: Local playback control
//! - `get_providers`: List configured providers
//! - `ping`: Health check
//! - `shutdown`: Graceful shutdown
//!
//! Notifications:
//! - `playback_start`: A playback session started
//! - `playback_end`: A session ended (completed, stopped, or interrupted)
//! - `playback_error`: A session failed

pub mod methods;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use server::{run_server, ServerState};
pub use types::{
    GenerateParams, GenerateResult, GetProvidersResult, JsonRpcError, JsonRpcErrorResponse,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, PlayParams, PlayResult,
    PlaybackEndParams, PlaybackErrorParams, PlaybackStartParams, RequestId,
};
