//! JSON-RPC types for the daemon protocol.
//!
//! Wire types for requests, responses, error objects, and the playback
//! notification payloads pushed to the client.

use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, ErrorCode};
use crate::types::{AudioAsset, EndReason};

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Integer(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

/// A JSON-RPC request wrapper.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub id: RequestId,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC response wrapper.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: T,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(id: RequestId, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// A JSON-RPC error response.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonRpcErrorData>,
}

/// Extended error data for application-specific errors.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorData {
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_hint: Option<String>,
}

impl JsonRpcError {
    /// Creates a parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an invalid request error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a method not found error (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }

    /// Creates an invalid params error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an internal error (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }
}

/// Maps an application error code to its JSON-RPC code.
fn rpc_code(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ProviderNotFound => -32000,
        ErrorCode::ProviderRequestFailed => -32001,
        ErrorCode::PlaybackFailed => -32002,
        ErrorCode::MissingApiKey => -32003,
        ErrorCode::InvalidDuration => -32005,
        ErrorCode::InvalidPrompt => -32006,
    }
}

impl From<DaemonError> for JsonRpcError {
    fn from(err: DaemonError) -> Self {
        Self {
            code: rpc_code(err.code),
            message: err.code.description().to_string(),
            data: Some(JsonRpcErrorData {
                error_code: err.code.as_str().to_string(),
                details: Some(err.message),
                recovery_hint: Some(err.code.recovery_hint().to_string()),
            }),
        }
    }
}

// ============================================================================
// Generate Request/Response
// ============================================================================

/// Parameters for a generate request.
///
/// Either `prompt` or `code` must be present; when only `code` is given
/// the daemon builds a prompt from the snippet's apparent language and
/// complexity.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateParams {
    /// Provider to use; falls back to the configured default.
    pub provider: Option<String>,

    /// Text description of desired music.
    pub prompt: Option<String>,

    /// Source code snippet to derive a prompt from.
    pub code: Option<String>,

    /// Genre override when building a prompt from code.
    pub genre: Option<String>,

    /// Language hint when building a prompt from code.
    pub language: Option<String>,

    /// Duration of audio to generate in seconds.
    pub duration_sec: Option<f32>,

    /// Diffusion steps (Stable Audio only).
    pub steps: Option<u32>,

    /// Output format: "mp3" or "wav".
    pub output_format: Option<String>,

    /// Generation mode: "instrumental" or "lyrical".
    pub mode: Option<String>,
}

/// Response for a generate request.
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    /// Unique identifier for the generated asset.
    pub asset_id: String,

    /// Absolute path to the audio file on disk.
    pub path: String,

    /// Container format of the file.
    pub format: String,

    /// Requested duration in seconds.
    pub duration_sec: f32,

    /// Provider that produced the audio.
    pub provider: String,
}

impl From<AudioAsset> for GenerateResult {
    fn from(asset: AudioAsset) -> Self {
        Self {
            asset_id: asset.asset_id,
            path: asset.path.display().to_string(),
            format: asset.format.as_str().to_string(),
            duration_sec: asset.duration_sec,
            provider: asset.provider,
        }
    }
}

// ============================================================================
// Playback Request/Response
// ============================================================================

/// Parameters for a play request.
#[derive(Debug, Deserialize)]
pub struct PlayParams {
    /// Absolute path to the audio file to play.
    pub path: String,

    /// Playback volume, clamped to 0.0-1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Whether to ramp volume up from silence.
    #[serde(default)]
    pub fade_in: bool,
}

fn default_volume() -> f32 {
    1.0
}

/// Response for a play request.
#[derive(Debug, Serialize)]
pub struct PlayResult {
    pub session_id: u64,
    pub path: String,
    pub volume: f32,
    pub fade_in: bool,
}

/// Response for pause/resume/stop requests.
#[derive(Debug, Serialize)]
pub struct PlaybackStateResult {
    /// State after the transition.
    pub state: String,
}

// ============================================================================
// Introspection
// ============================================================================

/// A tool entry in a list_tools response.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ToolParam],
}

/// One parameter in a tool's schema.
#[derive(Debug, Serialize)]
pub struct ToolParam {
    pub name: &'static str,
    /// JSON type of the parameter value.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Response for a get_providers request.
#[derive(Debug, Serialize)]
pub struct GetProvidersResult {
    /// Names of providers with credentials configured, sorted.
    pub providers: Vec<String>,

    /// Provider used when a request names none.
    pub default_provider: String,
}

// ============================================================================
// Notifications
// ============================================================================

/// A JSON-RPC notification (no id field).
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<T: Serialize> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: T,
}

impl<T: Serialize> JsonRpcNotification<T> {
    pub fn new(method: &'static str, params: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        }
    }
}

/// Notification sent when a playback session starts.
#[derive(Debug, Serialize)]
pub struct PlaybackStartParams {
    pub session_id: u64,
    pub path: String,
    pub volume: f32,
    pub fade_in: bool,
}

/// Notification sent when a playback session ends.
#[derive(Debug, Serialize)]
pub struct PlaybackEndParams {
    pub session_id: u64,
    /// Why the session ended: completed, stopped, or interrupted.
    pub reason: EndReason,
}

/// Notification sent when playback fails mid-session.
#[derive(Debug, Serialize)]
pub struct PlaybackErrorParams {
    pub session_id: u64,
    pub message: String,
}
