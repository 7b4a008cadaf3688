//! JSON-RPC method handlers.
//!
//! Implements the handlers for all supported JSON-RPC methods.

use std::path::Path;

use crate::prompt;
use crate::types::{GenerationMode, GenerationOptions, GenerationRequest, OutputFormat};

use super::server::ServerState;
use super::types::{
    GenerateParams, GenerateResult, GetProvidersResult, JsonRpcError, PlayParams,
    PlayResult, PlaybackStateResult, ToolInfo, ToolParam,
};

/// Tools exposed through list_tools, one per method a client can call.
const TOOLS: &[ToolInfo] = &[
    ToolInfo {
        name: "generate",
        description: "Generate music from a prompt or a source code snippet",
        params: &[
            ToolParam {
                name: "prompt",
                kind: "string",
                required: false,
                description: "Text description of the music to generate",
            },
            ToolParam {
                name: "code",
                kind: "string",
                required: false,
                description: "Source code snippet to derive a prompt from (used when prompt is absent)",
            },
            ToolParam {
                name: "provider",
                kind: "string",
                required: false,
                description: "Provider name; defaults to the configured default provider",
            },
            ToolParam {
                name: "genre",
                kind: "string",
                required: false,
                description: "Genre override for code-derived prompts",
            },
            ToolParam {
                name: "language",
                kind: "string",
                required: false,
                description: "Language override for code-derived prompts",
            },
            ToolParam {
                name: "duration_sec",
                kind: "number",
                required: false,
                description: "Track length in seconds",
            },
            ToolParam {
                name: "steps",
                kind: "number",
                required: false,
                description: "Diffusion steps, where the provider supports them",
            },
            ToolParam {
                name: "output_format",
                kind: "string",
                required: false,
                description: "mp3 or wav",
            },
            ToolParam {
                name: "mode",
                kind: "string",
                required: false,
                description: "instrumental or lyrical",
            },
        ],
    },
    ToolInfo {
        name: "play",
        description: "Play an audio file, interrupting any current playback",
        params: &[
            ToolParam {
                name: "path",
                kind: "string",
                required: true,
                description: "Path of the audio file to play",
            },
            ToolParam {
                name: "volume",
                kind: "number",
                required: false,
                description: "Playback volume between 0.0 and 1.0",
            },
            ToolParam {
                name: "fade_in",
                kind: "boolean",
                required: false,
                description: "Ramp volume up over the configured fade window",
            },
        ],
    },
    ToolInfo {
        name: "pause",
        description: "Pause the current playback session",
        params: &[],
    },
    ToolInfo {
        name: "resume",
        description: "Resume a paused playback session",
        params: &[],
    },
    ToolInfo {
        name: "stop",
        description: "Stop playback and release the audio device",
        params: &[],
    },
    ToolInfo {
        name: "get_providers",
        description: "List configured generation providers",
        params: &[],
    },
    ToolInfo {
        name: "ping",
        description: "Health check",
        params: &[],
    },
    ToolInfo {
        name: "shutdown",
        description: "Shut down the daemon",
        params: &[],
    },
];

/// Handles a JSON-RPC method call.
pub async fn handle_request(
    method: &str,
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "list_tools" => handle_list_tools(),
        "generate" => handle_generate(params, state).await,
        "play" => handle_play(params, state),
        "pause" => handle_pause(state),
        "resume" => handle_resume(state),
        "stop" => handle_stop(state),
        "get_providers" => handle_get_providers(state),
        "ping" => handle_ping(),
        "shutdown" => handle_shutdown(state),
        _ => Err(JsonRpcError::method_not_found(method)),
    }
}

/// Handles the list_tools method.
fn handle_list_tools() -> Result<serde_json::Value, JsonRpcError> {
    Ok(serde_json::json!({ "tools": TOOLS }))
}

/// Handles the ping method for health checks.
fn handle_ping() -> Result<serde_json::Value, JsonRpcError> {
    Ok(serde_json::json!({ "status": "ok" }))
}

/// Handles the shutdown method.
fn handle_shutdown(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    state.engine().stop();
    state.shutdown();
    Ok(serde_json::json!({ "status": "shutting_down" }))
}

/// Handles the generate method.
///
/// Builds a [`GenerationRequest`] from the params, deriving the prompt
/// from the code snippet when no literal prompt is given, and runs it
/// through the generation service. The call holds no locks, so playback
/// control stays responsive while a provider request is in flight.
async fn handle_generate(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: GenerateParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

    let provider = params
        .provider
        .clone()
        .unwrap_or_else(|| state.config.default_provider.clone());

    let request = build_request(&params)?;

    let asset = state
        .generation
        .generate(&provider, &request)
        .await
        .map_err(JsonRpcError::from)?;

    Ok(serde_json::to_value(GenerateResult::from(asset)).unwrap_or_default())
}

/// Builds a generation request from RPC params.
fn build_request(params: &GenerateParams) -> Result<GenerationRequest, JsonRpcError> {
    let prompt = match (&params.prompt, &params.code) {
        (Some(prompt), _) if !prompt.is_empty() => prompt.clone(),
        (_, Some(code)) => prompt::build_prompt(
            code,
            params.genre.as_deref(),
            params.language.as_deref(),
        ),
        _ => {
            return Err(JsonRpcError::from(crate::error::DaemonError::empty_prompt()));
        }
    };

    let output_format = match &params.output_format {
        Some(s) => Some(OutputFormat::parse(s).ok_or_else(|| {
            JsonRpcError::invalid_params(format!("Unknown output format: {}", s))
        })?),
        None => None,
    };

    let mode = match params.mode.as_deref() {
        None | Some("instrumental") => GenerationMode::Instrumental,
        Some("lyrical") => GenerationMode::Lyrical,
        Some(other) => {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown mode: {} (expected instrumental or lyrical)",
                other
            )));
        }
    };

    let defaults = GenerationOptions::default();
    Ok(GenerationRequest {
        prompt,
        options: GenerationOptions {
            duration_sec: params.duration_sec.unwrap_or(defaults.duration_sec),
            steps: params.steps.unwrap_or(defaults.steps),
            output_format,
            mode,
            code: params.code.clone(),
        },
    })
}

/// Handles the play method.
///
/// Starts the session and spawns a monitor task that feeds the natural
/// end of the output back into the engine, which pushes the playback_end
/// notification.
fn handle_play(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: PlayParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

    let handle = state
        .engine()
        .play(Path::new(&params.path), params.volume, params.fade_in)
        .map_err(JsonRpcError::from)?;

    let session_id = handle.session_id;
    let monitor_state = state.clone();
    tokio::spawn(async move {
        match handle.finished.await {
            Ok(Ok(())) => monitor_state.engine().finish_session(session_id),
            Ok(Err(message)) => monitor_state.engine().fail_session(session_id, &message),
            // Sender dropped without reporting: the output was torn down
            Err(_) => monitor_state
                .engine()
                .fail_session(session_id, "audio output ended unexpectedly"),
        }
    });

    Ok(serde_json::to_value(PlayResult {
        session_id,
        path: params.path,
        volume: params.volume.clamp(0.0, 1.0),
        fade_in: params.fade_in,
    })
    .unwrap_or_default())
}

/// Handles the pause method.
fn handle_pause(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    state.engine().pause().map_err(JsonRpcError::from)?;
    Ok(serde_json::to_value(PlaybackStateResult {
        state: "paused".to_string(),
    })
    .unwrap_or_default())
}

/// Handles the resume method.
fn handle_resume(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    state.engine().resume().map_err(JsonRpcError::from)?;
    Ok(serde_json::to_value(PlaybackStateResult {
        state: "playing".to_string(),
    })
    .unwrap_or_default())
}

/// Handles the stop method.
fn handle_stop(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    state.engine().stop();
    Ok(serde_json::to_value(PlaybackStateResult {
        state: "idle".to_string(),
    })
    .unwrap_or_default())
}

/// Handles the get_providers method.
fn handle_get_providers(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    let result = GetProvidersResult {
        providers: state
            .generation
            .registry()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        default_provider: state.config.default_provider.clone(),
    };
    Ok(serde_json::to_value(result).unwrap_or_default())
}
