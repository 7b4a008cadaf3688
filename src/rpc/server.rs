//! JSON-RPC server over stdin/stdout.
//!
//! Reads newline-delimited JSON-RPC 2.0 requests from stdin and writes
//! responses and notifications to stdout. All stdout writes go through
//! a single writer task so concurrent handlers never interleave lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

use crate::config::DaemonConfig;
use crate::error::Result;
use crate::generation::GenerationService;
use crate::playback::{PlaybackEngine, PlaybackEvent};

use super::methods::handle_request;
use super::types::{
    JsonRpcError, JsonRpcErrorResponse, JsonRpcNotification, JsonRpcRequest, PlaybackEndParams,
    PlaybackErrorParams, PlaybackStartParams,
};

/// State shared across all request handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Generation pipeline over the provider registry.
    pub generation: Arc<GenerationService>,
    /// Playback engine; locked only for the duration of a call, never
    /// across an await.
    pub playback: Arc<Mutex<PlaybackEngine>>,
    /// Daemon configuration.
    pub config: Arc<DaemonConfig>,
    /// Serialized lines bound for stdout.
    outgoing: UnboundedSender<String>,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl ServerState {
    /// Creates new server state.
    pub fn new(
        generation: GenerationService,
        playback: PlaybackEngine,
        config: DaemonConfig,
        outgoing: UnboundedSender<String>,
    ) -> Self {
        Self {
            generation: Arc::new(generation),
            playback: Arc::new(Mutex::new(playback)),
            config: Arc::new(config),
            outgoing,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Locks the playback engine, recovering from a poisoned lock.
    pub fn engine(&self) -> MutexGuard<'_, PlaybackEngine> {
        self.playback.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a serialized line for stdout.
    pub fn send_line(&self, line: String) {
        self.outgoing.send(line).ok();
    }

    /// Queues a JSON-RPC notification for stdout.
    pub fn notify<T: Serialize>(&self, method: &'static str, params: T) {
        if let Some(line) = notification_line(method, params) {
            self.send_line(line);
        }
    }

    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }

    /// Returns true if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Runs the JSON-RPC server until stdin closes or shutdown is requested.
///
/// `outgoing_rx` is the receive side of the state's outgoing channel;
/// `events` carries playback lifecycle events from the engine.
pub async fn run_server(
    state: ServerState,
    mut outgoing_rx: UnboundedReceiver<String>,
    events: UnboundedReceiver<PlaybackEvent>,
) -> Result<()> {
    // Single stdout writer; handlers and notifications share the channel
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = outgoing_rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            stdout.flush().await.ok();
        }
    });

    tokio::spawn(forward_playback_events(state.outgoing.clone(), events));

    eprintln!("JSON-RPC server started, waiting for requests...");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let shutdown_notify = state.shutdown_notify.clone();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown_notify.notified() => break,
        };

        let line = match line {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        // Handlers run concurrently; a slow generate call must not block
        // playback control requests behind it
        let handler_state = state.clone();
        tokio::spawn(async move {
            if let Some(response) = process_request(&line, &handler_state).await {
                handler_state.send_line(response);
            }
        });

        if state.is_shutdown() {
            eprintln!("Server shutdown requested");
            break;
        }
    }

    // Drop our state so the writer's channel can close, then give it a
    // bounded window to flush any queued responses
    drop(state);
    tokio::time::timeout(std::time::Duration::from_secs(1), writer)
        .await
        .ok();

    eprintln!("JSON-RPC server stopped");
    Ok(())
}

/// Forwards playback engine events to the client as notifications.
async fn forward_playback_events(
    outgoing: UnboundedSender<String>,
    mut events: UnboundedReceiver<PlaybackEvent>,
) {
    while let Some(event) = events.recv().await {
        let line = match event {
            PlaybackEvent::Started {
                session_id,
                path,
                volume,
                fade_in,
            } => notification_line(
                "playback_start",
                PlaybackStartParams {
                    session_id,
                    path: path.display().to_string(),
                    volume,
                    fade_in,
                },
            ),
            PlaybackEvent::Ended { session_id, reason } => {
                notification_line("playback_end", PlaybackEndParams { session_id, reason })
            }
            PlaybackEvent::Error {
                session_id,
                message,
            } => notification_line(
                "playback_error",
                PlaybackErrorParams {
                    session_id,
                    message,
                },
            ),
        };
        if let Some(line) = line {
            if outgoing.send(line).is_err() {
                break;
            }
        }
    }
}

/// Serializes a notification to a wire line.
fn notification_line<T: Serialize>(method: &'static str, params: T) -> Option<String> {
    serde_json::to_string(&JsonRpcNotification::new(method, params)).ok()
}

/// Processes a single JSON-RPC request line.
pub(crate) async fn process_request(line: &str, state: &ServerState) -> Option<String> {
    // Parse JSON
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            let error = JsonRpcErrorResponse::new(
                None,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            );
            return Some(serde_json::to_string(&error).unwrap_or_default());
        }
    };

    // Well-formed JSON that is not a request shape (missing or malformed
    // id, missing method) is an invalid request, not a parse error
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            let error = JsonRpcErrorResponse::new(
                None,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            );
            return Some(serde_json::to_string(&error).unwrap_or_default());
        }
    };

    // Validate JSON-RPC version
    if request.jsonrpc != "2.0" {
        let error = JsonRpcErrorResponse::new(
            Some(request.id),
            JsonRpcError::invalid_request("Invalid JSON-RPC version (expected 2.0)"),
        );
        return Some(serde_json::to_string(&error).unwrap_or_default());
    }

    // Handle the request
    let result = handle_request(&request.method, request.params, state).await;

    match result {
        Ok(response) => Some(
            serde_json::to_string(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": response
            }))
            .unwrap_or_default(),
        ),
        Err(error) => Some(
            serde_json::to_string(&JsonRpcErrorResponse::new(Some(request.id), error))
                .unwrap_or_default(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::output::{AudioOutput, FinishedRx, OutputFactory};
    use crate::providers::ProviderRegistry;
    use std::path::Path;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    struct NullOutput;

    impl AudioOutput for NullOutput {
        fn start(
            &mut self,
            _path: &Path,
            _volume: f32,
            _fade: Option<Duration>,
        ) -> Result<FinishedRx> {
            let (tx, rx) = tokio::sync::oneshot::channel();
            std::mem::forget(tx);
            Ok(rx)
        }
        fn pause(&mut self) {}
        fn resume(&mut self) {}
        fn stop(&mut self) {}
    }

    fn test_state() -> (ServerState, UnboundedReceiver<String>) {
        let generation = GenerationService::new(
            ProviderRegistry::new(),
            std::env::temp_dir().join("vibe-daemon-server-tests"),
        );
        let factory: OutputFactory = Box::new(|| Box::new(NullOutput));
        let (event_tx, _event_rx) = unbounded_channel();
        let playback = PlaybackEngine::new(factory, Duration::from_millis(1500), event_tx);
        let (out_tx, out_rx) = unbounded_channel();
        let state = ServerState::new(generation, playback, DaemonConfig::new(), out_tx);
        (state, out_rx)
    }

    #[test]
    fn server_state_shutdown() {
        let (state, _rx) = test_state();
        assert!(!state.is_shutdown());
        state.shutdown();
        assert!(state.is_shutdown());
    }

    #[tokio::test]
    async fn process_invalid_json() {
        let (state, _rx) = test_state();
        let response = process_request("not json", &state).await.unwrap();
        assert!(response.contains("-32700")); // Parse error
        // No id could be decoded
        assert!(response.contains(r#""id":null"#));

        // A failed request never takes the channel down
        let request = r#"{"jsonrpc":"2.0","method":"ping","id":2}"#;
        let response = process_request(request, &state).await.unwrap();
        assert!(response.contains(r#""result""#));
    }

    #[tokio::test]
    async fn process_malformed_request_shape() {
        let (state, _rx) = test_state();

        // Valid JSON lacking an id is an invalid request, not a parse error
        let response = process_request(r#"{"jsonrpc":"2.0","method":"ping"}"#, &state)
            .await
            .unwrap();
        assert!(response.contains("-32600"));
        assert!(response.contains(r#""id":null"#));

        // Same for an id of an unsupported type
        let response = process_request(r#"{"jsonrpc":"2.0","method":"ping","id":{}}"#, &state)
            .await
            .unwrap();
        assert!(response.contains("-32600"));
        assert!(response.contains(r#""id":null"#));
    }

    #[tokio::test]
    async fn process_invalid_version() {
        let (state, _rx) = test_state();
        let request = r#"{"jsonrpc":"1.0","method":"ping","id":1}"#;
        let response = process_request(request, &state).await.unwrap();
        assert!(response.contains("-32600")); // Invalid request
    }

    #[tokio::test]
    async fn process_unknown_method() {
        let (state, _rx) = test_state();
        let request = r#"{"jsonrpc":"2.0","method":"unknown","id":1}"#;
        let response = process_request(request, &state).await.unwrap();
        assert!(response.contains("-32601")); // Method not found
    }

    #[tokio::test]
    async fn process_ping() {
        let (state, _rx) = test_state();
        let request = r#"{"jsonrpc":"2.0","method":"ping","id":7}"#;
        let response = process_request(request, &state).await.unwrap();
        assert!(response.contains(r#""result""#));
        assert!(response.contains("ok"));
        assert!(response.contains(r#""id":7"#));
    }

    #[tokio::test]
    async fn string_request_id_round_trips() {
        let (state, _rx) = test_state();
        let request = r#"{"jsonrpc":"2.0","method":"ping","id":"req-1"}"#;
        let response = process_request(request, &state).await.unwrap();
        assert!(response.contains(r#""id":"req-1""#));
    }
}
