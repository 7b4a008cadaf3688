//! PiAPI Udio generation provider.
//!
//! Udio generation is asynchronous on the provider side: creating a task
//! returns a task ID, the task is polled until it completes or fails, and
//! the finished song is downloaded from the URL in the task output. Unlike
//! Stable Audio, Udio honors the request's `mode` and can write lyrics
//! about a code snippet.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};
use crate::types::{GenerationMode, GenerationRequest, OutputFormat};

use super::ProviderClient;

/// Registry name of this provider.
pub const PROVIDER_NAME: &str = "udio";

/// Maximum number of polling attempts before giving up on a task.
const MAX_POLL_ATTEMPTS: u32 = 60;

/// Delay between polling attempts.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Client for the PiAPI Udio API.
pub struct PiapiUdioClient {
    api_key: String,
    endpoint: String,
    http: reqwest::Client,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

/// Task creation payload.
#[derive(Debug, Serialize)]
struct TaskPayload {
    model: &'static str,
    task_type: &'static str,
    input: TaskInput,
}

#[derive(Debug, Serialize)]
struct TaskInput {
    prompt: String,
    lyrics_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gpt_description_prompt: Option<String>,
}

/// Envelope around every PiAPI response body.
#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    #[serde(default)]
    data: Option<TaskData>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<TaskOutput>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    #[serde(default)]
    songs: Vec<Song>,
}

#[derive(Debug, Deserialize)]
struct Song {
    #[serde(default)]
    song_path: Option<String>,
}

impl PiapiUdioClient {
    /// Creates a new PiapiUdioClient.
    ///
    /// Fails with MISSING_API_KEY when the key is empty so a doomed
    /// network call is never made later.
    pub fn new(api_key: &str, endpoint: &str, http: reqwest::Client) -> Result<Self> {
        if api_key.is_empty() {
            return Err(DaemonError::missing_api_key("PiAPI"));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            http,
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
        })
    }

    /// Builds the task creation payload for a request.
    fn build_payload(&self, request: &GenerationRequest) -> TaskPayload {
        let (lyrics_type, gpt_description_prompt) = match request.options.mode {
            GenerationMode::Instrumental => ("instrumental", None),
            GenerationMode::Lyrical => (
                "generate",
                request.options.code.as_ref().map(|code| {
                    format!(
                        "Write a song based on the following code: {}, describing \
                         exactly what it's doing",
                        code
                    )
                }),
            ),
        };
        TaskPayload {
            model: "music-u",
            task_type: "generate_music",
            input: TaskInput {
                prompt: request.prompt.clone(),
                lyrics_type,
                gpt_description_prompt,
            },
        }
    }

    /// Creates a generation task, returning its task ID.
    async fn create_task(&self, request: &GenerationRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .json(&self.build_payload(request))
            .send()
            .await
            .map_err(|e| DaemonError::provider_unreachable("PiAPI Udio", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DaemonError::provider_request_failed(
                "PiAPI Udio",
                status.as_u16(),
                body,
            ));
        }

        let envelope: TaskEnvelope = serde_json::from_str(&body).map_err(|_| {
            DaemonError::provider_request_failed("PiAPI Udio", status.as_u16(), body.clone())
        })?;

        envelope
            .data
            .and_then(|d| d.task_id)
            .ok_or_else(|| {
                DaemonError::provider_request_failed("PiAPI Udio", status.as_u16(), body)
            })
    }

    /// Polls a task until it completes, returning the song URL.
    ///
    /// A single failed poll is not fatal; polling continues until the
    /// attempt budget runs out. A task reported as "failed" stops
    /// immediately.
    async fn poll_for_result(&self, task_id: &str) -> Result<String> {
        let url = format!("{}/{}", self.endpoint, task_id);

        for attempt in 0..self.max_poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }

            let response = match self
                .http
                .get(&url)
                .header("X-API-Key", &self.api_key)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("PiAPI poll error for task {}: {}", task_id, e);
                    continue;
                }
            };

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let envelope: TaskEnvelope = match serde_json::from_str(&body) {
                Ok(e) => e,
                Err(_) => {
                    eprintln!("PiAPI poll for task {} returned status {}", task_id, status);
                    continue;
                }
            };

            let Some(data) = envelope.data else { continue };

            match data.status.as_deref() {
                Some("completed") => {
                    if let Some(path) = data
                        .output
                        .and_then(|o| o.songs.into_iter().next())
                        .and_then(|s| s.song_path)
                    {
                        return Ok(path);
                    }
                    return Err(DaemonError::provider_request_failed(
                        "PiAPI Udio",
                        status.as_u16(),
                        format!("Task {} completed without a song path: {}", task_id, body),
                    ));
                }
                Some("failed") => {
                    return Err(DaemonError::provider_request_failed(
                        "PiAPI Udio",
                        status.as_u16(),
                        format!("Task {} failed: {}", task_id, body),
                    ));
                }
                _ => {
                    eprintln!("PiAPI task {} still processing, waiting...", task_id);
                }
            }
        }

        Err(DaemonError::new(
            crate::error::ErrorCode::ProviderRequestFailed,
            format!("Timed out waiting for PiAPI task {} to complete", task_id),
        ))
    }

    /// Downloads the finished song.
    async fn download(&self, song_url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(song_url)
            .send()
            .await
            .map_err(|e| DaemonError::provider_unreachable("PiAPI Udio", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DaemonError::provider_request_failed(
                "PiAPI Udio",
                status.as_u16(),
                body,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DaemonError::provider_unreachable("PiAPI Udio", e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ProviderClient for PiapiUdioClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn output_format(&self, _request: &GenerationRequest) -> OutputFormat {
        // Udio always delivers mp3 regardless of the requested format
        OutputFormat::Mp3
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        let task_id = self.create_task(request).await?;
        eprintln!("Created PiAPI Udio task with ID: {}", task_id);

        let song_url = self.poll_for_result(&task_id).await?;
        eprintln!("PiAPI task {} completed successfully", task_id);

        self.download(&song_url).await
    }
}
