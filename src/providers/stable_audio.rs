//! Stable Audio generation provider.
//!
//! Calls the Stability AI stable-audio-2 text-to-audio endpoint with a
//! multipart form and receives raw audio bytes in the response body.
//! Stable Audio only produces instrumental music; the request's `mode` is
//! accepted for interface compatibility and ignored.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;

use crate::error::{DaemonError, Result};
use crate::types::{GenerationRequest, OutputFormat};

use super::ProviderClient;

/// Registry name of this provider.
pub const PROVIDER_NAME: &str = "stable-audio";

/// Client for the Stable Audio API.
pub struct StableAudioClient {
    api_key: String,
    endpoint: String,
    http: reqwest::Client,
}

impl StableAudioClient {
    /// Creates a new StableAudioClient.
    ///
    /// Fails with MISSING_API_KEY when the key is empty so a doomed
    /// network call is never made later.
    pub fn new(api_key: &str, endpoint: &str, http: reqwest::Client) -> Result<Self> {
        if api_key.is_empty() {
            return Err(DaemonError::missing_api_key("Stable Audio"));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            http,
        })
    }

    /// Builds the multipart form payload for a request.
    fn build_form(&self, request: &GenerationRequest) -> Form {
        Form::new()
            .text("prompt", request.prompt.clone())
            .text(
                "output_format",
                self.output_format(request).as_str().to_string(),
            )
            .text("duration", request.options.duration_sec.to_string())
            .text("steps", request.options.steps.to_string())
    }
}

#[async_trait]
impl ProviderClient for StableAudioClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn output_format(&self, request: &GenerationRequest) -> OutputFormat {
        request.options.output_format.unwrap_or(OutputFormat::Mp3)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "audio/*")
            .multipart(self.build_form(request))
            .send()
            .await
            .map_err(|e| DaemonError::provider_unreachable("Stable Audio", e))?;

        let status = response.status();
        if !status.is_success() {
            // The error body may or may not be JSON; keep it raw
            let body = response.text().await.unwrap_or_default();
            return Err(DaemonError::provider_request_failed(
                "Stable Audio",
                status.as_u16(),
                body,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DaemonError::provider_unreachable("Stable Audio", e))?;
        Ok(bytes.to_vec())
    }
}
