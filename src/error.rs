//! Error types for the vibe-daemon.
//!
//! Defines all error codes and types used throughout the daemon for
//! consistent error handling and reporting.

use std::fmt;

/// Error codes returned by the daemon in error responses.
///
/// These codes are used in JSON-RPC error responses and allow clients
/// to programmatically handle specific error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Required provider API key is missing or empty.
    /// Trigger: Provider constructed without its environment key set.
    MissingApiKey,

    /// No provider is registered under the requested name.
    /// Trigger: Unknown provider name in a generate request.
    ProviderNotFound,

    /// The upstream generation API returned a non-success response.
    /// Trigger: HTTP error status, network failure, or task timeout.
    ProviderRequestFailed,

    /// Local audio playback failed.
    /// Trigger: File missing, unsupported format, or device unavailable.
    PlaybackFailed,

    /// Prompt text is invalid.
    /// Trigger: Empty prompt or exceeds 1000 characters.
    InvalidPrompt,

    /// Requested duration or step count is outside valid range.
    /// Trigger: Non-positive duration or steps.
    InvalidDuration,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingApiKey => "MISSING_API_KEY",
            ErrorCode::ProviderNotFound => "PROVIDER_NOT_FOUND",
            ErrorCode::ProviderRequestFailed => "PROVIDER_REQUEST_FAILED",
            ErrorCode::PlaybackFailed => "PLAYBACK_FAILED",
            ErrorCode::InvalidPrompt => "INVALID_PROMPT",
            ErrorCode::InvalidDuration => "INVALID_DURATION",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::MissingApiKey => "Required provider API key is missing or empty",
            ErrorCode::ProviderNotFound => "No provider is registered under the requested name",
            ErrorCode::ProviderRequestFailed => {
                "The upstream generation API returned a non-success response"
            }
            ErrorCode::PlaybackFailed => "Local audio playback failed",
            ErrorCode::InvalidPrompt => "Prompt must be non-empty and at most 1000 characters",
            ErrorCode::InvalidDuration => "Duration and steps must be positive",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::MissingApiKey => {
                "Set the provider's API key environment variable (STABLE_AUDIO_KEY or \
                 PIAPI_KEY) and restart the daemon"
            }
            ErrorCode::ProviderNotFound => {
                "Call get_providers to list configured providers, or set the missing \
                 provider's API key so it registers at startup"
            }
            ErrorCode::ProviderRequestFailed => {
                "Check the attached upstream status and body. Generation calls are not \
                 retried automatically; retry explicitly once the cause is resolved"
            }
            ErrorCode::PlaybackFailed => {
                "Verify the file path exists and is a supported format (mp3/wav), and \
                 that an audio output device is available"
            }
            ErrorCode::InvalidPrompt => {
                "Provide a descriptive prompt between 1 and 1000 characters, or pass a \
                 code snippet to have a prompt built automatically"
            }
            ErrorCode::InvalidDuration => {
                "Specify a positive duration in seconds and a positive step count \
                 (e.g., duration_sec: 180, steps: 30)"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for daemon operations.
#[derive(Debug)]
pub struct DaemonError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Upstream HTTP status, when a provider responded with one.
    pub upstream_status: Option<u16>,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DaemonError {
    /// Creates a new DaemonError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            upstream_status: None,
            source: None,
        }
    }

    /// Creates a new DaemonError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            upstream_status: None,
            source: Some(Box::new(source)),
        }
    }

    /// Creates a MISSING_API_KEY error.
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::MissingApiKey,
            format!("{} API key is missing or empty", provider.into()),
        )
    }

    /// Creates a PROVIDER_NOT_FOUND error.
    pub fn provider_not_found(name: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProviderNotFound,
            format!("No provider registered under name: {}", name.into()),
        )
    }

    /// Creates a PROVIDER_REQUEST_FAILED error for a non-success upstream status.
    ///
    /// The raw response body is carried for diagnostics; it is never assumed
    /// to be JSON.
    pub fn provider_request_failed(
        provider: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        let mut err = Self::new(
            ErrorCode::ProviderRequestFailed,
            format!(
                "{} request failed with status {}: {}",
                provider.into(),
                status,
                truncate_body(&body),
            ),
        );
        err.upstream_status = Some(status);
        err
    }

    /// Creates a PROVIDER_REQUEST_FAILED error for a transport-level failure.
    pub fn provider_unreachable(
        provider: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(
            ErrorCode::ProviderRequestFailed,
            format!("{} request failed: {}", provider.into(), source),
            source,
        )
    }

    /// Creates a PLAYBACK_FAILED error.
    pub fn playback_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PlaybackFailed,
            format!("Playback failed: {}", reason.into()),
        )
    }

    /// Creates an INVALID_PROMPT error for empty prompts.
    pub fn empty_prompt() -> Self {
        Self::new(ErrorCode::InvalidPrompt, "Prompt cannot be empty")
    }

    /// Creates an INVALID_PROMPT error for prompts that are too long.
    pub fn prompt_too_long(len: usize) -> Self {
        Self::new(
            ErrorCode::InvalidPrompt,
            format!("Prompt too long: {} characters (maximum 1000)", len),
        )
    }

    /// Creates an INVALID_DURATION error.
    pub fn invalid_duration(duration: f32) -> Self {
        Self::new(
            ErrorCode::InvalidDuration,
            format!("Invalid duration: {} seconds (must be positive)", duration),
        )
    }

    /// Creates an INVALID_DURATION error for a bad step count.
    pub fn invalid_steps(steps: u32) -> Self {
        Self::new(
            ErrorCode::InvalidDuration,
            format!("Invalid steps: {} (must be positive)", steps),
        )
    }
}

/// Caps a raw upstream body for inclusion in an error message.
fn truncate_body(body: &str) -> &str {
    const MAX_BODY: usize = 300;
    if body.len() <= MAX_BODY {
        body
    } else {
        // Back off to a char boundary so the slice never panics
        let mut end = MAX_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        &body[..end]
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using DaemonError.
pub type Result<T> = std::result::Result<T, DaemonError>;
