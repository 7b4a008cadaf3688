//! Generation request and audio asset types.
//!
//! A GenerationRequest describes what to generate; an AudioAsset is the
//! immutable record of one successful generation, backed by a file on disk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::{DaemonError, Result};

/// Default generation duration in seconds.
pub const DEFAULT_DURATION_SEC: f32 = 180.0;

/// Default number of generation steps.
pub const DEFAULT_STEPS: u32 = 30;

/// Longest prompt a request will accept, in bytes.
pub const MAX_PROMPT_LEN: usize = 1000;

/// Audio container format for generated files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    Wav,
}

impl OutputFormat {
    /// Returns the string representation of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
        }
    }

    /// Returns the file extension (without dot).
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Parses a format from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Some(OutputFormat::Mp3),
            "wav" => Some(OutputFormat::Wav),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Music generation mode.
///
/// Providers that only produce instrumental music accept Lyrical for
/// interface compatibility and ignore it; providers are interchangeable
/// from the caller's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Instrumental,
    Lyrical,
}

impl GenerationMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Instrumental => "instrumental",
            GenerationMode::Lyrical => "lyrical",
        }
    }
}

/// Optional parameters for a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Duration of audio to generate in seconds.
    pub duration_sec: f32,

    /// Number of generation steps.
    pub steps: u32,

    /// Requested output format; None lets the provider pick its default.
    pub output_format: Option<OutputFormat>,

    /// Instrumental or lyrical generation.
    pub mode: GenerationMode,

    /// Source code snippet the music is themed on, used by lyrical
    /// providers to write lyrics about the code.
    pub code: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            duration_sec: DEFAULT_DURATION_SEC,
            steps: DEFAULT_STEPS,
            output_format: None,
            mode: GenerationMode::Instrumental,
            code: None,
        }
    }
}

/// A request for music generation. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text description of the desired music.
    pub prompt: String,

    /// Generation options.
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Creates a request with default options.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: GenerationOptions::default(),
        }
    }

    /// Validates the request parameters.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.is_empty() {
            return Err(DaemonError::empty_prompt());
        }
        if self.prompt.len() > MAX_PROMPT_LEN {
            return Err(DaemonError::prompt_too_long(self.prompt.len()));
        }
        if !(self.options.duration_sec > 0.0) {
            return Err(DaemonError::invalid_duration(self.options.duration_sec));
        }
        if self.options.steps == 0 {
            return Err(DaemonError::invalid_steps(self.options.steps));
        }
        Ok(())
    }
}

/// A successfully generated audio file stored in the music directory.
///
/// Assets are immutable once created and are uniquely identified by their
/// `asset_id`. The backing file exists at `path` from the moment the asset
/// is returned; nothing in the daemon deletes or overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAsset {
    /// Primary key - SHA256 hash of (provider + prompt + timestamp + sequence).
    /// Format: 16 hex characters.
    pub asset_id: String,

    /// Full filesystem path to the audio file.
    pub path: PathBuf,

    /// Container format of the file.
    pub format: OutputFormat,

    /// Requested duration in seconds. The daemon does not decode the file,
    /// so this is the duration asked of the provider, not a measurement.
    pub duration_sec: f32,

    /// Name of the provider that generated the audio.
    pub provider: String,

    /// When the asset was created (Unix timestamp in JSON).
    #[serde(with = "system_time_serde")]
    pub created_at: SystemTime,
}

impl AudioAsset {
    /// Creates a new AudioAsset.
    ///
    /// The asset_id is automatically computed from the creation parameters.
    pub fn new(
        path: PathBuf,
        format: OutputFormat,
        duration_sec: f32,
        provider: impl Into<String>,
        created_millis: u128,
        sequence: u64,
    ) -> Self {
        let provider = provider.into();
        let asset_id = compute_asset_id(&provider, &path, created_millis, sequence);
        Self {
            asset_id,
            path,
            format,
            duration_sec,
            provider,
            created_at: SystemTime::now(),
        }
    }
}

/// Computes an asset ID from creation parameters.
///
/// The asset ID is the first 16 hex characters of the SHA256 hash of
/// `{provider}:{path}:{created_millis}:{sequence}`.
pub fn compute_asset_id(
    provider: &str,
    path: &std::path::Path,
    created_millis: u128,
    sequence: u64,
) -> String {
    let input = format!(
        "{}:{}:{}:{}",
        provider,
        path.display(),
        created_millis,
        sequence
    );
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    // First 8 bytes (16 hex chars)
    hex::encode(&result[..8])
}

/// Custom serde implementation for SystemTime as Unix seconds.
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}
