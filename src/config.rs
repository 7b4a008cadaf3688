//! Daemon configuration module.
//!
//! Contains the runtime configuration for the vibe-daemon, including
//! provider credentials, the music directory, and playback tuning.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default Stable Audio text-to-audio endpoint.
pub const STABLE_AUDIO_ENDPOINT: &str =
    "https://api.stability.ai/v2beta/audio/stable-audio-2/text-to-audio";

/// Default PiAPI task creation endpoint.
pub const PIAPI_ENDPOINT: &str = "https://api.piapi.ai/api/v1/task";

/// Default provider request timeout in seconds.
///
/// Generation calls can legitimately take minutes; the timeout only exists
/// so a hung provider cannot wedge a pending request forever.
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 300;

/// Default fade-in ramp window in milliseconds.
pub const DEFAULT_FADE_IN_MS: u64 = 1500;

/// Runtime configuration for the daemon.
///
/// This configuration is loaded once from environment variables at startup
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the directory for storing generated audio files.
    /// If None, uses the platform-specific default cache location.
    pub music_path: Option<PathBuf>,

    /// Stable Audio API key. Absence means the provider is not registered.
    pub stable_audio_key: Option<String>,

    /// PiAPI (Udio) API key. Absence means the provider is not registered.
    pub piapi_key: Option<String>,

    /// Stable Audio endpoint URL.
    pub stable_audio_endpoint: String,

    /// PiAPI task endpoint URL.
    pub piapi_endpoint: String,

    /// Provider used when a generate request names none.
    pub default_provider: String,

    /// Timeout applied to every provider HTTP request, in seconds.
    pub request_timeout_sec: u64,

    /// Fade-in ramp window in milliseconds.
    pub fade_in_ms: u64,
}

impl DaemonConfig {
    /// Creates a new DaemonConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a DaemonConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `STABLE_AUDIO_KEY` - Stable Audio API key
    /// - `PIAPI_KEY` - PiAPI (Udio) API key
    /// - `VIBE_MUSIC_PATH` - Directory for generated audio files
    /// - `VIBE_DEFAULT_PROVIDER` - Default provider name
    /// - `VIBE_STABLE_AUDIO_ENDPOINT` - Stable Audio endpoint override
    /// - `VIBE_PIAPI_ENDPOINT` - PiAPI endpoint override
    /// - `VIBE_REQUEST_TIMEOUT_SEC` - Provider request timeout
    /// - `VIBE_FADE_IN_MS` - Fade-in ramp window
    ///
    /// Falls back to defaults for unset variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("STABLE_AUDIO_KEY") {
            if !key.is_empty() {
                config.stable_audio_key = Some(key);
            }
        }

        if let Ok(key) = std::env::var("PIAPI_KEY") {
            if !key.is_empty() {
                config.piapi_key = Some(key);
            }
        }

        if let Ok(path) = std::env::var("VIBE_MUSIC_PATH") {
            config.music_path = Some(PathBuf::from(path));
        }

        if let Ok(provider) = std::env::var("VIBE_DEFAULT_PROVIDER") {
            if !provider.is_empty() {
                config.default_provider = provider;
            }
        }

        if let Ok(endpoint) = std::env::var("VIBE_STABLE_AUDIO_ENDPOINT") {
            if !endpoint.is_empty() {
                config.stable_audio_endpoint = endpoint;
            }
        }

        if let Ok(endpoint) = std::env::var("VIBE_PIAPI_ENDPOINT") {
            if !endpoint.is_empty() {
                config.piapi_endpoint = endpoint;
            }
        }

        if let Ok(timeout_str) = std::env::var("VIBE_REQUEST_TIMEOUT_SEC") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                if timeout > 0 {
                    config.request_timeout_sec = timeout;
                }
            }
        }

        if let Ok(fade_str) = std::env::var("VIBE_FADE_IN_MS") {
            if let Ok(fade) = fade_str.parse::<u64>() {
                config.fade_in_ms = fade;
            }
        }

        config
    }

    /// Returns the effective music directory, using platform defaults if not
    /// specified.
    pub fn effective_music_path(&self) -> PathBuf {
        if let Some(ref path) = self.music_path {
            path.clone()
        } else {
            default_music_path()
        }
    }

    /// Returns the provider request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    /// Returns the fade-in ramp window as a Duration.
    pub fn fade_in_window(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.request_timeout_sec == 0 {
            return Some("request_timeout_sec must be > 0".to_string());
        }

        if self.fade_in_ms > 60_000 {
            return Some(format!(
                "fade_in_ms too high: {} (max 60000)",
                self.fade_in_ms
            ));
        }

        if self.default_provider.is_empty() {
            return Some("default_provider must not be empty".to_string());
        }

        None
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            music_path: None,
            stable_audio_key: None,
            piapi_key: None,
            stable_audio_endpoint: STABLE_AUDIO_ENDPOINT.to_string(),
            piapi_endpoint: PIAPI_ENDPOINT.to_string(),
            default_provider: "stable-audio".to_string(),
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            fade_in_ms: DEFAULT_FADE_IN_MS,
        }
    }
}

/// Returns the platform-specific default music storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/vibe-daemon/music
/// - Linux: ~/.cache/vibe-daemon/music
/// - Windows: C:\Users\<user>\AppData\Local\vibe-daemon\cache\music
fn default_music_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "vibe-daemon") {
        proj_dirs.cache_dir().join("music")
    } else {
        // Fallback to current directory
        PathBuf::from("./music")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = DaemonConfig::new();
        assert!(config.stable_audio_key.is_none());
        assert!(config.piapi_key.is_none());
        assert_eq!(config.default_provider, "stable-audio");
        assert_eq!(config.request_timeout_sec, DEFAULT_REQUEST_TIMEOUT_SEC);
        assert_eq!(config.fade_in_ms, DEFAULT_FADE_IN_MS);
    }

    #[test]
    fn config_validation() {
        let mut config = DaemonConfig::new();
        assert!(config.validate().is_none());

        config.request_timeout_sec = 0;
        assert!(config.validate().is_some());

        config.request_timeout_sec = 60;
        config.fade_in_ms = 120_000;
        assert!(config.validate().is_some());

        config.fade_in_ms = 2000;
        config.default_provider = String::new();
        assert!(config.validate().is_some());
    }

    #[test]
    fn effective_music_path_non_empty() {
        let config = DaemonConfig::new();
        assert!(!config.effective_music_path().as_os_str().is_empty());
    }

    #[test]
    fn effective_music_path_override() {
        let config = DaemonConfig {
            music_path: Some(PathBuf::from("/tmp/custom-music")),
            ..DaemonConfig::default()
        };
        assert_eq!(
            config.effective_music_path(),
            PathBuf::from("/tmp/custom-music")
        );
    }

    #[test]
    fn durations_from_config() {
        let config = DaemonConfig::new();
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.fade_in_window(), Duration::from_millis(1500));
    }
}
