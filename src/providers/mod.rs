//! Generation provider module.
//!
//! Defines the [`ProviderClient`] capability contract, its concrete
//! implementations, and the name-keyed [`ProviderRegistry`]. Providers are
//! independent, side-by-side implementations selected by name; adding a
//! provider is additive.

pub mod piapi_udio;
pub mod stable_audio;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::types::{GenerationRequest, OutputFormat};

pub use piapi_udio::PiapiUdioClient;
pub use stable_audio::StableAudioClient;

/// Capability contract for one external text-to-audio generation API.
///
/// Implementations turn a prompt into raw audio bytes. They make exactly
/// the network calls needed for one generation, write no files, and treat
/// any non-success upstream status as a ProviderRequestFailed error
/// carrying the status and raw response body. Request parameters that a
/// given provider cannot honor (e.g. a lyrical mode on an
/// instrumental-only API) are accepted and silently ignored.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Registry name of this provider.
    fn name(&self) -> &str;

    /// Format of the bytes this provider will return for the request.
    fn output_format(&self, request: &GenerationRequest) -> OutputFormat;

    /// Generates audio for the request and returns the raw encoded bytes.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>>;
}

impl std::fmt::Debug for dyn ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("name", &self.name())
            .finish()
    }
}

/// Registry of available providers, keyed by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Builds a registry from configuration.
    ///
    /// Only providers whose API key is present are registered; a provider
    /// constructed with an empty key fails fast here, at startup, rather
    /// than at call time.
    pub fn from_config(config: &DaemonConfig) -> Result<Self> {
        let mut registry = Self::new();
        let http = build_http_client(config.request_timeout())?;

        if let Some(ref key) = config.stable_audio_key {
            registry.register(Arc::new(StableAudioClient::new(
                key,
                &config.stable_audio_endpoint,
                http.clone(),
            )?));
        }

        if let Some(ref key) = config.piapi_key {
            registry.register(Arc::new(PiapiUdioClient::new(
                key,
                &config.piapi_endpoint,
                http.clone(),
            )?));
        }

        Ok(registry)
    }

    /// Registers a provider under its own name.
    pub fn register(&mut self, provider: Arc<dyn ProviderClient>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Looks up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProviderClient>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| DaemonError::provider_not_found(name))
    }

    /// Returns the registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns true if a provider is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Returns the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the shared HTTP client with the configured request timeout.
///
/// Every provider call goes through this client, so no request can hang
/// past the timeout holding a pending RPC invocation.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DaemonError::provider_unreachable("HTTP client", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    struct NamedStub(&'static str);

    #[async_trait]
    impl ProviderClient for NamedStub {
        fn name(&self) -> &str {
            self.0
        }

        fn output_format(&self, _request: &GenerationRequest) -> OutputFormat {
            OutputFormat::Mp3
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<u8>> {
            Ok(vec![1, 2, 3])
        }
    }

    #[test]
    fn empty_registry_lookup_fails() {
        let registry = ProviderRegistry::new();
        let err = registry.get("stable-audio").unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderNotFound);
    }

    #[test]
    fn register_and_get() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedStub("stub")));
        assert!(registry.contains("stub"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("stub").is_ok());
    }

    #[test]
    fn names_sorted() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedStub("udio")));
        registry.register(Arc::new(NamedStub("stable-audio")));
        assert_eq!(registry.names(), vec!["stable-audio", "udio"]);
    }

    #[test]
    fn from_config_without_keys_is_empty() {
        let config = DaemonConfig::default();
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn from_config_registers_keyed_providers() {
        let config = DaemonConfig {
            stable_audio_key: Some("sk-test".to_string()),
            piapi_key: Some("pk-test".to_string()),
            ..DaemonConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.contains("stable-audio"));
        assert!(registry.contains("udio"));
        assert_eq!(registry.len(), 2);
    }
}
