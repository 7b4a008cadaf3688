//! Generation service.
//!
//! Validates requests, invokes the named provider, and writes the returned
//! bytes into the music directory. A successful return is always backed by
//! a file that exists on disk at that moment; on any failure no file is
//! written. Provider calls are costly and rate-limited, so nothing here
//! retries automatically.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DaemonError, ErrorCode, Result};
use crate::providers::ProviderRegistry;
use crate::types::{AudioAsset, GenerationRequest};

/// Service owning the provider registry and the music directory.
pub struct GenerationService {
    registry: ProviderRegistry,
    music_dir: PathBuf,
    /// Per-process sequence number folded into file names so two
    /// generations landing in the same millisecond never collide.
    sequence: AtomicU64,
}

impl GenerationService {
    /// Creates a new GenerationService.
    ///
    /// The music directory is created lazily on first successful
    /// generation, not here.
    pub fn new(registry: ProviderRegistry, music_dir: PathBuf) -> Self {
        Self {
            registry,
            music_dir,
            sequence: AtomicU64::new(0),
        }
    }

    /// Returns the provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Returns the music directory path.
    pub fn music_dir(&self) -> &PathBuf {
        &self.music_dir
    }

    /// Generates audio with the named provider and persists it.
    ///
    /// Errors: PROVIDER_NOT_FOUND for an unknown name, INVALID_PROMPT /
    /// INVALID_DURATION for bad parameters, PROVIDER_REQUEST_FAILED with
    /// provider name and upstream status attached for upstream failures.
    pub async fn generate(
        &self,
        provider_name: &str,
        request: &GenerationRequest,
    ) -> Result<AudioAsset> {
        request.validate()?;
        let provider = self.registry.get(provider_name)?;

        let bytes = provider.generate(request).await?;

        let format = provider.output_format(request);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        std::fs::create_dir_all(&self.music_dir).map_err(|e| {
            DaemonError::with_source(
                ErrorCode::ProviderRequestFailed,
                format!(
                    "Failed to create music directory {}: {}",
                    self.music_dir.display(),
                    e
                ),
                e,
            )
        })?;

        let file_name = format!(
            "{}-{}-{}.{}",
            provider.name(),
            millis,
            sequence,
            format.extension()
        );
        let path = self.music_dir.join(file_name);

        std::fs::write(&path, &bytes).map_err(|e| {
            DaemonError::with_source(
                ErrorCode::ProviderRequestFailed,
                format!("Failed to write audio file {}: {}", path.display(), e),
                e,
            )
        })?;

        eprintln!(
            "Generated {} bytes with {} -> {}",
            bytes.len(),
            provider.name(),
            path.display()
        );

        Ok(AudioAsset::new(
            path,
            format,
            request.options.duration_sec,
            provider.name(),
            millis,
            sequence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderClient;
    use crate::types::OutputFormat;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    /// Stub provider recording how many transport calls were made.
    struct StubProvider {
        name: &'static str,
        response: std::result::Result<Vec<u8>, (u16, &'static str)>,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn ok(bytes: Vec<u8>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name: "stub",
                    response: Ok(bytes),
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn failing(status: u16, body: &'static str) -> Self {
            Self {
                name: "stub",
                response: Err((status, body)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ProviderClient for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn output_format(&self, request: &GenerationRequest) -> OutputFormat {
            request.options.output_format.unwrap_or_default()
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(bytes) => Ok(bytes.clone()),
                Err((status, body)) => Err(DaemonError::provider_request_failed(
                    "stub", *status, *body,
                )),
            }
        }
    }

    fn service_with(provider: StubProvider, dir: &std::path::Path) -> GenerationService {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(provider));
        GenerationService::new(registry, dir.to_path_buf())
    }

    #[tokio::test]
    async fn generate_writes_file_with_requested_extension() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _calls) = StubProvider::ok(vec![0xDE, 0xAD]);
        let service = service_with(provider, dir.path());

        let mut request = GenerationRequest::new("lofi house");
        request.options.output_format = Some(OutputFormat::Wav);

        let asset = service.generate("stub", &request).await.unwrap();
        assert!(asset.path.exists());
        assert_eq!(asset.path.extension().unwrap(), "wav");
        assert_eq!(asset.format, OutputFormat::Wav);
        assert_eq!(asset.provider, "stub");
        assert_eq!(std::fs::read(&asset.path).unwrap(), vec![0xDE, 0xAD]);
    }

    #[tokio::test]
    async fn generate_creates_music_dir_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let (provider, _calls) = StubProvider::ok(vec![1]);
        let service = service_with(provider, &nested);

        let asset = service
            .generate("stub", &GenerationRequest::new("ambient"))
            .await
            .unwrap();
        assert!(nested.is_dir());
        assert!(asset.path.starts_with(&nested));
    }

    #[tokio::test]
    async fn unknown_provider_fails_without_transport_call() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, calls) = StubProvider::ok(vec![1]);
        let service = service_with(provider, dir.path());

        let err = service
            .generate("nope", &GenerationRequest::new("ambient"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderNotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_request_fails_without_transport_call() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, calls) = StubProvider::ok(vec![1]);
        let service = service_with(provider, dir.path());

        let err = service
            .generate("stub", &GenerationRequest::new(""))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_500_surfaces_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(StubProvider::failing(500, "upstream exploded"), dir.path());

        let err = service
            .generate("stub", &GenerationRequest::new("ambient"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderRequestFailed);
        assert_eq!(err.upstream_status, Some(500));
        // Music dir was never created, so no file was written
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn consecutive_generations_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _calls) = StubProvider::ok(vec![7]);
        let service = service_with(provider, dir.path());
        let request = GenerationRequest::new("ambient");

        let a = service.generate("stub", &request).await.unwrap();
        let b = service.generate("stub", &request).await.unwrap();
        assert_ne!(a.path, b.path);
        assert_ne!(a.asset_id, b.asset_id);
        assert!(a.path.exists() && b.path.exists());
    }
}
