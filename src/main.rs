//! vibe-daemon: AI music generation and playback over external providers.
//!
//! This binary can run in two modes:
//! - CLI mode: One-shot generation (and optional playback) for testing
//! - Daemon mode: JSON-RPC server for editor integration

use tokio::sync::mpsc::unbounded_channel;

use vibe_daemon::cli::Cli;
use vibe_daemon::config::DaemonConfig;
use vibe_daemon::error::{DaemonError, ErrorCode, Result};
use vibe_daemon::generation::GenerationService;
use vibe_daemon::playback::{rodio_factory, PlaybackEngine};
use vibe_daemon::providers::ProviderRegistry;
use vibe_daemon::rpc::{run_server, ServerState};
use vibe_daemon::types::{GenerationOptions, GenerationRequest};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = DaemonConfig::from_env();
    if let Some(problem) = config.validate() {
        eprintln!("Invalid configuration: {}", problem);
        std::process::exit(1);
    }

    if cli.is_daemon_mode() {
        run_daemon_mode(config).await
    } else if cli.is_cli_mode() {
        run_cli_mode(&cli, config).await
    } else {
        print_usage();
        Ok(())
    }
}

/// Runs the daemon mode (JSON-RPC server).
async fn run_daemon_mode(config: DaemonConfig) -> Result<()> {
    eprintln!("=== vibe-daemon JSON-RPC Server ===");
    eprintln!("Reading from stdin, writing to stdout.");
    eprintln!("Send JSON-RPC requests to control the daemon.");
    eprintln!();

    let registry = ProviderRegistry::from_config(&config)?;
    if registry.is_empty() {
        eprintln!(
            "Warning: no providers configured. Set STABLE_AUDIO_KEY or PIAPI_KEY \
             to enable generation; playback still works."
        );
    } else {
        for name in registry.names() {
            eprintln!("Provider configured: {}", name);
        }
    }
    eprintln!("Default provider: {}", config.default_provider);
    eprintln!("Music directory: {}", config.effective_music_path().display());
    eprintln!();

    let generation = GenerationService::new(registry, config.effective_music_path());

    let (event_tx, event_rx) = unbounded_channel();
    let playback = PlaybackEngine::new(rodio_factory(), config.fade_in_window(), event_tx);

    let (out_tx, out_rx) = unbounded_channel();
    let state = ServerState::new(generation, playback, config, out_tx);

    run_server(state, out_rx, event_rx).await
}

/// Runs the CLI mode for one-shot generation.
async fn run_cli_mode(cli: &Cli, config: DaemonConfig) -> Result<()> {
    let prompt = cli.prompt.as_ref().expect("Prompt required in CLI mode");
    let provider = cli
        .provider
        .clone()
        .unwrap_or_else(|| config.default_provider.clone());

    // Write next to the requested output so the final rename stays on
    // one filesystem
    let music_dir = match &cli.output {
        Some(path) => path
            .parent()
            .map(|p| p.to_path_buf())
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::PathBuf::from(".")),
        None => config.effective_music_path(),
    };

    eprintln!("=== vibe-daemon CLI ===");
    eprintln!("Provider: {}", provider);
    eprintln!("Prompt: \"{}\"", prompt);
    eprintln!("Duration: {}s", cli.duration);
    eprintln!();

    let registry = ProviderRegistry::from_config(&config)?;
    let generation = GenerationService::new(registry, music_dir);

    let request = GenerationRequest {
        prompt: prompt.clone(),
        options: GenerationOptions {
            duration_sec: cli.duration,
            steps: cli.steps,
            output_format: Some(cli.format.to_format()),
            mode: cli.mode.to_mode(),
            code: None,
        },
    };

    let asset = generation.generate(&provider, &request).await?;

    let final_path = match &cli.output {
        Some(output) => {
            std::fs::rename(&asset.path, output).map_err(|e| {
                DaemonError::with_source(
                    ErrorCode::ProviderRequestFailed,
                    format!("Failed to move audio to {}: {}", output.display(), e),
                    e,
                )
            })?;
            output.clone()
        }
        None => asset.path.clone(),
    };

    eprintln!("Generation complete!");
    eprintln!("  Asset: {}", asset.asset_id);
    eprintln!("  Saved to: {}", final_path.display());

    if cli.play {
        eprintln!();
        eprintln!("Playing {}...", final_path.display());

        // Nothing consumes events in one-shot mode
        let (event_tx, _event_rx) = unbounded_channel();
        let mut engine = PlaybackEngine::new(rodio_factory(), config.fade_in_window(), event_tx);
        let handle = engine.play(&final_path, cli.volume, cli.fade_in)?;

        match handle.finished.await {
            Ok(Ok(())) => eprintln!("Playback finished."),
            Ok(Err(message)) => return Err(DaemonError::playback_failed(message)),
            Err(_) => return Err(DaemonError::playback_failed("audio output ended unexpectedly")),
        }
    }

    Ok(())
}

/// Prints usage information.
fn print_usage() {
    eprintln!("vibe-daemon: AI music generation backed by Stable Audio and Udio");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  One-shot generation:");
    eprintln!("    vibe-daemon --prompt \"lofi hip hop beats\" --duration 60 --output track.mp3");
    eprintln!();
    eprintln!("  Generate and play:");
    eprintln!("    vibe-daemon --prompt \"ambient pads\" --play --fade-in");
    eprintln!();
    eprintln!("  Daemon mode (JSON-RPC server):");
    eprintln!("    vibe-daemon --daemon");
    eprintln!();
    eprintln!("Run 'vibe-daemon --help' for full options.");
}
