//! CLI argument parser for standalone mode.
//!
//! Provides a command-line interface for one-shot generation and
//! playback without the full daemon infrastructure.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::{GenerationMode, OutputFormat};

/// Output format argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// MP3 output (supported by all providers)
    #[default]
    Mp3,
    /// WAV output (Stable Audio only)
    Wav,
}

impl FormatArg {
    pub fn to_format(self) -> OutputFormat {
        match self {
            FormatArg::Mp3 => OutputFormat::Mp3,
            FormatArg::Wav => OutputFormat::Wav,
        }
    }
}

/// Generation mode argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Instrumental music, no vocals
    #[default]
    Instrumental,
    /// Music with generated lyrics (Udio only)
    Lyrical,
}

impl ModeArg {
    pub fn to_mode(self) -> GenerationMode {
        match self {
            ModeArg::Instrumental => GenerationMode::Instrumental,
            ModeArg::Lyrical => GenerationMode::Lyrical,
        }
    }
}

/// vibe-daemon: AI music generation and playback over external providers
#[derive(Parser, Debug)]
#[command(name = "vibe-daemon")]
#[command(about = "AI music generation daemon backed by Stable Audio and Udio")]
#[command(version)]
pub struct Cli {
    /// Text prompt describing the music to generate
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Provider to use (stable-audio or udio); defaults to configuration
    #[arg(long)]
    pub provider: Option<String>,

    /// Duration of audio to generate in seconds
    #[arg(short, long, default_value = "180")]
    pub duration: f32,

    /// Number of generation steps (Stable Audio only)
    #[arg(long, default_value = "30")]
    pub steps: u32,

    /// Output audio format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Mp3)]
    pub format: FormatArg,

    /// Generation mode
    #[arg(long, value_enum, default_value_t = ModeArg::Instrumental)]
    pub mode: ModeArg,

    /// Output file path; defaults to the music directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Play the generated audio after writing it
    #[arg(long)]
    pub play: bool,

    /// Playback volume (0.0-1.0)
    #[arg(long, default_value = "1.0")]
    pub volume: f32,

    /// Ramp volume up from silence when playback starts
    #[arg(long)]
    pub fade_in: bool,

    /// Run in daemon mode (JSON-RPC over stdio)
    #[arg(long)]
    pub daemon: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running in CLI mode (not daemon mode).
    pub fn is_cli_mode(&self) -> bool {
        !self.daemon && self.prompt.is_some()
    }

    /// Returns true if running in daemon mode.
    pub fn is_daemon_mode(&self) -> bool {
        self.daemon
    }
}
