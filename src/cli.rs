//! Command-line interface for lifetales
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Turn voice notes and jotted memories into illustrated story chapters
#[derive(Parser, Debug)]
#[command(
    name = "lifetales",
    version = crate::version_string(),
    about = "Turn voice notes and jotted memories into illustrated story chapters"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info logs, -vv: debug logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Weave memories into a new story, one chapter per input
    Weave {
        /// Story title
        #[arg(long, short = 't')]
        title: String,

        /// Story theme (default: Personal)
        #[arg(long, default_value = "")]
        theme: String,

        /// Print the finished story as JSON
        #[arg(long)]
        json: bool,

        /// Per-stage timeout override. Examples: 30s, 2m, 1m30s
        #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Skip the illustration stage
        #[arg(long, conflicts_with = "image_dir")]
        no_illustrations: bool,

        /// Write chapter illustrations into this directory
        #[arg(long, value_name = "DIR")]
        image_dir: Option<PathBuf>,

        /// Audio files, text files, or literal text, in chronological order
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<String>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file plus environment overrides)
    Show,
    /// Print the configuration file path
    Path,
}

/// Parse a timeout string into a duration.
///
/// Supports any duration format accepted by `humantime`, plus bare numbers
/// as seconds. Zero is rejected.
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Where a memory comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Recorded audio file with its MIME type.
    AudioFile { path: PathBuf, mime_type: String },
    /// Text file to read.
    TextFile(PathBuf),
    /// Literal text from the command line.
    Literal(String),
}

/// MIME type for a known audio file extension.
pub fn audio_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "webm" => "audio/webm",
        "wav" => "audio/wav",
        "mp3" => "audio/mp3",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "aac" => "audio/aac",
        "flac" => "audio/flac",
        _ => return None,
    };
    Some(mime)
}

/// Classify a command-line input: existing files by extension, anything else
/// as literal text.
pub fn classify_input(arg: &str) -> InputSource {
    let path = Path::new(arg);
    if !path.is_file() {
        return InputSource::Literal(arg.to_string());
    }
    match audio_mime_for(path) {
        Some(mime) => InputSource::AudioFile {
            path: path.to_path_buf(),
            mime_type: mime.to_string(),
        },
        None => InputSource::TextFile(path.to_path_buf()),
    }
}
