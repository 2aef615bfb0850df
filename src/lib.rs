//! lifetales - turn spoken and written memories into illustrated story chapters
//!
//! A four-stage generative pipeline (transcribe, analyze, narrate, illustrate)
//! feeding an in-memory store of story spaces.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "gemini")]
pub mod backend;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod stages;
pub mod story;

// Stage contracts
pub use stages::{Analyzer, Illustrator, Narrator, Stages, Transcriber};

// Pipeline
pub use pipeline::{AgentResponse, AgentStatus, MemoryInput, Orchestrator, PipelineConfig};

// Error handling
pub use error::{LifeTalesError, Result};
pub use pipeline::PipelineError;

// Config
pub use config::Config;

// Stories
pub use session::Session;
pub use story::{Chapter, StorySpace, StoryStore};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
/// Used as the `--version` string of the CLI.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
