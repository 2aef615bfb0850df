//! Default configuration constants for lifetales.
//!
//! The degrade-policy values live here so they can be tested and overridden
//! through [`crate::config::AnalysisConfig`] instead of being inlined in stages.

/// Mood substituted when semantic analysis fails.
pub const FALLBACK_MOOD: &str = "Reflective";

/// Tags substituted when semantic analysis fails.
pub const FALLBACK_TAGS: &[&str] = &["Life"];

/// Number of most recent chapters whose narratives form the story context.
pub const CONTEXT_CHAPTERS: usize = 3;

/// Separator placed between narratives in the story context.
pub const CONTEXT_SEPARATOR: &str = " ";

/// Style hint passed to narrative synthesis.
pub const DEFAULT_STYLE: &str = "narrative";

/// Theme used when a story space is created without one.
pub const DEFAULT_THEME: &str = "Personal";

/// Sampling temperature for narrative synthesis.
///
/// Slightly creative: enough to polish prose without drifting from the memory.
pub const SYNTHESIS_TEMPERATURE: f32 = 0.7;

/// Default base URL of the generative backend.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for transcription, analysis and synthesis.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Model used for illustration.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Environment variable holding the backend API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Secondary environment variable checked when [`API_KEY_ENV`] is unset.
pub const API_KEY_ENV_FALLBACK: &str = "API_KEY";

/// HTTP request timeout for backend calls, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Per-stage timeouts, in seconds.
pub const TRANSCRIPTION_TIMEOUT_SECS: u64 = 90;
pub const ANALYSIS_TIMEOUT_SECS: u64 = 30;
pub const SYNTHESIS_TIMEOUT_SECS: u64 = 60;
pub const ILLUSTRATION_TIMEOUT_SECS: u64 = 90;

/// How long Completed stays visible before the caller resets to Idle.
pub const COMPLETED_DISPLAY_MS: u64 = 2000;

/// How long Error stays visible before the caller resets to Idle.
pub const ERROR_DISPLAY_MS: u64 = 3000;

/// Capacity of the status event broadcast channel.
pub const STATUS_CHANNEL_CAPACITY: usize = 32;

/// Mime type assumed for audio when the caller does not provide one.
pub const DEFAULT_AUDIO_MIME: &str = "audio/webm";

/// Fallback tags as owned strings.
pub fn fallback_tags() -> Vec<String> {
    FALLBACK_TAGS.iter().map(|t| t.to_string()).collect()
}
