//! Generative backend: Gemini client and the stages built on it.

pub mod gemini;
pub mod stages;

pub use gemini::{GeminiClient, resolve_api_key};
pub use stages::{
    GeminiAnalyzer, GeminiIllustrator, GeminiNarrator, GeminiTranscriber, gemini_stages,
    stages_with_client,
};
