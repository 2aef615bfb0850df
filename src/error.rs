//! Error types for lifetales.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifeTalesError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("No API key found (set {env_var})")]
    MissingApiKey { env_var: String },

    // Generative backend errors
    #[error("Backend request failed: {message}")]
    BackendRequest { message: String },

    #[error("Backend returned status {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("Malformed backend response: {message}")]
    BackendResponse { message: String },

    // Stage errors
    #[error("Transcription error: {message}")]
    Transcription { message: String },

    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Narrative synthesis error: {message}")]
    Synthesis { message: String },

    #[error("Illustration error: {message}")]
    Illustration { message: String },

    #[error(transparent)]
    Pipeline(#[from] crate::pipeline::error::PipelineError),

    // Story store errors
    #[error("Story not found: {id}")]
    StoryNotFound { id: String },

    #[error("Invalid story: {message}")]
    InvalidStory { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LifeTalesError>;
