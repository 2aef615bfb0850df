use crate::defaults;
use crate::error::{LifeTalesError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub pipeline: PipelineSettings,
    pub analysis: AnalysisConfig,
    pub display: DisplayConfig,
}

/// Generative backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub request_timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

/// Pipeline behaviour: context window, style and stage timeouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub context_chapters: usize,
    pub context_separator: String,
    pub style: String,
    pub temperature: f32,
    pub transcription_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub synthesis_timeout_secs: u64,
    pub illustration_timeout_secs: u64,
}

/// Degrade policy of the semantic analysis stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub fallback_mood: String,
    pub fallback_tags: Vec<String>,
}

/// How long terminal statuses stay visible before resetting to Idle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub completed_ms: u64,
    pub error_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::DEFAULT_API_BASE.to_string(),
            text_model: defaults::DEFAULT_TEXT_MODEL.to_string(),
            image_model: defaults::DEFAULT_IMAGE_MODEL.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            api_key_env: defaults::API_KEY_ENV.to_string(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            context_chapters: defaults::CONTEXT_CHAPTERS,
            context_separator: defaults::CONTEXT_SEPARATOR.to_string(),
            style: defaults::DEFAULT_STYLE.to_string(),
            temperature: defaults::SYNTHESIS_TEMPERATURE,
            transcription_timeout_secs: defaults::TRANSCRIPTION_TIMEOUT_SECS,
            analysis_timeout_secs: defaults::ANALYSIS_TIMEOUT_SECS,
            synthesis_timeout_secs: defaults::SYNTHESIS_TIMEOUT_SECS,
            illustration_timeout_secs: defaults::ILLUSTRATION_TIMEOUT_SECS,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fallback_mood: defaults::FALLBACK_MOOD.to_string(),
            fallback_tags: defaults::fallback_tags(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            completed_ms: defaults::COMPLETED_DISPLAY_MS,
            error_ms: defaults::ERROR_DISPLAY_MS,
        }
    }
}

impl PipelineSettings {
    /// Stage timeouts as durations.
    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            transcription: Duration::from_secs(self.transcription_timeout_secs),
            analysis: Duration::from_secs(self.analysis_timeout_secs),
            synthesis: Duration::from_secs(self.synthesis_timeout_secs),
            illustration: Duration::from_secs(self.illustration_timeout_secs),
        }
    }

    /// Set every stage timeout to the same value.
    pub fn with_uniform_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs().max(1);
        self.transcription_timeout_secs = secs;
        self.analysis_timeout_secs = secs;
        self.synthesis_timeout_secs = secs;
        self.illustration_timeout_secs = secs;
        self
    }
}

/// Per-stage timeouts applied by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub transcription: Duration,
    pub analysis: Duration,
    pub synthesis: Duration,
    pub illustration: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        PipelineSettings::default().stage_timeouts()
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LifeTalesError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                LifeTalesError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(LifeTalesError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.fallback_mood.trim().is_empty() {
            return Err(LifeTalesError::ConfigInvalidValue {
                key: "analysis.fallback_mood".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.pipeline.temperature) {
            return Err(LifeTalesError::ConfigInvalidValue {
                key: "pipeline.temperature".to_string(),
                message: format!("{} is outside 0.0..=2.0", self.pipeline.temperature),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LIFETALES_TEXT_MODEL → backend.text_model
    /// - LIFETALES_IMAGE_MODEL → backend.image_model
    /// - LIFETALES_API_BASE → backend.api_base
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("LIFETALES_TEXT_MODEL")
            && !model.is_empty()
        {
            self.backend.text_model = model;
        }

        if let Ok(model) = std::env::var("LIFETALES_IMAGE_MODEL")
            && !model.is_empty()
        {
            self.backend.image_model = model;
        }

        if let Ok(base) = std::env::var("LIFETALES_API_BASE")
            && !base.is_empty()
        {
            self.backend.api_base = base;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/lifetales/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("lifetales").join("config.toml"))
            .ok_or_else(|| LifeTalesError::Other("Could not determine config directory".into()))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LifeTalesError::Other(e.to_string()))
    }
}
