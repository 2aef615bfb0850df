//! Narrative synthesis: raw memory text to polished prose.

use crate::error::{LifeTalesError, Result};
use crate::pipeline::types::PipelineConfig;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for narrative synthesis.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Rewrite `raw_text` as prose, staying continuous with `config.story_context`.
    async fn narrate(&self, raw_text: &str, config: &PipelineConfig) -> Result<String>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Narrator + ?Sized> Narrator for Arc<T> {
    async fn narrate(&self, raw_text: &str, config: &PipelineConfig) -> Result<String> {
        (**self).narrate(raw_text, config).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock narrator for testing
///
/// Without a fixed response it echoes the input wrapped in a marker, so tests
/// can tell synthesized prose from the raw-text fallback.
#[derive(Debug, Clone, Default)]
pub struct MockNarrator {
    response: Option<String>,
    should_fail: bool,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<PipelineConfig>>>,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configs passed to `narrate`, in call order (shared between clones).
    pub fn seen_configs(&self) -> Vec<PipelineConfig> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, raw_text: &str, config: &PipelineConfig) -> Result<String> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(config.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(LifeTalesError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| format!("Once, {}", raw_text.trim())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_narrator_echoes_input_by_default() {
        let narrator = MockNarrator::new();
        let prose = narrator
            .narrate(" we walked home ", &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(prose, "Once, we walked home");
    }

    #[tokio::test]
    async fn mock_narrator_records_configs() {
        let narrator = MockNarrator::new().with_response("prose");
        let config = PipelineConfig::new("earlier chapter", "narrative");
        narrator.narrate("text", &config).await.unwrap();
        assert_eq!(narrator.seen_configs(), vec![config]);
    }

    #[tokio::test]
    async fn mock_narrator_fails_when_configured() {
        let narrator = MockNarrator::new().with_failure();
        let result = narrator.narrate("text", &PipelineConfig::default()).await;
        assert!(matches!(result, Err(LifeTalesError::Synthesis { .. })));
    }
}
