//! Pipeline stages backed by [`GeminiClient`].

use crate::backend::gemini::GeminiClient;
use crate::config::Config;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::types::{AudioPayload, PipelineConfig};
use crate::stages::analyzer::{self, Analysis, Analyzer};
use crate::stages::illustrator::{Illustration, Illustrator};
use crate::stages::narrator::Narrator;
use crate::stages::transcriber::Transcriber;
use crate::stages::{Stages, prompt};
use async_trait::async_trait;
use std::sync::Arc;

pub struct GeminiTranscriber {
    client: Arc<GeminiClient>,
}

impl GeminiTranscriber {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transcriber for GeminiTranscriber {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        let mime_type = match audio.mime_type.trim() {
            "" => defaults::DEFAULT_AUDIO_MIME,
            mime => mime,
        };
        tracing::debug!(bytes = audio.bytes.len(), mime_type, "transcribing");
        let text = self
            .client
            .transcribe(&audio.to_base64(), mime_type, prompt::TRANSCRIPTION_INSTRUCTION)
            .await?;
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

pub struct GeminiAnalyzer {
    client: Arc<GeminiClient>,
}

impl GeminiAnalyzer {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis> {
        let json = self
            .client
            .generate_structured(&prompt::semantic_analysis(text), analyzer::response_schema())
            .await?;
        analyzer::parse_analysis(&json)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

pub struct GeminiNarrator {
    client: Arc<GeminiClient>,
    temperature: f32,
}

impl GeminiNarrator {
    pub fn new(client: Arc<GeminiClient>, temperature: f32) -> Self {
        Self {
            client,
            temperature,
        }
    }
}

#[async_trait]
impl Narrator for GeminiNarrator {
    async fn narrate(&self, raw_text: &str, config: &PipelineConfig) -> Result<String> {
        let text = self
            .client
            .generate_text(&prompt::story_builder(raw_text, config), Some(self.temperature))
            .await?;
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

pub struct GeminiIllustrator {
    client: Arc<GeminiClient>,
}

impl GeminiIllustrator {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Illustrator for GeminiIllustrator {
    async fn illustrate(&self, narrative: &str, mood: &str) -> Result<Option<Illustration>> {
        self.client
            .generate_image(&prompt::visual_generation(narrative, mood))
            .await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// All four stages backed by one shared client.
pub fn gemini_stages(config: &Config) -> Result<Stages> {
    let client = Arc::new(GeminiClient::from_config(&config.backend)?);
    Ok(stages_with_client(client, config))
}

pub fn stages_with_client(client: Arc<GeminiClient>, config: &Config) -> Stages {
    tracing::debug!(
        text_model = client.text_model(),
        image_model = client.image_model(),
        "gemini stages"
    );
    Stages::new(
        Arc::new(GeminiTranscriber::new(Arc::clone(&client))),
        Arc::new(GeminiAnalyzer::new(Arc::clone(&client))),
        Arc::new(GeminiNarrator::new(
            Arc::clone(&client),
            config.pipeline.temperature,
        )),
        Arc::new(GeminiIllustrator::new(client)),
    )
}
