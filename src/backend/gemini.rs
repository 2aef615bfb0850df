//! Minimal client for the Gemini `generateContent` endpoint.

use crate::config::BackendConfig;
use crate::defaults;
use crate::error::{LifeTalesError, Result};
use crate::stages::illustrator::Illustration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for text, structured, audio and image generation.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    text_model: String,
    image_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

/// Look up the API key in `primary`, then in the fallback variable.
///
/// Blank values count as missing.
pub fn resolve_api_key<F>(primary: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    [primary, defaults::API_KEY_ENV_FALLBACK]
        .into_iter()
        .filter_map(|var| lookup(var))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or_else(|| LifeTalesError::MissingApiKey {
            env_var: primary.to_string(),
        })
}

impl GeminiClient {
    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_key_env, |var| std::env::var(var).ok())?;
        Self::new(config, api_key)
    }

    pub fn new(config: &BackendConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LifeTalesError::BackendRequest {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        tracing::debug!(model, "generateContent");
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LifeTalesError::BackendRequest {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LifeTalesError::BackendStatus {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| LifeTalesError::BackendResponse {
                message: e.to_string(),
            })
    }

    /// Free-form text generation.
    pub async fn generate_text(&self, prompt: &str, temperature: Option<f32>) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: temperature.map(|t| GenerationConfig {
                temperature: Some(t),
                ..Default::default()
            }),
        };
        let response = self.generate(&self.text_model, &request).await?;
        Ok(response.text())
    }

    /// JSON output constrained by `schema`. Returns the raw JSON text.
    pub async fn generate_structured(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
                ..Default::default()
            }),
        };
        let response = self.generate(&self.text_model, &request).await?;
        Ok(response.text())
    }

    /// Transcribe base64-encoded audio.
    pub async fn transcribe(
        &self,
        audio_base64: &str,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![
                Part::inline(mime_type, audio_base64),
                Part::text(instruction),
            ])],
            generation_config: None,
        };
        let response = self.generate(&self.text_model, &request).await?;
        Ok(response.text())
    }

    /// Generate an image; `None` when the response carries no inline image.
    pub async fn generate_image(&self, prompt: &str) -> Result<Option<Illustration>> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: None,
        };
        let response = self.generate(&self.image_model, &request).await?;
        Ok(response.first_inline_image())
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Concatenated text parts of the first candidate. Empty when there are none.
    pub fn text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>()
    }

    pub fn first_inline_image(&self) -> Option<Illustration> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| Illustration::new(d.mime_type.clone(), d.data.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
