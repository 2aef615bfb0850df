//! Data types flowing through the memory pipeline.

use crate::defaults;
use crate::stages::illustrator::Illustration;
use serde::{Deserialize, Serialize};

/// Encoded audio handed to the transcription stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// Raw encoded bytes (webm, mp3, wav, ...).
    pub bytes: Vec<u8>,
    /// Mime type of `bytes`, e.g. `audio/webm`.
    pub mime_type: String,
}

impl AudioPayload {
    /// Creates a payload with an explicit mime type.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Base64 form of the payload, as most backends expect it inline.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// What the caller captured: audio to transcribe, or text typed directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryInput {
    Audio(AudioPayload),
    Text(String),
}

/// Discriminant of [`MemoryInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Audio,
    Text,
}

impl MemoryInput {
    /// Audio input with a known mime type.
    pub fn audio(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self::Audio(AudioPayload::new(bytes, mime_type))
    }

    /// Audio input whose encoding is unknown; assumes the recorder default.
    pub fn audio_unlabeled(bytes: Vec<u8>) -> Self {
        Self::audio(bytes, defaults::DEFAULT_AUDIO_MIME)
    }

    /// Text input; skips transcription.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn kind(&self) -> InputKind {
        match self {
            Self::Audio(_) => InputKind::Audio,
            Self::Text(_) => InputKind::Text,
        }
    }

    /// Text input with nothing but whitespace. Audio is never blank here;
    /// an empty transcription is judged after the transcription stage.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

/// Per-run configuration handed to narrative synthesis.
///
/// Derived from the target story right before a run; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Recent narratives, oldest first.
    pub story_context: String,
    /// Free-form style hint.
    pub style: String,
}

impl PipelineConfig {
    pub fn new(story_context: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            story_context: story_context.into(),
            style: style.into(),
        }
    }

    /// True when there is no earlier narrative to stay continuous with.
    pub fn has_context(&self) -> bool {
        !self.story_context.trim().is_empty()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(String::new(), defaults::DEFAULT_STYLE)
    }
}

/// Aggregated result of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Text the chapter was built from (transcribed or typed).
    pub transcription: String,
    /// Synthesized prose; the transcription itself when synthesis failed.
    pub narrative: String,
    pub mood: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration: Option<Illustration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_input_kind() {
        assert_eq!(MemoryInput::text("hello").kind(), InputKind::Text);
        assert_eq!(
            MemoryInput::audio(vec![1, 2, 3], "audio/mp3").kind(),
            InputKind::Audio
        );
    }

    #[test]
    fn test_blank_input() {
        assert!(MemoryInput::text(" \n\t").is_blank());
        assert!(!MemoryInput::text("a walk").is_blank());
        assert!(!MemoryInput::audio(Vec::new(), "audio/webm").is_blank());
    }

    #[test]
    fn test_unlabeled_audio_uses_default_mime() {
        match MemoryInput::audio_unlabeled(vec![0u8; 4]) {
            MemoryInput::Audio(payload) => assert_eq!(payload.mime_type, "audio/webm"),
            other => panic!("Expected audio input, got {:?}", other),
        }
    }

    #[test]
    fn test_audio_payload_base64() {
        let payload = AudioPayload::new(b"hi!".to_vec(), "audio/wav");
        assert_eq!(payload.to_base64(), "aGkh");
    }

    #[test]
    fn test_pipeline_config_default_has_no_context() {
        let config = PipelineConfig::default();
        assert!(!config.has_context());
        assert_eq!(config.style, "narrative");
    }

    #[test]
    fn test_pipeline_config_whitespace_context_is_empty() {
        let config = PipelineConfig::new("   ", "narrative");
        assert!(!config.has_context());
    }

    #[test]
    fn test_agent_response_omits_missing_illustration() {
        let response = AgentResponse {
            transcription: "raw".to_string(),
            narrative: "prose".to_string(),
            mood: "Calm".to_string(),
            tags: vec!["Sea".to_string()],
            illustration: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("illustration"));
    }
}
