//! Semantic analysis: mood label and topic tags.

use crate::error::{LifeTalesError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Mood and tags derived from a memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub mood: String,
    pub tags: Vec<String>,
}

impl Analysis {
    pub fn new(mood: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            mood: mood.into(),
            tags,
        }
    }
}

/// Trait for structured semantic analysis.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Derive mood and tags from text.
    ///
    /// Malformed structured output is an error, never a panic.
    async fn analyze(&self, text: &str) -> Result<Analysis>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Analyzer + ?Sized> Analyzer for Arc<T> {
    async fn analyze(&self, text: &str) -> Result<Analysis> {
        (**self).analyze(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Response schema requested from the structured-output backend.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "mood": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["mood", "tags"]
    })
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    mood: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Parse and validate structured analysis output.
///
/// A missing or blank mood is rejected so callers fall back to the
/// configured default. Tags are trimmed, blanks dropped and duplicates
/// removed, keeping first occurrence order.
pub fn parse_analysis(json: &str) -> Result<Analysis> {
    let raw: RawAnalysis =
        serde_json::from_str(strip_code_fence(json)).map_err(|e| LifeTalesError::Analysis {
            message: format!("malformed analysis output: {e}"),
        })?;

    let mood = raw
        .mood
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| LifeTalesError::Analysis {
            message: "analysis output has no mood".to_string(),
        })?;

    Ok(Analysis {
        mood,
        tags: normalize_tags(raw.tags.unwrap_or_default()),
    })
}

/// Trim tags, drop blanks and repeated entries.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

// Some models wrap JSON in ```json fences even in structured mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Mock analyzer for testing
#[derive(Debug, Clone)]
pub struct MockAnalyzer {
    response: Analysis,
    should_fail: bool,
    delay: Option<Duration>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            response: Analysis::new("Peaceful", vec!["Memory".to_string()]),
            should_fail: false,
            delay: None,
        }
    }

    pub fn with_response(mut self, mood: &str, tags: &[&str]) -> Self {
        self.response = Analysis::new(mood, tags.iter().map(|t| t.to_string()).collect());
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
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<Analysis> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(LifeTalesError::Analysis {
                message: "mock analysis failure".to_string(),
            });
        }
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_analysis() {
        let analysis =
            parse_analysis(r#"{"mood": "Excited", "tags": ["Travel", "Kyoto", "Spring"]}"#)
                .unwrap();
        assert_eq!(analysis.mood, "Excited");
        assert_eq!(analysis.tags, vec!["Travel", "Kyoto", "Spring"]);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let result = parse_analysis("mood: happy");
        assert!(matches!(result, Err(LifeTalesError::Analysis { .. })));
    }

    #[test]
    fn parse_rejects_missing_mood() {
        assert!(parse_analysis(r#"{"tags": ["Life"]}"#).is_err());
    }

    #[test]
    fn parse_rejects_blank_mood() {
        assert!(parse_analysis(r#"{"mood": "   ", "tags": []}"#).is_err());
    }

    #[test]
    fn parse_missing_tags_yields_empty_list() {
        let analysis = parse_analysis(r#"{"mood": "Calm"}"#).unwrap();
        assert!(analysis.tags.is_empty());
    }

    #[test]
    fn parse_strips_code_fence() {
        let analysis = parse_analysis("```json\n{\"mood\": \"Nostalgic\", \"tags\": []}\n```")
            .unwrap();
        assert_eq!(analysis.mood, "Nostalgic");
    }

    #[test]
    fn normalize_tags_trims_and_dedups() {
        let tags = normalize_tags(vec![
            " Family ".to_string(),
            "".to_string(),
            "family".to_string(),
            "Garden".to_string(),
        ]);
        assert_eq!(tags, vec!["Family", "Garden"]);
    }

    #[test]
    fn response_schema_requires_mood_and_tags() {
        let schema = response_schema();
        assert_eq!(schema["properties"]["tags"]["type"], "ARRAY");
        assert_eq!(schema["required"], serde_json::json!(["mood", "tags"]));
    }

    #[tokio::test]
    async fn mock_analyzer_returns_configured_response() {
        let analyzer = MockAnalyzer::new().with_response("Joyful", &["Beach"]);
        let analysis = analyzer.analyze("a day at the beach").await.unwrap();
        assert_eq!(analysis, Analysis::new("Joyful", vec!["Beach".to_string()]));
    }

    #[tokio::test]
    async fn mock_analyzer_fails_when_configured() {
        let analyzer = MockAnalyzer::new().with_failure();
        assert!(analyzer.analyze("text").await.is_err());
    }
}
