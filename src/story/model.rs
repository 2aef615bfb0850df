//! Story spaces and their chapters.

use crate::error::Result;
use crate::pipeline::types::{AgentResponse, InputKind};
use crate::stages::illustrator::Illustration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Where a chapter's raw input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Voice,
    Image,
    Text,
}

impl From<InputKind> for MediaType {
    fn from(kind: InputKind) -> Self {
        match kind {
            InputKind::Audio => Self::Voice,
            InputKind::Text => Self::Text,
        }
    }
}

/// One recorded and synthesized memory. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    id: String,
    timestamp: DateTime<Utc>,
    raw_input: String,
    narrative: String,
    mood: String,
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    illustration: Option<Illustration>,
    media_type: MediaType,
}

impl Chapter {
    /// Build a chapter from a completed pipeline run.
    ///
    /// The narrative falls back to the raw input when blank.
    pub fn from_response(response: AgentResponse, media_type: MediaType) -> Self {
        Self::from_response_at(response, media_type, Utc::now())
    }

    /// Same as [`Chapter::from_response`] with an explicit timestamp.
    pub fn from_response_at(
        response: AgentResponse,
        media_type: MediaType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let narrative = if response.narrative.trim().is_empty() {
            response.transcription.clone()
        } else {
            response.narrative
        };
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            raw_input: response.transcription,
            narrative,
            mood: response.mood,
            tags: response.tags,
            illustration: response.illustration,
            media_type,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    pub fn mood(&self) -> &str {
        &self.mood
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn illustration(&self) -> Option<&Illustration> {
        self.illustration.as_ref()
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }
}

/// A named thread of chapters, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySpace {
    id: String,
    title: String,
    theme: String,
    created_at: DateTime<Utc>,
    chapters: VecDeque<Chapter>,
}

impl StorySpace {
    pub(crate) fn new(title: String, theme: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            theme,
            created_at: Utc::now(),
            chapters: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Chapters, most recent first.
    pub fn chapters(&self) -> impl ExactSizeIterator<Item = &Chapter> + DoubleEndedIterator {
        self.chapters.iter()
    }

    /// Up to `n` most recent chapters, most recent first.
    pub fn recent_chapters(&self, n: usize) -> impl DoubleEndedIterator<Item = &Chapter> {
        self.chapters.iter().take(n)
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Most recent chapter.
    pub fn latest(&self) -> Option<&Chapter> {
        self.chapters.front()
    }

    pub(crate) fn prepend(&mut self, chapter: Chapter) {
        self.chapters.push_front(chapter);
    }

    /// Pretty-printed JSON export, chapters newest first.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
