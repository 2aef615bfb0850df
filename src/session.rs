//! Session: the story store and the pipeline wired together.
//!
//! Recording a memory derives context from the target story, runs the
//! pipeline and appends the resulting chapter. Terminal statuses are reset to
//! Idle after the configured display time.

use crate::config::{Config, DisplayConfig, PipelineSettings};
use crate::error::{LifeTalesError, Result};
use crate::pipeline::error::PipelineError;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::status::StatusEvent;
use crate::pipeline::types::{MemoryInput, PipelineConfig};
use crate::stages::Stages;
use crate::story::{Chapter, MediaType, StorySpace, StoryStore, derive_context};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub struct Session {
    store: StoryStore,
    orchestrator: Arc<Orchestrator>,
    pipeline: PipelineSettings,
    display: DisplayConfig,
    pending_reset: Option<JoinHandle<()>>,
}

impl Session {
    /// Build a session whose orchestrator follows the configured degrade
    /// policy and stage timeouts.
    pub fn new(config: &Config, stages: Stages) -> Self {
        let orchestrator = Orchestrator::new(stages)
            .with_analysis_policy(config.analysis.clone())
            .with_timeouts(config.pipeline.stage_timeouts());
        Self::with_orchestrator(config, Arc::new(orchestrator))
    }

    pub fn with_orchestrator(config: &Config, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            store: StoryStore::new(),
            orchestrator,
            pipeline: config.pipeline.clone(),
            display: config.display.clone(),
            pending_reset: None,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.orchestrator.subscribe()
    }

    pub fn store(&self) -> &StoryStore {
        &self.store
    }

    pub fn create_story(&mut self, title: &str, theme: &str) -> Result<&StorySpace> {
        self.store.create_story(title, theme)
    }

    pub fn list_stories(&self) -> &[StorySpace] {
        self.store.list_stories()
    }

    pub fn get_story(&self, story_id: &str) -> Option<&StorySpace> {
        self.store.get_story(story_id)
    }

    /// Pipeline config for the next chapter of `story_id`, with context
    /// derived from the story's current chapters.
    pub fn pipeline_config_for(&self, story_id: &str) -> Result<PipelineConfig> {
        let story = self
            .store
            .get_story(story_id)
            .ok_or_else(|| LifeTalesError::StoryNotFound {
                id: story_id.to_string(),
            })?;
        let context = derive_context(
            story,
            self.pipeline.context_chapters,
            &self.pipeline.context_separator,
        );
        Ok(PipelineConfig::new(context, self.pipeline.style.clone()))
    }

    /// Turn one memory into a chapter of `story_id`.
    ///
    /// Unknown stories and blank text are rejected before any stage runs and
    /// leave a pending status reset in place. On a fatal pipeline error the
    /// store is left untouched.
    pub async fn record_memory(&mut self, story_id: &str, input: MemoryInput) -> Result<Chapter> {
        let config = self.pipeline_config_for(story_id)?;
        if input.is_blank() {
            return Err(PipelineError::EmptyInput.into());
        }
        self.cancel_pending_reset();
        let media_type = MediaType::from(input.kind());

        match self.orchestrator.run(input, &config).await {
            Ok(response) => {
                let chapter = Chapter::from_response(response, media_type);
                self.store.append_chapter(story_id, chapter.clone())?;
                tracing::info!(
                    story = story_id,
                    chapter = chapter.id(),
                    mood = chapter.mood(),
                    "chapter recorded"
                );
                self.schedule_reset(Duration::from_millis(self.display.completed_ms));
                Ok(chapter)
            }
            Err(e) => {
                tracing::warn!(story = story_id, "memory not recorded: {}", e);
                // Rejected runs emit no status, so there is nothing to reset.
                if matches!(e, PipelineError::TranscriptionFailed { .. }) {
                    self.schedule_reset(Duration::from_millis(self.display.error_ms));
                }
                Err(e.into())
            }
        }
    }

    fn cancel_pending_reset(&mut self) {
        if let Some(handle) = self.pending_reset.take() {
            handle.abort();
        }
    }

    fn schedule_reset(&mut self, after: Duration) {
        self.cancel_pending_reset();
        let orchestrator = Arc::clone(&self.orchestrator);
        self.pending_reset = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            orchestrator.reset();
        }));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_pending_reset();
    }
}
