use crate::error::{LifeTalesError, Result};
use crate::pipeline::types::AudioPayload;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real backend vs mock).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe encoded audio to text.
    ///
    /// Must fail explicitly on invalid encoding or an unreachable backend.
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String>;

    /// Name of the backend, for logging.
    fn name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> to allow sharing across sessions.
#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        (**self).transcribe(audio).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new() -> Self {
        Self {
            response: "mock transcription".to_string(),
            should_fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of transcribe calls so far (shared between clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(LifeTalesError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        if audio.mime_type.is_empty() {
            return Err(LifeTalesError::Transcription {
                message: "missing audio mime type".to_string(),
            });
        }
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
