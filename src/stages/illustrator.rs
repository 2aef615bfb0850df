//! Illustration: a decorative image for a chapter.

use crate::error::{LifeTalesError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Encoded image produced by the illustration stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illustration {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl Illustration {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// `data:` URL usable directly as an image source.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decoded image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| LifeTalesError::Illustration {
                message: format!("invalid base64 image data: {e}"),
            })
    }
}

/// Trait for illustration generation.
///
/// `Ok(None)` means the backend answered without an image.
#[async_trait]
pub trait Illustrator: Send + Sync {
    async fn illustrate(&self, narrative: &str, mood: &str) -> Result<Option<Illustration>>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Illustrator + ?Sized> Illustrator for Arc<T> {
    async fn illustrate(&self, narrative: &str, mood: &str) -> Result<Option<Illustration>> {
        (**self).illustrate(narrative, mood).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Illustrator that never produces an image.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIllustrator;

#[async_trait]
impl Illustrator for NoIllustrator {
    async fn illustrate(&self, _narrative: &str, _mood: &str) -> Result<Option<Illustration>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Mock illustrator for testing
#[derive(Debug, Clone)]
pub struct MockIllustrator {
    response: Option<Illustration>,
    should_fail: bool,
    delay: Option<Duration>,
}

impl MockIllustrator {
    pub fn new() -> Self {
        Self {
            response: Some(Illustration::new("image/png", "iVBORw0KGgo=")),
            should_fail: false,
            delay: None,
        }
    }

    /// Answer without an image.
    pub fn empty(mut self) -> Self {
        self.response = None;
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

impl Default for MockIllustrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Illustrator for MockIllustrator {
    async fn illustrate(&self, _narrative: &str, _mood: &str) -> Result<Option<Illustration>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(LifeTalesError::Illustration {
                message: "mock illustration failure".to_string(),
            });
        }
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
