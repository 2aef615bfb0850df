//! Stage contracts of the memory pipeline.
//!
//! ```text
//! audio ──▶ Transcriber ──▶ Analyzer ──▶ Narrator ──▶ Illustrator ──▶ AgentResponse
//!  text ────────────────────────┘
//! ```
//!
//! Each stage is an async trait object so the orchestrator can run against a
//! real backend or the mocks defined next to each trait.

pub mod analyzer;
pub mod illustrator;
pub mod narrator;
pub mod prompt;
pub mod transcriber;

pub use analyzer::{Analysis, Analyzer, MockAnalyzer, parse_analysis};
pub use illustrator::{Illustration, Illustrator, MockIllustrator, NoIllustrator};
pub use narrator::{MockNarrator, Narrator};
pub use transcriber::{MockTranscriber, Transcriber};

use std::sync::Arc;

/// The four stages wired into one orchestrator.
#[derive(Clone)]
pub struct Stages {
    pub transcriber: Arc<dyn Transcriber>,
    pub analyzer: Arc<dyn Analyzer>,
    pub narrator: Arc<dyn Narrator>,
    pub illustrator: Arc<dyn Illustrator>,
}

impl Stages {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<dyn Analyzer>,
        narrator: Arc<dyn Narrator>,
        illustrator: Arc<dyn Illustrator>,
    ) -> Self {
        Self {
            transcriber,
            analyzer,
            narrator,
            illustrator,
        }
    }

    /// All-mock stages that succeed.
    pub fn mock() -> Self {
        Self::new(
            Arc::new(MockTranscriber::new()),
            Arc::new(MockAnalyzer::new()),
            Arc::new(MockNarrator::new()),
            Arc::new(MockIllustrator::new()),
        )
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_illustrator(mut self, illustrator: Arc<dyn Illustrator>) -> Self {
        self.illustrator = illustrator;
        self
    }
}

impl std::fmt::Debug for Stages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stages")
            .field("transcriber", &self.transcriber.name())
            .field("analyzer", &self.analyzer.name())
            .field("narrator", &self.narrator.name())
            .field("illustrator", &self.illustrator.name())
            .finish()
    }
}
