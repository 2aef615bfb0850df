//! Pipeline errors and reporting of degraded stages.

use std::fmt;
use thiserror::Error;

/// Errors that escape the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Audio could not be turned into text; nothing to build a chapter from.
    #[error("Transcription failed: {message}")]
    TranscriptionFailed { message: String },

    /// Text input carried nothing to build a chapter from.
    #[error("Memory input is empty")]
    EmptyInput,

    /// Another run is still in flight on this orchestrator.
    #[error("A pipeline run is already in progress")]
    AlreadyRunning,
}

/// Non-fatal stage outcome. Absorbed by the orchestrator, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Analysis failed; fallback mood and tags were used.
    AnalysisDegraded { reason: String },
    /// Synthesis failed; the raw text became the narrative.
    SynthesisDegraded { reason: String },
    /// Illustration failed or produced nothing.
    IllustrationOmitted { reason: String },
}

impl Degradation {
    /// Name of the stage that degraded.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::AnalysisDegraded { .. } => "analysis",
            Self::SynthesisDegraded { .. } => "synthesis",
            Self::IllustrationOmitted { .. } => "illustration",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::AnalysisDegraded { reason }
            | Self::SynthesisDegraded { reason }
            | Self::IllustrationOmitted { reason } => reason,
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnalysisDegraded { reason } => {
                write!(f, "analysis degraded, using fallback mood/tags: {}", reason)
            }
            Self::SynthesisDegraded { reason } => {
                write!(f, "synthesis degraded, keeping raw text: {}", reason)
            }
            Self::IllustrationOmitted { reason } => {
                write!(f, "illustration omitted: {}", reason)
            }
        }
    }
}

/// Trait for observing degraded stages.
pub trait DegradeReporter: Send + Sync {
    /// Reports a degradation that happened during a run.
    fn report(&self, run: &str, degradation: &Degradation);
}

/// Reporter that writes degradations to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl DegradeReporter for LogReporter {
    fn report(&self, run: &str, degradation: &Degradation) {
        match degradation {
            Degradation::IllustrationOmitted { .. } => {
                tracing::debug!(run, stage = degradation.stage(), "{}", degradation)
            }
            _ => tracing::warn!(run, stage = degradation.stage(), "{}", degradation),
        }
    }
}
