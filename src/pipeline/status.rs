//! Pipeline phases and the events that announce them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Phase of the memory pipeline. Exactly one is active per orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    #[default]
    Idle,
    Listening,
    Transcribing,
    Analyzing,
    Weaving,
    Illustrating,
    Completed,
    Error,
}

impl AgentStatus {
    /// Operator-facing message for this phase.
    pub fn message(self) -> &'static str {
        match self {
            Self::Idle => "Ready to listen...",
            Self::Listening => "Listening...",
            Self::Transcribing => "Speech agent is transcribing...",
            Self::Analyzing => "Semantic agent is finding meaning...",
            Self::Weaving => "Story builder is writing the chapter...",
            Self::Illustrating => "Visual agent is painting the scene...",
            Self::Completed => "Memory preserved.",
            Self::Error => "Something went wrong.",
        }
    }

    /// A run has ended in this phase; only a reset to Idle follows.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// A stage is executing.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Transcribing | Self::Analyzing | Self::Weaving | Self::Illustrating
        )
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "IDLE",
            Self::Listening => "LISTENING",
            Self::Transcribing => "TRANSCRIBING",
            Self::Analyzing => "ANALYZING",
            Self::Weaving => "WEAVING",
            Self::Illustrating => "ILLUSTRATING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Identifier of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status transition broadcast to observers.
///
/// `run_id` is `None` for caller-driven transitions (Listening, Idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub run_id: Option<RunId>,
    pub status: AgentStatus,
}
