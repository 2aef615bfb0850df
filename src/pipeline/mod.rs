//! Memory pipeline: status model, orchestration and error policy.
//!
//! A run turns one [`MemoryInput`] into an [`AgentResponse`], publishing an
//! [`AgentStatus`] per stage on a broadcast channel.

pub mod error;
pub mod orchestrator;
pub mod status;
pub mod types;

pub use error::{Degradation, DegradeReporter, LogReporter, PipelineError};
pub use orchestrator::Orchestrator;
pub use status::{AgentStatus, RunId, StatusEvent};
pub use types::{AgentResponse, AudioPayload, InputKind, MemoryInput, PipelineConfig};
