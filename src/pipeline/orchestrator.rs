//! Memory pipeline: Transcriber → Analyzer → Narrator → Illustrator.
//!
//! Stages run strictly in sequence because each consumes the previous
//! stage's output. Transcription failure is fatal; the other stages degrade
//! to safe defaults so the user's words are never lost.

use crate::config::{AnalysisConfig, StageTimeouts};
use crate::defaults;
use crate::pipeline::error::{Degradation, DegradeReporter, LogReporter, PipelineError};
use crate::pipeline::status::{AgentStatus, RunId, StatusEvent};
use crate::pipeline::types::{AgentResponse, AudioPayload, MemoryInput, PipelineConfig};
use crate::stages::analyzer::{Analysis, normalize_tags};
use crate::stages::illustrator::Illustration;
use crate::stages::Stages;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::Instrument;

/// Sequences the four stages and reports status transitions.
///
/// One run at a time: a second `run` while one is in flight is rejected with
/// [`PipelineError::AlreadyRunning`].
pub struct Orchestrator {
    stages: Stages,
    analysis_policy: AnalysisConfig,
    timeouts: StageTimeouts,
    reporter: Arc<dyn DegradeReporter>,
    status_tx: broadcast::Sender<StatusEvent>,
    current: RwLock<AgentStatus>,
    in_flight: AtomicBool,
}

/// Releases the single-flight slot when a run ends or its future is dropped.
struct RunGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(in_flight: &'a AtomicBool) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { in_flight })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Outcome of a stage call bounded by a timeout.
enum StageOutcome<T> {
    Done(T),
    Failed(String),
}

async fn bounded<T, F>(limit: Duration, stage: F) -> StageOutcome<T>
where
    F: Future<Output = crate::error::Result<T>>,
{
    match tokio::time::timeout(limit, stage).await {
        Ok(Ok(value)) => StageOutcome::Done(value),
        Ok(Err(e)) => StageOutcome::Failed(e.to_string()),
        Err(_) => StageOutcome::Failed(format!("timed out after {}s", limit.as_secs_f32())),
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the default degrade policy and timeouts.
    pub fn new(stages: Stages) -> Self {
        let (status_tx, _) = broadcast::channel(defaults::STATUS_CHANNEL_CAPACITY);
        Self {
            stages,
            analysis_policy: AnalysisConfig::default(),
            timeouts: StageTimeouts::default(),
            reporter: Arc::new(LogReporter),
            status_tx,
            current: RwLock::new(AgentStatus::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Sets the fallback mood and tags used when analysis fails.
    ///
    /// A blank fallback mood is replaced by the default one so a run never
    /// yields an empty mood.
    pub fn with_analysis_policy(mut self, mut policy: AnalysisConfig) -> Self {
        let mood = policy.fallback_mood.trim();
        policy.fallback_mood = if mood.is_empty() {
            tracing::warn!(
                default = defaults::FALLBACK_MOOD,
                "blank fallback mood, using default"
            );
            defaults::FALLBACK_MOOD.to_string()
        } else {
            mood.to_string()
        };
        self.analysis_policy = policy;
        self
    }

    /// Sets per-stage timeouts.
    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets a custom degradation reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn DegradeReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Subscribe to status transitions. Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// The currently active status.
    pub fn status(&self) -> AgentStatus {
        self.current
            .read()
            .map(|s| *s)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    /// Returns true while a run is in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Caller-driven return to Idle after a terminal status was displayed.
    ///
    /// Ignored while a run is in flight; returns whether the status changed.
    pub fn reset(&self) -> bool {
        self.caller_transition(AgentStatus::Idle)
    }

    /// Caller-driven transition while audio is being captured.
    pub fn mark_listening(&self) -> bool {
        self.caller_transition(AgentStatus::Listening)
    }

    fn caller_transition(&self, status: AgentStatus) -> bool {
        if self.is_running() || self.status() == status {
            return false;
        }
        self.publish(None, status);
        true
    }

    fn publish(&self, run_id: Option<RunId>, status: AgentStatus) {
        match self.current.write() {
            Ok(mut current) => *current = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
        if self.status_tx.send(StatusEvent { run_id, status }).is_err() {
            tracing::trace!(%status, "no status subscribers");
        }
    }

    /// Runs the pipeline, reporting status on the broadcast channel.
    pub async fn run(
        &self,
        input: MemoryInput,
        config: &PipelineConfig,
    ) -> Result<AgentResponse, PipelineError> {
        self.run_with_callback(input, config, |_| {}).await
    }

    /// Runs the pipeline, additionally feeding each status to `on_status`.
    pub async fn run_with_callback<F>(
        &self,
        input: MemoryInput,
        config: &PipelineConfig,
        mut on_status: F,
    ) -> Result<AgentResponse, PipelineError>
    where
        F: FnMut(AgentStatus) + Send,
    {
        if input.is_blank() {
            return Err(PipelineError::EmptyInput);
        }

        let Some(_guard) = RunGuard::acquire(&self.in_flight) else {
            tracing::warn!("rejecting overlapping pipeline run");
            return Err(PipelineError::AlreadyRunning);
        };

        let run_id = RunId::new();
        let span = tracing::info_span!("pipeline_run", run = %run_id);
        self.execute(run_id, input, config, &mut on_status)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        run_id: RunId,
        input: MemoryInput,
        config: &PipelineConfig,
        on_status: &mut (dyn FnMut(AgentStatus) + Send),
    ) -> Result<AgentResponse, PipelineError> {
        let started = Instant::now();
        let run = run_id.to_string();
        let mut emit = |status: AgentStatus| {
            tracing::debug!(%status, "status");
            on_status(status);
            self.publish(Some(run_id), status);
        };

        tracing::info!(kind = ?input.kind(), context = config.has_context(), "pipeline run started");

        // Stage 1: acquisition
        let raw_text = match input {
            MemoryInput::Audio(audio) => {
                emit(AgentStatus::Transcribing);
                match self.transcribe(&audio).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        emit(AgentStatus::Error);
                        return Err(e);
                    }
                }
            }
            MemoryInput::Text(text) => text,
        };

        // Stage 2: mood and tags
        emit(AgentStatus::Analyzing);
        let analysis = self.analyze(&run, &raw_text).await;

        // Stage 3: prose
        emit(AgentStatus::Weaving);
        let narrative = self.narrate(&run, &raw_text, config).await;

        // Stage 4: decoration
        emit(AgentStatus::Illustrating);
        let illustration = self.illustrate(&run, &narrative, &analysis.mood).await;

        let response = AgentResponse {
            transcription: raw_text,
            narrative,
            mood: analysis.mood,
            tags: analysis.tags,
            illustration,
        };

        emit(AgentStatus::Completed);
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            mood = %response.mood,
            illustrated = response.illustration.is_some(),
            "pipeline run completed"
        );
        Ok(response)
    }

    async fn transcribe(&self, audio: &AudioPayload) -> Result<String, PipelineError> {
        let transcriber = &self.stages.transcriber;
        match bounded(self.timeouts.transcription, transcriber.transcribe(audio)).await {
            StageOutcome::Done(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            StageOutcome::Done(_) => Err(PipelineError::TranscriptionFailed {
                message: format!("{} returned no text", transcriber.name()),
            }),
            StageOutcome::Failed(message) => Err(PipelineError::TranscriptionFailed { message }),
        }
    }

    async fn analyze(&self, run: &str, text: &str) -> Analysis {
        let outcome = bounded(self.timeouts.analysis, self.stages.analyzer.analyze(text)).await;
        match outcome {
            StageOutcome::Done(analysis) if !analysis.mood.trim().is_empty() => Analysis {
                mood: analysis.mood.trim().to_string(),
                tags: normalize_tags(analysis.tags),
            },
            StageOutcome::Done(_) => self.analysis_fallback(run, "analysis returned an empty mood"),
            StageOutcome::Failed(reason) => self.analysis_fallback(run, &reason),
        }
    }

    fn analysis_fallback(&self, run: &str, reason: &str) -> Analysis {
        self.reporter.report(
            run,
            &Degradation::AnalysisDegraded {
                reason: reason.to_string(),
            },
        );
        Analysis {
            mood: self.analysis_policy.fallback_mood.clone(),
            tags: self.analysis_policy.fallback_tags.clone(),
        }
    }

    async fn narrate(&self, run: &str, raw_text: &str, config: &PipelineConfig) -> String {
        let outcome = bounded(
            self.timeouts.synthesis,
            self.stages.narrator.narrate(raw_text, config),
        )
        .await;
        let reason = match outcome {
            StageOutcome::Done(prose) if !prose.trim().is_empty() => {
                return prose.trim().to_string();
            }
            StageOutcome::Done(_) => "synthesis returned no text".to_string(),
            StageOutcome::Failed(reason) => reason,
        };
        self.reporter
            .report(run, &Degradation::SynthesisDegraded { reason });
        raw_text.to_string()
    }

    async fn illustrate(&self, run: &str, narrative: &str, mood: &str) -> Option<Illustration> {
        let outcome = bounded(
            self.timeouts.illustration,
            self.stages.illustrator.illustrate(narrative, mood),
        )
        .await;
        let reason = match outcome {
            StageOutcome::Done(Some(image)) => return Some(image),
            StageOutcome::Done(None) => "no image returned".to_string(),
            StageOutcome::Failed(reason) => reason,
        };
        self.reporter
            .report(run, &Degradation::IllustrationOmitted { reason });
        None
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stages)
            .field("status", &self.status())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{MockAnalyzer, MockIllustrator, MockNarrator, MockTranscriber};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingReporter {
        seen: Mutex<Vec<Degradation>>,
    }

    impl CollectingReporter {
        fn stages(&self) -> Vec<&'static str> {
            self.seen.lock().unwrap().iter().map(|d| d.stage()).collect()
        }
    }

    impl DegradeReporter for CollectingReporter {
        fn report(&self, _run: &str, degradation: &Degradation) {
            self.seen.lock().unwrap().push(degradation.clone());
        }
    }

    fn audio() -> MemoryInput {
        MemoryInput::audio(vec![0u8; 32], "audio/webm")
    }

    fn collect_statuses(rx: &mut broadcast::Receiver<StatusEvent>) -> Vec<AgentStatus> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event.status);
        }
        out
    }

    #[tokio::test]
    async fn test_successful_audio_run_emits_full_sequence() {
        let orchestrator = Orchestrator::new(
            Stages::mock()
                .with_transcriber(Arc::new(MockTranscriber::new().with_response("we sailed")))
                .with_narrator(Arc::new(MockNarrator::new().with_response("We sailed at dawn."))),
        );
        let mut rx = orchestrator.subscribe();

        let response = orchestrator
            .run(audio(), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(response.transcription, "we sailed");
        assert_eq!(response.narrative, "We sailed at dawn.");
        assert_eq!(response.mood, "Peaceful");
        assert!(response.illustration.is_some());
        assert_eq!(
            collect_statuses(&mut rx),
            vec![
                AgentStatus::Transcribing,
                AgentStatus::Analyzing,
                AgentStatus::Weaving,
                AgentStatus::Illustrating,
                AgentStatus::Completed,
            ]
        );
        assert_eq!(orchestrator.status(), AgentStatus::Completed);
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_text_input_skips_transcription() {
        let transcriber = MockTranscriber::new();
        let orchestrator =
            Orchestrator::new(Stages::mock().with_transcriber(Arc::new(transcriber.clone())));
        let mut seen = Vec::new();

        let response = orchestrator
            .run_with_callback(
                MemoryInput::text("typed note"),
                &PipelineConfig::default(),
                |s| seen.push(s),
            )
            .await
            .unwrap();

        assert_eq!(response.transcription, "typed note");
        assert_eq!(transcriber.calls(), 0);
        assert_eq!(seen.first(), Some(&AgentStatus::Analyzing));
        assert!(!seen.contains(&AgentStatus::Transcribing));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_status() {
        let orchestrator = Orchestrator::new(Stages::mock());
        let mut rx = orchestrator.subscribe();

        let result = orchestrator
            .run(MemoryInput::text("  \n"), &PipelineConfig::default())
            .await;

        assert_eq!(result, Err(PipelineError::EmptyInput));
        assert!(collect_statuses(&mut rx).is_empty());
        assert_eq!(orchestrator.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_transcription_failure_is_fatal() {
        let narrator = MockNarrator::new();
        let orchestrator = Orchestrator::new(
            Stages::mock()
                .with_transcriber(Arc::new(MockTranscriber::new().with_failure()))
                .with_narrator(Arc::new(narrator.clone())),
        );
        let mut rx = orchestrator.subscribe();

        let result = orchestrator.run(audio(), &PipelineConfig::default()).await;

        assert!(matches!(
            result,
            Err(PipelineError::TranscriptionFailed { .. })
        ));
        assert_eq!(
            collect_statuses(&mut rx),
            vec![AgentStatus::Transcribing, AgentStatus::Error]
        );
        assert!(narrator.seen_configs().is_empty());
        assert_eq!(orchestrator.status(), AgentStatus::Error);
    }

    #[tokio::test]
    async fn test_blank_transcription_is_fatal() {
        let orchestrator = Orchestrator::new(
            Stages::mock().with_transcriber(Arc::new(MockTranscriber::new().with_response("  "))),
        );
        let result = orchestrator.run(audio(), &PipelineConfig::default()).await;
        assert!(matches!(
            result,
            Err(PipelineError::TranscriptionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_analysis_failure_uses_fallback() {
        let reporter = Arc::new(CollectingReporter::default());
        let orchestrator = Orchestrator::new(
            Stages::mock().with_analyzer(Arc::new(MockAnalyzer::new().with_failure())),
        )
        .with_reporter(reporter.clone());

        let response = orchestrator
            .run(MemoryInput::text("a day"), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(response.mood, "Reflective");
        assert_eq!(response.tags, vec!["Life".to_string()]);
        assert!(!response.narrative.is_empty());
        assert_eq!(orchestrator.status(), AgentStatus::Completed);
        assert_eq!(reporter.stages(), vec!["analysis"]);
    }

    #[tokio::test]
    async fn test_analysis_fallback_policy_is_configurable() {
        let orchestrator = Orchestrator::new(
            Stages::mock().with_analyzer(Arc::new(MockAnalyzer::new().with_failure())),
        )
        .with_analysis_policy(AnalysisConfig {
            fallback_mood: "Quiet".to_string(),
            fallback_tags: vec!["Journal".to_string()],
        });

        let response = orchestrator
            .run(MemoryInput::text("a day"), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(response.mood, "Quiet");
        assert_eq!(response.tags, vec!["Journal".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_fallback_mood_policy_uses_default() {
        let orchestrator = Orchestrator::new(
            Stages::mock().with_analyzer(Arc::new(MockAnalyzer::new().with_failure())),
        )
        .with_analysis_policy(AnalysisConfig {
            fallback_mood: "  ".to_string(),
            fallback_tags: vec!["Journal".to_string()],
        });

        let response = orchestrator
            .run(MemoryInput::text("a day"), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(response.mood, "Reflective");
        assert_eq!(response.tags, vec!["Journal".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_mood_from_analyzer_uses_fallback() {
        let orchestrator = Orchestrator::new(
            Stages::mock().with_analyzer(Arc::new(MockAnalyzer::new().with_response(" ", &["x"]))),
        );
        let response = orchestrator
            .run(MemoryInput::text("a day"), &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(response.mood, "Reflective");
    }

    #[tokio::test]
    async fn test_synthesis_failure_falls_back_to_raw_text() {
        let reporter = Arc::new(CollectingReporter::default());
        let orchestrator = Orchestrator::new(
            Stages::mock().with_narrator(Arc::new(MockNarrator::new().with_failure())),
        )
        .with_reporter(reporter.clone());

        let response = orchestrator
            .run(MemoryInput::text("my raw words"), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(response.narrative, "my raw words");
        assert_eq!(reporter.stages(), vec!["synthesis"]);
    }

    #[tokio::test]
    async fn test_blank_synthesis_falls_back_to_raw_text() {
        let orchestrator = Orchestrator::new(
            Stages::mock().with_narrator(Arc::new(MockNarrator::new().with_response("\n"))),
        );
        let response = orchestrator
            .run(MemoryInput::text("kept"), &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(response.narrative, "kept");
    }

    #[tokio::test]
    async fn test_illustration_failure_is_silent() {
        let orchestrator = Orchestrator::new(
            Stages::mock().with_illustrator(Arc::new(MockIllustrator::new().with_failure())),
        );
        let mut rx = orchestrator.subscribe();

        let response = orchestrator
            .run(MemoryInput::text("sunset"), &PipelineConfig::default())
            .await
            .unwrap();

        assert!(response.illustration.is_none());
        let statuses = collect_statuses(&mut rx);
        assert_eq!(statuses.last(), Some(&AgentStatus::Completed));
        assert!(!statuses.contains(&AgentStatus::Error));
    }

    #[tokio::test]
    async fn test_narrator_receives_pipeline_config() {
        let narrator = MockNarrator::new();
        let orchestrator = Orchestrator::new(Stages::mock().with_narrator(Arc::new(narrator.clone())));
        let config = PipelineConfig::new("Earlier we met.", "narrative");

        orchestrator
            .run(MemoryInput::text("then we talked"), &config)
            .await
            .unwrap();

        assert_eq!(narrator.seen_configs(), vec![config]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcription_timeout_is_fatal() {
        let orchestrator = Orchestrator::new(Stages::mock().with_transcriber(Arc::new(
            MockTranscriber::new().with_delay(Duration::from_secs(600)),
        )))
        .with_timeouts(StageTimeouts {
            transcription: Duration::from_secs(5),
            ..StageTimeouts::default()
        });

        match orchestrator.run(audio(), &PipelineConfig::default()).await {
            Err(PipelineError::TranscriptionFailed { message }) => {
                assert!(message.contains("timed out"), "got: {message}");
            }
            other => panic!("Expected TranscriptionFailed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_enhancement_stages_degrade() {
        let slow = Duration::from_secs(600);
        let orchestrator = Orchestrator::new(
            Stages::mock()
                .with_analyzer(Arc::new(MockAnalyzer::new().with_delay(slow)))
                .with_narrator(Arc::new(MockNarrator::new().with_delay(slow)))
                .with_illustrator(Arc::new(MockIllustrator::new().with_delay(slow))),
        )
        .with_timeouts(StageTimeouts {
            transcription: Duration::from_secs(5),
            analysis: Duration::from_secs(5),
            synthesis: Duration::from_secs(5),
            illustration: Duration::from_secs(5),
        });

        let response = orchestrator
            .run(MemoryInput::text("slow day"), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(response.mood, "Reflective");
        assert_eq!(response.narrative, "slow day");
        assert!(response.illustration.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_run_is_rejected() {
        let orchestrator = Arc::new(Orchestrator::new(Stages::mock().with_narrator(Arc::new(
            MockNarrator::new().with_delay(Duration::from_secs(1)),
        ))));

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run(MemoryInput::text("first"), &PipelineConfig::default())
                    .await
            })
        };
        // Let the first run reach the narrator
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(orchestrator.is_running());

        let second = orchestrator
            .run(MemoryInput::text("second"), &PipelineConfig::default())
            .await;
        assert_eq!(second, Err(PipelineError::AlreadyRunning));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.transcription, "first");
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_reset_and_listening_transitions() {
        let orchestrator = Orchestrator::new(Stages::mock());
        let mut rx = orchestrator.subscribe();

        assert!(orchestrator.mark_listening());
        assert_eq!(orchestrator.status(), AgentStatus::Listening);
        assert!(orchestrator.reset());
        assert!(!orchestrator.reset(), "already idle");

        let events: Vec<StatusEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.run_id.is_none()));
    }

    #[tokio::test]
    async fn test_run_events_share_one_run_id() {
        let orchestrator = Orchestrator::new(Stages::mock());
        let mut rx = orchestrator.subscribe();
        orchestrator
            .run(MemoryInput::text("note"), &PipelineConfig::default())
            .await
            .unwrap();

        let events: Vec<StatusEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let first = events[0].run_id;
        assert!(first.is_some());
        assert!(events.iter().all(|e| e.run_id == first));
    }

    #[tokio::test]
    async fn test_consecutive_runs_without_reset_are_allowed() {
        let orchestrator = Orchestrator::new(Stages::mock());
        for text in ["one", "two"] {
            orchestrator
                .run(MemoryInput::text(text), &PipelineConfig::default())
                .await
                .unwrap();
        }
        assert_eq!(orchestrator.status(), AgentStatus::Completed);
    }
}
