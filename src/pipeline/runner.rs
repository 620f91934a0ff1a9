//! Pipeline orchestrator — drives the utterance → transcript → question →
//! answer loop.
//!
//! [`PipelineOrchestrator`] consumes [`CaptureEvent`]s from the audio side
//! and emits [`PipelineEvent`]s for the frontend to print.
//!
//! # Pipeline flow
//!
//! ```text
//! CaptureEvent::Utterance
//!   └─▶ spawn_blocking(dispatcher.submit)      [gate → whisper → cleanup]
//!         ├─ Ok(None) → nothing was said, drop
//!         ├─ Err      → TranscriptionFailed
//!         └─ Ok(Some) → TranscriptReady
//!               └─▶ scorer.score(text)
//!                     ├─ statement → context.push(Speaker)
//!                     └─ question  → QuestionDetected
//!                           └─▶ answers.answer(text, context)   (async)
//!                                 ├─ Ok  → context.push(Answer), AnswerReady
//!                                 └─ Err → AnswerFailed
//!
//! CaptureEvent::DroppedAudio  ──────────────▶  PipelineEvent::DroppedAudio
//! ```
//!
//! Blocking work (Whisper inference) is pushed onto
//! `tokio::task::spawn_blocking` so the async runtime never stalls.
//! Utterances are processed one at a time; while an answer is being
//! generated, further utterances queue in the capture channel, so a slow
//! model delays transcripts but never loses audio.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::{CaptureEvent, Utterance};
use crate::config::DetectionConfig;
use crate::llm::{AnswerGenerator, Role, SharedContext};
use crate::question::QuestionScorer;
use crate::stt::TranscriptionDispatcher;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Everything the pipeline reports back to the frontend.
///
/// Failure variants carry a human-readable cause so the frontend can display
/// them without knowing the internal error types.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// An utterance was transcribed and survived cleanup.
    TranscriptReady {
        text: String,
        /// Start of the source utterance, ms from session start.
        start_ms: u64,
        /// End of the source utterance, ms from session start.
        end_ms: u64,
    },
    /// A transcript scored at or above the question threshold.
    QuestionDetected { text: String, confidence: f32 },
    /// Answer generation succeeded for `question`.
    AnswerReady { question: String, answer: String },
    /// Answer generation failed; the pipeline keeps running.
    AnswerFailed { question: String, cause: String },
    /// STT failed on one utterance; the pipeline keeps running.
    TranscriptionFailed { cause: String },
    /// The capture side dropped `chunks` chunks during an overflow episode.
    DroppedAudio { chunks: u64 },
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete listen-and-answer pipeline.
///
/// Create with [`PipelineOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use audio_assistant::config::AppConfig;
/// use audio_assistant::llm::{new_shared_context, AnswerGenerator};
/// use audio_assistant::pipeline::PipelineOrchestrator;
/// use audio_assistant::question::QuestionScorer;
/// use audio_assistant::stt::TranscriptionDispatcher;
///
/// // (dispatcher and answers are Arc<…> created elsewhere)
/// # async fn example() {
/// # fn make_dispatcher() -> Arc<TranscriptionDispatcher> { unimplemented!() }
/// # fn make_answers() -> Arc<dyn AnswerGenerator> { unimplemented!() }
/// let config = AppConfig::default();
/// let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(32);
/// let (_capture_tx, capture_rx) = tokio::sync::mpsc::channel(64);
///
/// let orchestrator = PipelineOrchestrator::new(
///     make_dispatcher(),
///     QuestionScorer::new(config.detection.sensitivity),
///     make_answers(),
///     new_shared_context(),
///     config.detection.clone(),
///     event_tx,
/// );
/// tokio::spawn(orchestrator.run(capture_rx));
///
/// while let Some(event) = event_rx.recv().await {
///     println!("{event:?}");
/// }
/// # }
/// ```
pub struct PipelineOrchestrator {
    dispatcher: Arc<TranscriptionDispatcher>,
    scorer: QuestionScorer,
    answers: Arc<dyn AnswerGenerator>,
    context: SharedContext,
    detection: DetectionConfig,
    events: mpsc::Sender<PipelineEvent>,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `dispatcher` — gated STT front (shared with `spawn_blocking`).
    /// * `scorer`     — deterministic question scorer.
    /// * `answers`    — answer backend (e.g. `OllamaClient`).
    /// * `context`    — rolling conversation window, shared with the frontend.
    /// * `detection`  — sensitivity / auto-answer / context-window settings.
    /// * `events`     — channel the frontend reads results from.
    pub fn new(
        dispatcher: Arc<TranscriptionDispatcher>,
        scorer: QuestionScorer,
        answers: Arc<dyn AnswerGenerator>,
        context: SharedContext,
        detection: DetectionConfig,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            dispatcher,
            scorer,
            answers,
            context,
            detection,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `capture_rx` is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task from
    /// `main()`.  It never returns while the channel is open.
    pub async fn run(self, mut capture_rx: mpsc::Receiver<CaptureEvent>) {
        while let Some(event) = capture_rx.recv().await {
            match event {
                CaptureEvent::Utterance(utterance) => {
                    self.handle_utterance(utterance).await;
                }
                CaptureEvent::DroppedAudio { chunks } => {
                    log::warn!("pipeline: capture dropped {chunks} chunks under load");
                    let _ = self
                        .events
                        .send(PipelineEvent::DroppedAudio { chunks })
                        .await;
                }
            }
        }

        log::info!("pipeline: capture channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Utterance handling
    // -----------------------------------------------------------------------

    /// Handle one utterance: STT → score → (answer).
    async fn handle_utterance(&self, utterance: Utterance) {
        log::debug!(
            "pipeline: utterance received ({} ms, {}..{} ms)",
            utterance.duration_ms(),
            utterance.start_ms,
            utterance.end_ms
        );

        // ── 1. STT transcription (blocking → thread pool) ────────────────
        let dispatcher = Arc::clone(&self.dispatcher);
        let submitted =
            tokio::task::spawn_blocking(move || dispatcher.submit(&utterance)).await;

        let transcript = match submitted {
            Ok(Ok(Some(transcript))) => transcript,
            Ok(Ok(None)) => {
                // Gated as silent or empty after cleanup — nothing was said.
                return;
            }
            Ok(Err(e)) => {
                log::warn!("pipeline: transcription failed: {e}");
                let _ = self
                    .events
                    .send(PipelineEvent::TranscriptionFailed {
                        cause: e.to_string(),
                    })
                    .await;
                return;
            }
            Err(e) => {
                log::warn!("pipeline: transcription task panicked: {e}");
                let _ = self
                    .events
                    .send(PipelineEvent::TranscriptionFailed {
                        cause: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        log::debug!("pipeline: transcript = {:?}", transcript.text);
        let _ = self
            .events
            .send(PipelineEvent::TranscriptReady {
                text: transcript.text.clone(),
                start_ms: transcript.start_ms,
                end_ms: transcript.end_ms,
            })
            .await;

        // ── 2. Question scoring (pure, deterministic) ────────────────────
        let scored = self.scorer.score(&transcript.text);
        if !scored.is_question {
            self.context
                .lock()
                .unwrap()
                .push(Role::Speaker, scored.text);
            return;
        }

        log::info!(
            "pipeline: question detected ({:.0}%): {}",
            scored.confidence * 100.0,
            scored.text
        );
        let _ = self
            .events
            .send(PipelineEvent::QuestionDetected {
                text: scored.text.clone(),
                confidence: scored.confidence,
            })
            .await;

        // ── 3. Answer generation ─────────────────────────────────────────
        // Snapshot the prompt context before recording the question so the
        // model is never handed its own question as prior conversation.
        // The guard must not live across the `.await` below.
        let prompt_ctx = {
            let ctx = self.context.lock().unwrap();
            ctx.prompt_block(self.detection.context_window_entries)
        };
        self.context
            .lock()
            .unwrap()
            .push(Role::Question, scored.text.clone());

        if !self.detection.auto_answer {
            log::debug!("pipeline: auto_answer is off — question recorded only");
            return;
        }

        match self.answers.answer(&scored.text, prompt_ctx.as_deref()).await {
            Ok(answer) => {
                log::debug!("pipeline: answer = {answer:?}");
                self.context
                    .lock()
                    .unwrap()
                    .push(Role::Answer, answer.clone());
                let _ = self
                    .events
                    .send(PipelineEvent::AnswerReady {
                        question: scored.text,
                        answer,
                    })
                    .await;
            }
            Err(e) => {
                log::warn!("pipeline: answer generation failed: {e}");
                let _ = self
                    .events
                    .send(PipelineEvent::AnswerFailed {
                        question: scored.text,
                        cause: e.cause,
                    })
                    .await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{new_shared_context, AnswerError};
    use crate::stt::{MockSttEngine, SttEngine, SttError};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Mock answer generator that succeeds with a fixed reply and records
    /// the context block each call received.
    struct OkAnswers {
        reply: String,
        seen_context: Mutex<Vec<Option<String>>>,
    }

    impl OkAnswers {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                seen_context: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AnswerGenerator for OkAnswers {
        async fn answer(
            &self,
            _question: &str,
            context: Option<&str>,
        ) -> Result<String, AnswerError> {
            self.seen_context
                .lock()
                .unwrap()
                .push(context.map(str::to_string));
            Ok(self.reply.clone())
        }
    }

    /// Mock answer generator that always fails.
    struct FailAnswers;

    #[async_trait]
    impl AnswerGenerator for FailAnswers {
        async fn answer(
            &self,
            _question: &str,
            _context: Option<&str>,
        ) -> Result<String, AnswerError> {
            Err(AnswerError::new("model offline"))
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// One second of clearly audible audio — passes the amplitude gate and
    /// the engine's length contract.
    fn spoken_utterance() -> Utterance {
        Utterance {
            samples: vec![0.1; 16_000],
            sample_rate: 16_000,
            start_ms: 1_000,
            end_ms: 2_000,
        }
    }

    fn make_orchestrator(
        transcript: &str,
        answers: Arc<dyn AnswerGenerator>,
        detection: DetectionConfig,
    ) -> (
        PipelineOrchestrator,
        mpsc::Receiver<PipelineEvent>,
        SharedContext,
    ) {
        let stt: Arc<dyn SttEngine> = Arc::new(MockSttEngine::ok(transcript));
        let dispatcher = Arc::new(TranscriptionDispatcher::new(stt));
        let context = new_shared_context();
        let (event_tx, event_rx) = mpsc::channel(32);

        let orchestrator = PipelineOrchestrator::new(
            dispatcher,
            QuestionScorer::new(detection.sensitivity),
            answers,
            Arc::clone(&context),
            detection,
            event_tx,
        );
        (orchestrator, event_rx, context)
    }

    /// Run the orchestrator over `events` until the channel closes, then
    /// drain everything it emitted.
    async fn run_and_drain(
        orchestrator: PipelineOrchestrator,
        mut event_rx: mpsc::Receiver<PipelineEvent>,
        events: Vec<CaptureEvent>,
    ) -> Vec<PipelineEvent> {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx); // close channel so run() returns

        orchestrator.run(rx).await;

        let mut emitted = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            emitted.push(event);
        }
        emitted
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// A plain statement is transcribed and recorded, never answered.
    #[tokio::test]
    async fn statement_is_recorded_not_answered() {
        let answers = OkAnswers::new("should not be called");
        let (orc, event_rx, context) = make_orchestrator(
            "The deploy finished ten minutes ago.",
            answers.clone(),
            DetectionConfig::default(),
        );

        let emitted = run_and_drain(
            orc,
            event_rx,
            vec![CaptureEvent::Utterance(spoken_utterance())],
        )
        .await;

        assert_eq!(emitted.len(), 1);
        assert!(matches!(
            &emitted[0],
            PipelineEvent::TranscriptReady { text, start_ms: 1_000, end_ms: 2_000 }
                if text == "The deploy finished ten minutes ago."
        ));
        assert!(answers.seen_context.lock().unwrap().is_empty());

        let ctx = context.lock().unwrap();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.window()[0].role, Role::Speaker);
    }

    /// A clear question walks the full path: transcript, detection, answer.
    #[tokio::test]
    async fn question_produces_answer_events() {
        let answers = OkAnswers::new("Friday at noon.");
        let (orc, event_rx, context) = make_orchestrator(
            "What time is the deploy?",
            answers.clone(),
            DetectionConfig::default(),
        );

        let emitted = run_and_drain(
            orc,
            event_rx,
            vec![CaptureEvent::Utterance(spoken_utterance())],
        )
        .await;

        assert_eq!(emitted.len(), 3);
        assert!(matches!(&emitted[0], PipelineEvent::TranscriptReady { .. }));
        assert!(matches!(
            &emitted[1],
            PipelineEvent::QuestionDetected { text, confidence }
                if text == "What time is the deploy?" && (confidence - 1.0).abs() < 1e-6
        ));
        assert!(matches!(
            &emitted[2],
            PipelineEvent::AnswerReady { question, answer }
                if question == "What time is the deploy?" && answer == "Friday at noon."
        ));

        // Both sides of the exchange land in the rolling context.
        let ctx = context.lock().unwrap();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.window()[0].role, Role::Question);
        assert_eq!(ctx.window()[1].role, Role::Answer);
    }

    /// When the answer backend fails, the pipeline reports it and keeps the
    /// question (but no answer) in context.
    #[tokio::test]
    async fn answer_failure_emits_failed_event() {
        let (orc, event_rx, context) = make_orchestrator(
            "What time is the deploy?",
            Arc::new(FailAnswers),
            DetectionConfig::default(),
        );

        let emitted = run_and_drain(
            orc,
            event_rx,
            vec![CaptureEvent::Utterance(spoken_utterance())],
        )
        .await;

        assert!(matches!(
            emitted.last(),
            Some(PipelineEvent::AnswerFailed { cause, .. }) if cause.contains("model offline")
        ));

        let ctx = context.lock().unwrap();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.window()[0].role, Role::Question);
    }

    /// With auto_answer off, questions are detected and recorded but the
    /// answer backend is never invoked.
    #[tokio::test]
    async fn auto_answer_off_records_question_only() {
        let answers = OkAnswers::new("should not be called");
        let detection = DetectionConfig {
            auto_answer: false,
            ..Default::default()
        };
        let (orc, event_rx, context) =
            make_orchestrator("What time is the deploy?", answers.clone(), detection);

        let emitted = run_and_drain(
            orc,
            event_rx,
            vec![CaptureEvent::Utterance(spoken_utterance())],
        )
        .await;

        assert_eq!(emitted.len(), 2);
        assert!(matches!(&emitted[1], PipelineEvent::QuestionDetected { .. }));
        assert!(answers.seen_context.lock().unwrap().is_empty());

        let ctx = context.lock().unwrap();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.window()[0].role, Role::Question);
    }

    /// The prompt context is snapshotted before the question is recorded,
    /// so the model never sees its own question as prior conversation.
    #[tokio::test]
    async fn question_is_not_part_of_its_own_prompt_context() {
        let answers = OkAnswers::new("Friday.");
        let (orc, event_rx, context) = make_orchestrator(
            "What time is the deploy?",
            answers.clone(),
            DetectionConfig::default(),
        );

        context
            .lock()
            .unwrap()
            .push(Role::Speaker, "we deploy every friday");

        let _ = run_and_drain(
            orc,
            event_rx,
            vec![CaptureEvent::Utterance(spoken_utterance())],
        )
        .await;

        let seen = answers.seen_context.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let block = seen[0].as_deref().expect("context block expected");
        assert!(block.contains("we deploy every friday"));
        assert!(!block.contains("What time is the deploy?"));
    }

    /// The very first question has no prior conversation to lean on.
    #[tokio::test]
    async fn first_question_gets_no_context() {
        let answers = OkAnswers::new("Friday.");
        let (orc, event_rx, _context) = make_orchestrator(
            "What time is the deploy?",
            answers.clone(),
            DetectionConfig::default(),
        );

        let _ = run_and_drain(
            orc,
            event_rx,
            vec![CaptureEvent::Utterance(spoken_utterance())],
        )
        .await;

        let seen = answers.seen_context.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_none());
    }

    /// An STT failure is reported per-utterance; later events still flow.
    #[tokio::test]
    async fn transcription_failure_keeps_pipeline_running() {
        let stt: Arc<dyn SttEngine> =
            Arc::new(MockSttEngine::err(SttError::Transcription("boom".into())));
        let dispatcher = Arc::new(TranscriptionDispatcher::new(stt));
        let detection = DetectionConfig::default();
        let (event_tx, event_rx) = mpsc::channel(32);

        let orc = PipelineOrchestrator::new(
            dispatcher,
            QuestionScorer::new(detection.sensitivity),
            OkAnswers::new("unused"),
            new_shared_context(),
            detection,
            event_tx,
        );

        let emitted = run_and_drain(
            orc,
            event_rx,
            vec![
                CaptureEvent::Utterance(spoken_utterance()),
                CaptureEvent::DroppedAudio { chunks: 3 },
            ],
        )
        .await;

        assert_eq!(emitted.len(), 2);
        assert!(matches!(
            &emitted[0],
            PipelineEvent::TranscriptionFailed { cause } if cause.contains("boom")
        ));
        assert!(matches!(
            &emitted[1],
            PipelineEvent::DroppedAudio { chunks: 3 }
        ));
    }

    /// Silent utterances are gated inside the dispatcher and emit nothing.
    #[tokio::test]
    async fn gated_utterance_produces_no_events() {
        let answers = OkAnswers::new("unused");
        let (orc, event_rx, context) =
            make_orchestrator("ignored", answers.clone(), DetectionConfig::default());

        let silent = Utterance {
            samples: vec![0.0; 16_000],
            sample_rate: 16_000,
            start_ms: 0,
            end_ms: 1_000,
        };
        let emitted = run_and_drain(orc, event_rx, vec![CaptureEvent::Utterance(silent)]).await;

        assert!(emitted.is_empty());
        assert!(context.lock().unwrap().is_empty());
    }

    /// Overflow reports from the capture side pass straight through.
    #[tokio::test]
    async fn dropped_audio_is_forwarded() {
        let answers = OkAnswers::new("unused");
        let (orc, event_rx, _context) =
            make_orchestrator("ignored", answers, DetectionConfig::default());

        let emitted =
            run_and_drain(orc, event_rx, vec![CaptureEvent::DroppedAudio { chunks: 7 }]).await;

        assert_eq!(emitted.len(), 1);
        assert!(matches!(
            &emitted[0],
            PipelineEvent::DroppedAudio { chunks: 7 }
        ));
    }
}
