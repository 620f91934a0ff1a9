//! Pipeline orchestration for the audio assistant.
//!
//! This module wires capture output through STT, question detection, and
//! answer generation, and exposes the event stream the frontend prints.
//!
//! # Architecture
//!
//! ```text
//! CaptureEvent (mpsc)
//!        │
//!        ▼
//! PipelineOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ Utterance
//!        │     ├─ spawn_blocking(TranscriptionDispatcher::submit)
//!        │     ├─ QuestionScorer::score
//!        │     └─ [question + auto_answer] AnswerGenerator::answer
//!        │
//!        └─ DroppedAudio → forwarded
//!        │
//!        ▼
//! PipelineEvent (mpsc) ←─── printed by main()
//! ```
//!
//! The rolling [`ConversationContext`](crate::llm::ConversationContext) is
//! shared behind a mutex; the orchestrator records every transcript in it
//! and hands a bounded window of it to the answer backend.

pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineEvent, PipelineOrchestrator};
