//! Local listen-and-answer assistant.
//!
//! Captures system audio through a loopback device, segments it into
//! utterances on silence boundaries, transcribes them with Whisper, scores
//! each transcript for question-ness, and answers detected questions with a
//! local Ollama model.  Everything runs on-device; no audio or text leaves
//! the machine.
//!
//! # Architecture
//!
//! ```text
//! cpal callback ─▶ ChunkQueue ─▶ "audio-segment" worker ─▶ CaptureEvent (mpsc)
//!  (downmix)       (bounded,      (resample + silence          │
//!                  drop-oldest)    segmentation)               ▼
//!                                              PipelineOrchestrator::run()
//!                                                ├─ TranscriptionDispatcher
//!                                                │    (gate → Whisper → cleanup)
//!                                                ├─ QuestionScorer
//!                                                └─ OllamaClient
//!                                                        │
//!                                   PipelineEvent (mpsc) ─▶ printed by main()
//! ```
//!
//! The [`audio`], [`stt`], [`question`], and [`llm`] modules are independent
//! layers; [`pipeline`] wires them together and [`config`] carries the
//! settings for all of them.

pub mod audio;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod question;
pub mod stt;
