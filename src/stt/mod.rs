//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │            TranscriptionDispatcher                     │
//! │   Utterance ─▶ amplitude gate ─▶ SttEngine (trait)     │
//! │                        │              │                │
//! │                 Ok(None) on          ▼                │
//! │                 silence      ┌──────────────┐          │
//! │                              │ WhisperEngine│          │
//! │   ┌─────────────┐            │ - ctx        │          │
//! │   │  ModelPaths  │──resolve──▶ - params     │          │
//! │   └─────────────┘            └──────┬───────┘          │
//! │                                     ▼                  │
//! │                         cleanup ─▶ TranscriptResult    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audio_assistant::stt::{WhisperEngine, TranscribeParams, SttEngine};
//!
//! let params = TranscribeParams::default(); // language = "en", Greedy { best_of: 1 }
//! let engine = WhisperEngine::load("models/ggml-base.bin", params)
//!     .expect("model not found — download a GGML model first");
//!
//! // audio: 16 kHz, mono, f32 PCM from the audio module
//! let audio: Vec<f32> = vec![0.0; 16_000]; // 1 s of silence
//! let text = engine.transcribe(&audio).unwrap();
//! println!("{text}");
//! ```

pub mod dispatcher;
pub mod engine;
pub mod model;
pub mod transcribe;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dispatcher::{TranscriptResult, TranscriptionDispatcher};
pub use engine::{SttEngine, SttError, WhisperEngine};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, ModelSize, WHISPER_MODELS};
pub use transcribe::{SamplingStrategy, Segment, TranscribeParams, TranscriptionResult};

// test-only re-export so the pipeline test module can import MockSttEngine
// without `use audio_assistant::stt::engine::MockSttEngine`.
#[cfg(test)]
pub use engine::MockSttEngine;
