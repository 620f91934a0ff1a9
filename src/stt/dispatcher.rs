//! Utterance-to-transcript dispatch with silence gating and text cleanup.
//!
//! [`TranscriptionDispatcher`] sits between the capture side and the STT
//! engine.  For each [`Utterance`] it:
//!
//! 1. Gates on mean absolute amplitude — segments that are effectively
//!    silent never reach the engine (Whisper hallucinates on them).
//! 2. Runs the engine.
//! 3. Normalizes the raw transcript: strips the stock filler phrases
//!    Whisper tends to emit on borderline audio, collapses whitespace,
//!    and trims.
//!
//! A gated or empty-after-cleanup utterance yields `Ok(None)`; it is not an
//! error, there was simply nothing said.

use std::sync::Arc;

use regex::Regex;

use crate::audio::Utterance;
use crate::stt::engine::{SttEngine, SttError};

/// Utterances quieter than this mean absolute amplitude are not transcribed.
const MIN_MEAN_AMPLITUDE: f32 = 0.001;

/// Stock phrases Whisper hallucinates on borderline-silent audio.
///
/// Matched case-insensitively, with an optional trailing period; longer
/// phrases are stripped before their sub-phrases.
const FILLER_PHRASES: &[&str] = &[
    "this is a conversation",
    "transcribe complete sentences and phrases",
    "transcribe complete sentences",
    "wait for sentence endings",
];

// ---------------------------------------------------------------------------
// TranscriptResult
// ---------------------------------------------------------------------------

/// A cleaned transcript with the timing of the utterance it came from.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    /// Normalized transcript text; never empty.
    pub text: String,
    /// Start of the source utterance, ms from session start.
    pub start_ms: u64,
    /// End of the source utterance, ms from session start.
    pub end_ms: u64,
}

// ---------------------------------------------------------------------------
// TranscriptionDispatcher
// ---------------------------------------------------------------------------

/// Gates, transcribes, and cleans one utterance at a time.
///
/// Holds the engine behind `Arc<dyn SttEngine>` so the same dispatcher can
/// be shared with `spawn_blocking` workers.
pub struct TranscriptionDispatcher {
    engine: Arc<dyn SttEngine>,
    whitespace: Regex,
    filler: Vec<Regex>,
}

impl TranscriptionDispatcher {
    pub fn new(engine: Arc<dyn SttEngine>) -> Self {
        // Strip longer phrases first so sub-phrases cannot leave fragments.
        let mut phrases: Vec<&str> = FILLER_PHRASES.to_vec();
        phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));
        let filler = phrases
            .iter()
            .map(|p| {
                Regex::new(&format!(r"(?i){}\.?", regex::escape(p)))
                    .expect("hardcoded filler pattern")
            })
            .collect();

        Self {
            engine,
            whitespace: Regex::new(r"\s+").expect("hardcoded whitespace pattern"),
            filler,
        }
    }

    /// Transcribe one utterance.
    ///
    /// Returns `Ok(None)` when the utterance was gated as silent or the
    /// cleaned transcript came out empty; `Ok(Some(_))` carries normalized
    /// text plus the source utterance's timestamps.
    ///
    /// Blocking — run it under `tokio::task::spawn_blocking` from async
    /// contexts.
    pub fn submit(&self, utterance: &Utterance) -> Result<Option<TranscriptResult>, SttError> {
        let level = utterance.mean_amplitude();
        if level < MIN_MEAN_AMPLITUDE {
            log::debug!(
                "stt: skipping quiet utterance ({} ms, mean amplitude {level:.5})",
                utterance.duration_ms()
            );
            return Ok(None);
        }

        let raw = self.engine.transcribe(&utterance.samples)?;
        let text = self.clean(&raw);
        if text.is_empty() {
            log::debug!("stt: transcript empty after cleanup ({} ms utterance)", utterance.duration_ms());
            return Ok(None);
        }

        Ok(Some(TranscriptResult {
            text,
            start_ms: utterance.start_ms,
            end_ms: utterance.end_ms,
        }))
    }

    /// Strip filler phrases, collapse whitespace, trim.
    fn clean(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for pattern in &self.filler {
            text = pattern.replace_all(&text, "").into_owned();
        }
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
