//! Silence-based utterance segmentation.
//!
//! [`SegmentationBuffer`] accumulates mono samples and cuts them into
//! [`Utterance`]s at natural pauses:
//!
//! ```text
//!   voiced ......... voiced | silence > min_silence_ms
//!   └────── emitted ───────┘ └── discarded ──┘
//! ```
//!
//! A chunk counts as silent when its RMS energy is below the configured
//! threshold.  An utterance ends when the trailing silence run exceeds
//! `min_silence_ms` (the run itself is trimmed off and discarded) or when
//! the buffer reaches `max_utterance_ms` (emitted whole, interior silence
//! included, so no speech sample is ever lost on the cap path).  Segments
//! shorter than `min_utterance_ms` after trimming are discarded — they are
//! coughs, clicks, and the fire-and-discard cycle that keeps long quiet
//! periods from growing the buffer.
//!
//! Timestamps are derived from a session sample clock, not wall time, so
//! they are exact and monotone for a given input stream.

use super::queue::AudioChunk;

// ---------------------------------------------------------------------------
// SegmenterConfig
// ---------------------------------------------------------------------------

/// Tunables for utterance segmentation.
///
/// All durations are in milliseconds and are converted to sample counts at
/// `sample_rate` when the buffer is constructed.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Rate of the incoming mono samples, in Hz.
    pub sample_rate: u32,
    /// RMS level below which a chunk counts as silent.
    pub silence_threshold: f32,
    /// Silence run that terminates an utterance.
    pub min_silence_ms: u64,
    /// Segments shorter than this after silence trimming are discarded.
    pub min_utterance_ms: u64,
    /// Hard cap; the buffer is emitted whole when it grows this long.
    pub max_utterance_ms: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            silence_threshold: 0.015,
            min_silence_ms: 1_000,
            min_utterance_ms: 1_500,
            max_utterance_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// One segmented stretch of speech, ready for transcription.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Mono samples at `sample_rate`.
    pub samples: Vec<f32>,
    /// Sample rate of `samples`, in Hz.
    pub sample_rate: u32,
    /// Offset of the first sample from session start, in ms.
    pub start_ms: u64,
    /// Offset just past the last sample, in ms.
    pub end_ms: u64,
}

impl Utterance {
    /// Duration of the samples, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1_000 / self.sample_rate as u64
    }

    /// Mean absolute amplitude, `0.0` for an empty utterance.
    pub fn mean_amplitude(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.abs()).sum::<f32>() / self.samples.len() as f32
    }
}

// ---------------------------------------------------------------------------
// SegmentationBuffer
// ---------------------------------------------------------------------------

/// Accumulates chunks and emits [`Utterance`]s at silence boundaries.
///
/// Single-owner type; the capture worker drives it from one thread.
///
/// # Example
///
/// ```rust
/// use audio_assistant::audio::{SegmentationBuffer, SegmenterConfig};
///
/// let mut segmenter = SegmentationBuffer::new(SegmenterConfig {
///     sample_rate: 16_000,
///     silence_threshold: 0.015,
///     min_silence_ms: 300,
///     min_utterance_ms: 100,
///     max_utterance_ms: 10_000,
/// });
///
/// // Half a second of tone, then enough silence to cut the utterance.
/// assert!(segmenter.push(&vec![0.5; 8_000]).is_none());
/// let utterance = segmenter.push(&vec![0.0; 8_000]).expect("utterance");
/// assert_eq!(utterance.duration_ms(), 500); // silence tail trimmed
/// ```
pub struct SegmentationBuffer {
    config: SegmenterConfig,
    /// Utterance in progress, trailing silence included until it fires.
    samples: Vec<f32>,
    /// Length of the silent suffix of `samples`, in samples.
    silence_run: usize,
    /// Session clock: total samples ever accepted.
    accepted: u64,
    min_silence_samples: usize,
    min_utterance_samples: usize,
    max_utterance_samples: usize,
}

impl SegmentationBuffer {
    pub fn new(config: SegmenterConfig) -> Self {
        let per_ms = config.sample_rate as u64;
        let to_samples = |ms: u64| (ms * per_ms / 1_000) as usize;
        Self {
            min_silence_samples: to_samples(config.min_silence_ms),
            min_utterance_samples: to_samples(config.min_utterance_ms),
            max_utterance_samples: to_samples(config.max_utterance_ms),
            samples: Vec::new(),
            silence_run: 0,
            accepted: 0,
            config,
        }
    }

    /// Feed one chunk of mono samples; returns an utterance when one
    /// completed on this push.
    ///
    /// At most one utterance is emitted per call.  Samples are appended in
    /// order and never reordered; the only samples not returned through an
    /// utterance are terminating silence runs and sub-minimum fragments.
    pub fn push(&mut self, chunk: &[f32]) -> Option<Utterance> {
        if chunk.is_empty() {
            return None;
        }

        self.samples.extend_from_slice(chunk);
        self.accepted += chunk.len() as u64;

        if rms(chunk) < self.config.silence_threshold {
            self.silence_run += chunk.len();
        } else {
            self.silence_run = 0;
        }

        if self.silence_run > self.min_silence_samples {
            // Natural pause: emit the speech part, discard the silent tail.
            let speech_len = self.samples.len() - self.silence_run;
            return self.finish(speech_len);
        }

        if self.samples.len() >= self.max_utterance_samples {
            // Cap: emit everything collected so far, silence included.
            let full_len = self.samples.len();
            return self.finish(full_len);
        }

        None
    }

    /// Forcibly emit whatever is buffered; used on capture stop.
    ///
    /// The trailing silence run is trimmed off as it would be on a natural
    /// pause, and the minimum-duration floor still applies, so a stray
    /// fragment at shutdown is discarded rather than transcribed.
    pub fn flush(&mut self) -> Option<Utterance> {
        if self.samples.is_empty() {
            return None;
        }
        let speech_len = self.samples.len() - self.silence_run;
        self.finish(speech_len)
    }

    /// Convenience wrapper for feeding a capture chunk directly.
    pub fn push_chunk(&mut self, chunk: &AudioChunk) -> Option<Utterance> {
        self.push(&chunk.samples)
    }

    /// Duration of the utterance currently in progress, in ms.
    pub fn buffered_ms(&self) -> u64 {
        self.samples.len() as u64 * 1_000 / self.config.sample_rate as u64
    }

    /// Close out the current buffer, emitting its first `emit_len` samples
    /// when they meet the duration floor.
    fn finish(&mut self, emit_len: usize) -> Option<Utterance> {
        let total = self.samples.len() as u64;
        let start = self.accepted - total;
        self.silence_run = 0;

        if emit_len < self.min_utterance_samples {
            log::debug!(
                "segment: discarding {} ms fragment below the {} ms floor",
                emit_len as u64 * 1_000 / self.config.sample_rate as u64,
                self.config.min_utterance_ms
            );
            self.samples.clear();
            return None;
        }

        let mut samples = std::mem::take(&mut self.samples);
        samples.truncate(emit_len);

        let rate = self.config.sample_rate as u64;
        let utterance = Utterance {
            start_ms: start * 1_000 / rate,
            end_ms: (start + emit_len as u64) * 1_000 / rate,
            sample_rate: self.config.sample_rate,
            samples,
        };
        log::debug!(
            "segment: utterance {} ms ({}..{} ms)",
            utterance.duration_ms(),
            utterance.start_ms,
            utterance.end_ms
        );
        Some(utterance)
    }
}

/// Root-mean-square level of a chunk, `0.0` for an empty one.
fn rms(chunk: &[f32]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }
    let mean_sq = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
