//! Capture session lifecycle: cpal stream, chunk queue, segmenting worker.
//!
//! ```text
//!  cpal callback ──AudioChunk──▶ ChunkQueue ──FIFO──▶ "audio-segment" worker
//!  (downmix, seq)   (bounded,                ──▶ resample to target rate
//!                    drop-oldest)            ──▶ SegmentationBuffer
//!                                            ──▶ CaptureEvent over tokio mpsc
//! ```
//!
//! The real-time callback does fixed work only: downmix to mono, stamp a
//! sequence number, push into the bounded queue.  Everything that can stall
//! (resampling, segmentation, channel sends) lives on the worker thread, so
//! a slow consumer costs dropped chunks — reported once per overflow
//! episode — never a blocked audio callback.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::mpsc;

use super::device::{open_input_device, Device};
use super::queue::{AudioChunk, ChunkQueue, Pop};
use super::resample::{downmix_mono, resample};
use super::segment::{SegmentationBuffer, SegmenterConfig, Utterance};

/// How long the worker waits for a chunk before re-checking queue state.
const POP_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors starting a capture session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// `start` was called while a session is live.
    #[error("a capture session is already active")]
    SessionActive,

    /// The selected device could not be re-opened.
    #[error(transparent)]
    Device(#[from] super::device::DeviceError),

    /// The input stream could not be built on the device.
    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The input stream could not be started.
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The segmenting worker thread could not be spawned.
    #[error("failed to spawn capture worker: {0}")]
    SpawnWorker(String),
}

// ---------------------------------------------------------------------------
// CaptureState / CaptureEvent / CaptureConfig
// ---------------------------------------------------------------------------

/// Lifecycle of a capture session.
///
/// ```text
///   Idle ──start──▶ Starting ──▶ Running ──stop──▶ Stopping ──▶ Idle
///                      │            │
///                      └────▶ Error ◀┘
/// ```
///
/// `Error` is a resting state like `Idle`: both `stop` (back to `Idle`)
/// and a fresh `start` leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Starting,
    Running,
    Stopping,
    Error,
}

/// What the capture side hands to the pipeline.
#[derive(Debug)]
pub enum CaptureEvent {
    /// A segmented stretch of speech at the target sample rate.
    Utterance(Utterance),
    /// One overflow episode ended; `chunks` were dropped while it lasted.
    DroppedAudio { chunks: u64 },
}

/// Tunables for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Segmentation parameters; `segmenter.sample_rate` is the rate chunks
    /// are resampled to before segmentation and transcription.
    pub segmenter: SegmenterConfig,
    /// Bounded chunk-queue capacity between callback and worker.
    pub queue_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            queue_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureCoordinator
// ---------------------------------------------------------------------------

/// Owns one capture session at a time: the cpal stream, the chunk queue,
/// and the segmenting worker.
///
/// The coordinator is not `Send` (cpal streams are thread-bound on some
/// platforms); construct and drive it from the thread that owns the audio
/// session.  Emitted [`CaptureEvent`]s cross into async land over the
/// channel passed to [`CaptureCoordinator::new`].
pub struct CaptureCoordinator {
    config: CaptureConfig,
    events: mpsc::Sender<CaptureEvent>,
    state: CaptureState,
    stream: Option<cpal::Stream>,
    queue: Option<Arc<ChunkQueue>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CaptureCoordinator {
    pub fn new(config: CaptureConfig, events: mpsc::Sender<CaptureEvent>) -> Self {
        Self {
            config,
            events,
            state: CaptureState::Idle,
            stream: None,
            queue: None,
            worker: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Open `device` at `sample_rate` and start capturing.
    ///
    /// `sample_rate` should come from
    /// [`DeviceResolver::negotiate_rate`](super::DeviceResolver::negotiate_rate);
    /// the worker resamples to the segmenter's target rate, so the device
    /// rate need not match the STT rate.
    ///
    /// # Errors
    ///
    /// Fails with [`CaptureError::SessionActive`] when a session is live,
    /// and with a device/stream variant when the device cannot be opened.
    /// On failure the coordinator rests in [`CaptureState::Error`]; calling
    /// `start` again (or `stop`) is fine.
    pub fn start(&mut self, device: &Device, sample_rate: u32) -> Result<(), CaptureError> {
        match self.state {
            CaptureState::Idle | CaptureState::Error => {}
            _ => return Err(CaptureError::SessionActive),
        }
        self.state = CaptureState::Starting;

        let cpal_device = match open_input_device(device.index) {
            Ok(d) => d,
            Err(e) => {
                self.state = CaptureState::Error;
                return Err(e.into());
            }
        };

        let stream_config = cpal::StreamConfig {
            channels: device.channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue = Arc::new(ChunkQueue::new(self.config.queue_capacity));

        let callback_queue = Arc::clone(&queue);
        let channels = device.channels;
        let mut seq: u64 = 0;
        let stream = match cpal_device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    seq,
                    samples: downmix_mono(data, channels),
                    sample_rate,
                };
                seq += 1;
                callback_queue.push(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("capture: stream error: {err}");
            },
            None, // no timeout
        ) {
            Ok(stream) => stream,
            Err(e) => {
                self.state = CaptureState::Error;
                return Err(e.into());
            }
        };

        if let Err(e) = stream.play() {
            self.state = CaptureState::Error;
            return Err(e.into());
        }

        let worker_queue = Arc::clone(&queue);
        let segmenter = SegmentationBuffer::new(self.config.segmenter.clone());
        let target_rate = self.config.segmenter.sample_rate;
        let events = self.events.clone();
        let worker = match thread::Builder::new()
            .name("audio-segment".into())
            .spawn(move || run_worker(worker_queue, segmenter, target_rate, events))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.state = CaptureState::Error;
                return Err(CaptureError::SpawnWorker(e.to_string()));
            }
        };

        self.stream = Some(stream);
        self.queue = Some(queue);
        self.worker = Some(worker);
        self.state = CaptureState::Running;
        log::info!(
            "capture: session started on '{}' at {} Hz ({} ch)",
            device.name,
            sample_rate,
            device.channels
        );
        Ok(())
    }

    /// Stop the session: halt callbacks, drain the queue, flush the
    /// segmenter, join the worker.
    ///
    /// Idempotent — calling `stop` on an idle coordinator is a no-op.  A
    /// partial utterance still buffered at stop is force-flushed (subject
    /// to the duration floor) so trailing speech is not lost.
    pub fn stop(&mut self) {
        if self.state == CaptureState::Idle {
            log::debug!("capture: stop on idle session is a no-op");
            return;
        }
        self.state = CaptureState::Stopping;

        // Drop the stream first so no new chunks arrive while draining.
        self.stream = None;
        if let Some(queue) = self.queue.take() {
            queue.close();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("capture: worker panicked during shutdown");
            }
        }

        self.state = CaptureState::Idle;
        log::info!("capture: session stopped");
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Drain the queue FIFO into the segmenter until the queue closes, then
/// flush.
///
/// Overflow episodes are reported as soon as the worker notices them, once
/// each.  Sends use `blocking_send`: if the pipeline falls far enough
/// behind to fill its channel, backpressure reaches the chunk queue and
/// surfaces as dropped chunks rather than unbounded memory.
fn run_worker(
    queue: Arc<ChunkQueue>,
    mut segmenter: SegmentationBuffer,
    target_rate: u32,
    events: mpsc::Sender<CaptureEvent>,
) {
    loop {
        match queue.pop_timeout(POP_TIMEOUT) {
            Pop::Chunk(chunk) => {
                if let Some(dropped) = queue.take_drop_report() {
                    log::warn!("capture: consumer fell behind, dropped {dropped} chunks");
                    let _ = events.blocking_send(CaptureEvent::DroppedAudio { chunks: dropped });
                }

                let mono = if chunk.sample_rate == target_rate {
                    chunk.samples
                } else {
                    resample(&chunk.samples, chunk.sample_rate, target_rate)
                };
                if let Some(utterance) = segmenter.push(&mono) {
                    let _ = events.blocking_send(CaptureEvent::Utterance(utterance));
                }
            }
            Pop::Empty => continue,
            Pop::Closed => break,
        }
    }

    if let Some(dropped) = queue.take_drop_report() {
        log::warn!("capture: dropped {dropped} chunks in the final overflow episode");
        let _ = events.blocking_send(CaptureEvent::DroppedAudio { chunks: dropped });
    }
    if let Some(utterance) = segmenter.flush() {
        log::debug!(
            "capture: flushed {} ms partial utterance on stop",
            utterance.duration_ms()
        );
        let _ = events.blocking_send(CaptureEvent::Utterance(utterance));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
