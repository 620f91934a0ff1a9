//! Audio front end — device discovery → capture → chunk queue → segmentation.
//!
//! # Pipeline
//!
//! ```text
//! loopback device → cpal callback → ChunkQueue → "audio-segment" worker
//!                  (downmix, seq)  (drop-oldest)  → resample → SegmentationBuffer
//!                                                 → Utterance (tokio mpsc)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use audio_assistant::audio::{CaptureConfig, CaptureCoordinator, CaptureEvent, DeviceResolver};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let resolver = DeviceResolver::new();
//! let devices = resolver.discover()?;
//! let device = resolver.select_loopback(&devices).expect("no loopback device");
//! let rate = resolver.negotiate_rate(device, 16_000)?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let mut capture = CaptureCoordinator::new(CaptureConfig::default(), tx);
//! capture.start(device, rate)?;
//!
//! while let Some(event) = rx.recv().await {
//!     if let CaptureEvent::Utterance(u) = event {
//!         println!("utterance: {} ms", u.duration_ms());
//!     }
//! }
//! capture.stop();
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod device;
pub mod queue;
pub mod resample;
pub mod segment;

pub use capture::{CaptureConfig, CaptureCoordinator, CaptureError, CaptureEvent, CaptureState};
pub use device::{Device, DeviceError, DeviceResolver, RateRange};
pub use queue::{AudioChunk, ChunkQueue, Pop};
pub use resample::{downmix_mono, resample};
pub use segment::{SegmentationBuffer, SegmenterConfig, Utterance};
