//! Application entry point — local listen-and-answer assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Handle `--list-devices` (print the input-device table and exit).
//! 3. Load [`AppConfig`] from disk (returns default on first run).
//! 4. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the Whisper engine (degrades to an explanatory stub when the
//!    model file is missing).
//! 6. Build the Ollama client and probe the server.
//! 7. Resolve the capture device and negotiate a sample rate.
//! 8. Spawn the pipeline orchestrator on the tokio runtime.
//! 9. Start capture on the main thread and print pipeline events until
//!    Ctrl-C.

use std::sync::Arc;

use tokio::sync::mpsc;

use audio_assistant::{
    audio::{
        CaptureConfig, CaptureCoordinator, CaptureEvent, Device, DeviceResolver, SegmenterConfig,
    },
    config::{AppConfig, AppPaths},
    llm::{new_shared_context, AnswerGenerator, OllamaClient},
    pipeline::{PipelineEvent, PipelineOrchestrator},
    question::QuestionScorer,
    stt::{
        find_model_by_id, ModelPaths, SttEngine, SttError, TranscribeParams,
        TranscriptionDispatcher, WhisperEngine,
    },
};

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. CLI: device listing mode
    if std::env::args().any(|arg| arg == "--list-devices") {
        return list_devices();
    }

    log::info!("audio assistant starting up");

    // 3. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 4. Tokio runtime (2 worker threads — STT and the answer backend each
    //    take one)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 5. Whisper engine (may fail if model not present — degrade gracefully)
    let model_paths = ModelPaths::from_app_paths(&AppPaths::new());
    let model_file = match find_model_by_id(&config.stt.model) {
        Some(info) => model_paths.model_path(info),
        // Unknown id: trust the user, resolve by naming convention.
        None => model_paths
            .models_dir
            .join(format!("ggml-{}.bin", config.stt.model)),
    };

    let stt_params = TranscribeParams {
        language: config.stt.language.clone(),
        ..TranscribeParams::default()
    };

    let stt: Arc<dyn SttEngine> = match WhisperEngine::load(&model_file, stt_params) {
        Ok(engine) => {
            log::info!("stt: whisper model loaded: {}", model_file.display());
            Arc::new(engine)
        }
        Err(e) => {
            log::warn!(
                "stt: could not load whisper model ({}): {e}; transcription will return an error",
                model_file.display()
            );
            if let Some(info) = find_model_by_id(&config.stt.model) {
                log::warn!(
                    "stt: download {} ({} MB) from {} into {}",
                    info.file_name,
                    info.file_size_mb,
                    info.source_url,
                    model_paths.models_dir.display()
                );
            }
            // Use a stub that always returns an explanatory error so the
            // assistant still launches without a model file present.
            Arc::new(NoModelStt {
                path: model_file.display().to_string(),
            })
        }
    };

    // 6. Ollama client + server probe (diagnostic only; answers handle their
    //    own failures)
    let ollama = OllamaClient::from_config(&config.llm);
    rt.block_on(async {
        if !ollama.is_alive().await {
            log::warn!(
                "llm: ollama not reachable at {} — answers will fail until it is started",
                config.llm.base_url
            );
        } else if ollama.model_available().await {
            log::info!("llm: ollama is up, model {:?} is available", config.llm.model);
        } else {
            log::warn!(
                "llm: ollama is up but model {:?} is missing — run `ollama pull {}`",
                config.llm.model,
                config.llm.model
            );
        }
    });
    let answers: Arc<dyn AnswerGenerator> = Arc::new(ollama);

    // 7. Capture device
    let resolver = DeviceResolver::new();
    let devices = resolver.discover()?;
    let device = select_device(&resolver, &devices, config.audio.device_index)?;
    let capture_rate = resolver.negotiate_rate(&device, config.audio.target_sample_rate)?;
    log::info!(
        "device: capturing from {:?} at {} Hz ({} ch, {})",
        device.name,
        capture_rate,
        device.channels,
        device.host
    );

    // 8. Pipeline orchestrator
    let (capture_tx, capture_rx) = mpsc::channel::<CaptureEvent>(64);
    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(32);

    let dispatcher = Arc::new(TranscriptionDispatcher::new(stt));
    let orchestrator = PipelineOrchestrator::new(
        dispatcher,
        QuestionScorer::new(config.detection.sensitivity),
        answers,
        new_shared_context(),
        config.detection.clone(),
        event_tx,
    );
    rt.spawn(orchestrator.run(capture_rx));

    // 9. Capture — the cpal stream lives on the main thread because streams
    //    are not Send on every host.
    let capture_config = CaptureConfig {
        segmenter: SegmenterConfig {
            sample_rate: config.audio.target_sample_rate,
            silence_threshold: config.audio.silence_threshold,
            min_silence_ms: config.audio.min_silence_ms,
            min_utterance_ms: config.audio.min_utterance_ms,
            max_utterance_ms: config.audio.max_utterance_ms,
        },
        queue_capacity: config.audio.queue_capacity_chunks,
    };
    let mut coordinator = CaptureCoordinator::new(capture_config, capture_tx);
    coordinator.start(&device, capture_rate)?;

    println!("Listening on {:?} — press Ctrl-C to stop.", device.name);

    rt.block_on(async {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("ctrl-c received, shutting down");
                    break;
                }
                event = event_rx.recv() => {
                    match event {
                        Some(event) => print_event(&event),
                        None => break,
                    }
                }
            }
        }
    });

    coordinator.stop();
    Ok(())
}

// ---------------------------------------------------------------------------
// Device selection
// ---------------------------------------------------------------------------

/// Pick the capture device: explicit index from config, else the first
/// loopback candidate, else the first input device (with setup guidance).
fn select_device(
    resolver: &DeviceResolver,
    devices: &[Device],
    override_index: Option<usize>,
) -> anyhow::Result<Device> {
    if let Some(index) = override_index {
        return devices.iter().find(|d| d.index == index).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "no input device with index {index} — run with --list-devices to see what is available"
            )
        });
    }

    if let Some(device) = resolver.select_loopback(devices) {
        log::info!("device: auto-selected loopback device {:?}", device.name);
        return Ok(device.clone());
    }

    let first = devices
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no audio input devices found"))?;
    log::warn!(
        "device: no loopback device found — falling back to {:?} (a microphone, most likely)",
        first.name
    );
    log::warn!(
        "device: to capture system audio, install BlackHole (macOS), VB-Cable or \
         enable Stereo Mix (Windows), or use a PulseAudio/PipeWire monitor source (Linux)"
    );
    Ok(first)
}

/// Print the input-device table for `--list-devices`.
fn list_devices() -> anyhow::Result<()> {
    let resolver = DeviceResolver::new();
    let devices = resolver.discover()?;

    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    println!("Audio input devices ({}):", devices.len());
    for device in &devices {
        let marker = if device.is_loopback { "  [loopback]" } else { "" };
        println!(
            "  {:>2}  {}  ({} ch, {} Hz, {}){}",
            device.index,
            device.name,
            device.channels,
            device.default_sample_rate,
            device.host,
            marker
        );
    }
    println!();
    println!("Select one with `device_index` under [audio] in settings.toml.");

    if !devices.iter().any(|d| d.is_loopback) {
        println!();
        println!("No loopback device detected. To capture system audio, install");
        println!("BlackHole (macOS), VB-Cable or enable Stereo Mix (Windows), or");
        println!("use a PulseAudio/PipeWire monitor source (Linux).");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Event printing
// ---------------------------------------------------------------------------

/// One pipeline event → one line (or block) on stdout; failures go to the
/// log instead so transcripts stay clean.
fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::TranscriptReady {
            text,
            start_ms,
            end_ms,
        } => {
            println!("[{}s..{}s] {}", start_ms / 1_000, end_ms / 1_000, text);
        }
        PipelineEvent::QuestionDetected { text, confidence } => {
            println!("[question {:.0}%] {}", confidence * 100.0, text);
        }
        PipelineEvent::AnswerReady { question, answer } => {
            println!();
            println!("Q: {question}");
            println!("A: {answer}");
            println!();
        }
        PipelineEvent::AnswerFailed { question, cause } => {
            log::warn!("answer failed for {question:?}: {cause}");
        }
        PipelineEvent::TranscriptionFailed { cause } => {
            log::warn!("transcription failed: {cause}");
        }
        PipelineEvent::DroppedAudio { chunks } => {
            log::warn!("capture dropped {chunks} audio chunks under load");
        }
    }
}

// ---------------------------------------------------------------------------
// NoModelStt — fallback SttEngine when the model file is not present
// ---------------------------------------------------------------------------

struct NoModelStt {
    path: String,
}

impl SttEngine for NoModelStt {
    fn transcribe(&self, _audio: &[f32]) -> Result<String, SttError> {
        Err(SttError::ModelNotFound(self.path.clone()))
    }
}
