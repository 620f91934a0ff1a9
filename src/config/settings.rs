//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and utterance segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Input device index from `--list-devices` — `None` means auto-detect a
    /// loopback device, falling back to the first input device.
    pub device_index: Option<usize>,
    /// Sample rate in Hz that utterances are delivered at (Whisper wants
    /// 16 000).
    pub target_sample_rate: u32,
    /// RMS level below which a chunk counts as silence (0.0 – 1.0).
    pub silence_threshold: f32,
    /// Silence run that closes an utterance, in ms.
    pub min_silence_ms: u64,
    /// Utterances shorter than this are discarded, in ms.
    pub min_utterance_ms: u64,
    /// Utterances are force-emitted at this length, in ms.
    pub max_utterance_ms: u64,
    /// Capacity of the capture queue between the audio callback and the
    /// segmentation worker, in chunks.  Oldest chunks are dropped on
    /// overflow.
    pub queue_capacity_chunks: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_index: None,
            target_sample_rate: 16_000,
            silence_threshold: 0.015,
            min_silence_ms: 1_000,
            min_utterance_ms: 1_500,
            max_utterance_ms: 10_000,
            queue_capacity_chunks: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper STT engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SttConfig {
    /// GGML model id (e.g. `"base"`, `"small"`); resolved to
    /// `ggml-<id>.bin` in the models directory.
    pub model: String,
    /// Primary speech language as an ISO-639-1 code, or `"auto"` for
    /// Whisper's built-in language detection.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "base".into(),
            language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the Ollama answer backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Ollama server (default `http://localhost:11434`).
    pub base_url: String,
    /// Model identifier sent to the API (e.g. `"llama3.2:3b"`).
    pub model: String,
    /// Token cap for one answer (`options.num_predict`).
    pub max_answer_tokens: u32,
    /// Sampling temperature (0.0 – 1.0).  Lower = more deterministic.
    pub temperature: f32,
    /// Maximum seconds to wait for an answer before timing out.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2:3b".into(),
            max_answer_tokens: 150,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Settings for question detection and answering behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Question sensitivity (0.0 – 1.0).  Higher values lower the
    /// confidence threshold, accepting weaker question signals.
    pub sensitivity: f32,
    /// Generate answers automatically; when `false`, questions are only
    /// detected and recorded.
    pub auto_answer: bool,
    /// Number of recent conversation entries handed to the model as
    /// prompt context.
    pub context_window_entries: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.7,
            auto_answer: true,
            context_window_entries: 6,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use audio_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio capture / segmentation settings.
    pub audio: AudioConfig,
    /// STT engine settings.
    pub stt: SttConfig,
    /// Ollama answer backend settings.
    pub llm: LlmConfig,
    /// Question detection settings.
    pub detection: DetectionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            stt: SttConfig::default(),
            llm: LlmConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
