//! Model registry, metadata and path resolution.
//!
//! [`WHISPER_MODELS`] lists the GGML builds of the standard multilingual
//! Whisper models, smallest to largest.  `SttConfig::model` names one by id
//! (`"tiny"`, `"base"`, `"small"`, `"medium"`), which resolves to a
//! `ggml-{id}.bin` file under the models directory.
//!
//! [`ModelPaths`] resolves the on-disk location of a model given an
//! [`crate::config::AppPaths`] instance.

use std::path::PathBuf;

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// ModelSize
// ---------------------------------------------------------------------------

/// Approximate capacity tier of a Whisper GGML model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    /// ~75 MB file / ~273 MB RAM — fastest, lowest accuracy.
    Tiny,
    /// ~142 MB file / ~388 MB RAM — balanced for live use (recommended). ✅
    Base,
    /// ~466 MB file / ~852 MB RAM — better accuracy, slower than real time
    /// on weaker CPUs.
    Small,
    /// ~1.5 GB file / ~2.1 GB RAM — highest accuracy of the practical tiers.
    Medium,
}

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Unique identifier used in `SttConfig::model` (e.g. `"base"`).
    pub id: &'static str,
    /// Human-readable display name for logs and listings.
    pub display_name: &'static str,
    /// Model capacity tier.
    pub size: ModelSize,
    /// File name under the models directory (e.g. `"ggml-base.bin"`).
    pub file_name: &'static str,
    /// Approximate file size in megabytes.
    pub file_size_mb: u64,
    /// Minimum RAM required to run this model (megabytes).
    pub ram_required_mb: u64,
    /// Source URL for downloading the GGML file.
    pub source_url: &'static str,
}

// ---------------------------------------------------------------------------
// Whisper models (multilingual)
// ---------------------------------------------------------------------------

/// Standard OpenAI Whisper models in GGML form, smallest first.
///
/// Anything bigger than `medium` is not listed: on CPUs that need a local
/// pipeline in the first place, `large` cannot keep up with live audio.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "tiny",
        display_name: "Whisper Tiny",
        size: ModelSize::Tiny,
        file_name: "ggml-tiny.bin",
        file_size_mb: 75,
        ram_required_mb: 273,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "base",
        display_name: "Whisper Base [Recommended]",
        size: ModelSize::Base,
        file_name: "ggml-base.bin",
        file_size_mb: 142,
        ram_required_mb: 388,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "small",
        display_name: "Whisper Small",
        size: ModelSize::Small,
        file_name: "ggml-small.bin",
        file_size_mb: 466,
        ram_required_mb: 852,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "medium",
        display_name: "Whisper Medium",
        size: ModelSize::Medium,
        file_name: "ggml-medium.bin",
        file_size_mb: 1_500,
        ram_required_mb: 2_100,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find a [`ModelInfo`] by its `id` string.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files from [`AppPaths`].
///
/// ```rust,no_run
/// use audio_assistant::config::AppPaths;
/// use audio_assistant::stt::{ModelPaths, WHISPER_MODELS};
///
/// let paths = ModelPaths::from_app_paths(&AppPaths::new());
/// let available: Vec<_> = WHISPER_MODELS.iter()
///     .filter(|m| paths.is_available(m))
///     .collect();
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Build a [`ModelPaths`] from the application's [`AppPaths`].
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    /// Construct directly from a models directory path (useful in tests).
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }

    /// Returns all registry models that are present on disk.
    pub fn list_local_models(&self) -> Vec<&'static ModelInfo> {
        WHISPER_MODELS
            .iter()
            .filter(|m| self.is_available(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_ordered_smallest_first() {
        let sizes: Vec<u64> = WHISPER_MODELS.iter().map(|m| m.file_size_mb).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sizes, sorted);
    }

    #[test]
    fn model_ids_match_file_names() {
        for m in WHISPER_MODELS {
            assert_eq!(
                m.file_name,
                format!("ggml-{}.bin", m.id),
                "file name of {} must follow the ggml-{{id}}.bin convention",
                m.id
            );
        }
    }

    #[test]
    fn find_model_by_id_known() {
        let m = find_model_by_id("base");
        assert!(m.is_some());
        assert_eq!(m.unwrap().size, ModelSize::Base);
    }

    #[test]
    fn find_model_by_id_unknown() {
        assert!(find_model_by_id("does-not-exist").is_none());
    }

    #[test]
    fn model_paths_non_existent_returns_false() {
        let mp = ModelPaths::new("/nonexistent/path");
        let model = &WHISPER_MODELS[0];
        assert!(!mp.is_available(model));
    }

    #[test]
    fn model_paths_correct_file_name() {
        let mp = ModelPaths::new("/models");
        let model = find_model_by_id("base").unwrap();
        let p = mp.model_path(model);
        assert!(p.to_str().unwrap().ends_with("ggml-base.bin"));
    }
}
