//! Whisper model registry and on-disk resolution.
//!
//! Only multilingual models are listed: every supported UI language
//! (Hindi, Marathi, Tamil, …) must be recognisable by the same model.

use std::path::PathBuf;

use crate::config::AppPaths;

#[derive(Debug)]
pub struct ModelInfo {
    /// Value of `speech.stt_model` in settings.
    pub id: &'static str,
    pub display_name: &'static str,
    pub file_name: &'static str,
    pub file_size_mb: u64,
    pub source_url: &'static str,
}

pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "whisper-base",
        display_name: "Whisper Base",
        file_name: "ggml-base.bin",
        file_size_mb: 142,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "whisper-small",
        display_name: "Whisper Small",
        file_name: "ggml-small.bin",
        file_size_mb: 466,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "whisper-medium",
        display_name: "Whisper Medium",
        file_name: "ggml-medium.bin",
        file_size_mb: 1_500,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
];

pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

/// Where GGML files live.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub models_dir: PathBuf,
}

impl ModelPaths {
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self::new(app_paths.models_dir.clone())
    }

    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Path of the configured model if it is known and present on disk.
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        let model = find_model_by_id(id)?;
        let path = self.model_path(model);
        path.exists().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_registered() {
        let m = find_model_by_id("whisper-small").unwrap();
        assert_eq!(m.file_name, "ggml-small.bin");
        assert!(find_model_by_id("thonburian-medium").is_none());
    }

    #[test]
    fn resolve_requires_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ModelPaths::new(dir.path());
        assert!(paths.resolve("whisper-base").is_none());

        std::fs::write(dir.path().join("ggml-base.bin"), b"ggml").unwrap();
        assert_eq!(paths.resolve("whisper-base"), Some(dir.path().join("ggml-base.bin")));
        assert!(paths.resolve("unknown-model").is_none());
    }
}
