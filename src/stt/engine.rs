//! Speech-to-text engine trait and the Whisper implementation.
//!
//! [`SttEngine`] is object-safe and `Send + Sync` so a single loaded model
//! can be shared by every listening session behind an `Arc<dyn SttEngine>`.
//! The language is chosen per call because the farmer can switch it between
//! questions.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// 0.5 s at 16 kHz.
pub const MIN_AUDIO_SAMPLES: usize = 8_000;
/// 60 s at 16 kHz.
pub const MAX_AUDIO_SAMPLES: usize = 960_000;

#[derive(Debug, Clone, Error)]
pub enum SttError {
    #[error("speech model not found: {0}")]
    ModelNotFound(String),

    #[error("speech model failed to load: {0}")]
    ContextInit(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("recording too short, please speak a little longer")]
    AudioTooShort,

    #[error("recording too long")]
    AudioTooLong,
}

/// Transcribes 16 kHz mono `f32` PCM.
pub trait SttEngine: Send + Sync {
    /// `language` is an ISO-639-1 code such as `"hi"`, or `"auto"`.
    fn transcribe(&self, audio: &[f32], language: &str) -> Result<String, SttError>;
}

fn check_length(audio: &[f32]) -> Result<(), SttError> {
    if audio.len() < MIN_AUDIO_SAMPLES {
        Err(SttError::AudioTooShort)
    } else if audio.len() > MAX_AUDIO_SAMPLES {
        Err(SttError::AudioTooLong)
    } else {
        Ok(())
    }
}

/// Inference threads, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Greedy-decoding Whisper over a GGML model loaded once at startup.
///
/// A fresh `WhisperState` is created per call, so no locking is needed.
pub struct WhisperEngine {
    ctx: WhisperContext,
    n_threads: i32,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("n_threads", &self.n_threads)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    pub fn load(model_path: impl AsRef<Path>, use_gpu: bool) -> Result<Self, SttError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }
        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!("non-UTF-8 model path: {}", path.display()))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(use_gpu);
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("whisper model loaded from {} (gpu: {use_gpu})", path.display());
        Ok(Self {
            ctx,
            n_threads: optimal_threads(),
        })
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(&self, audio: &[f32], language: &str) -> Result<String, SttError> {
        check_length(audio)?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(if language == "auto" { None } else { Some(language) });
        params.set_n_threads(self.n_threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let started = std::time::Instant::now();
        state
            .full(params, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        log::debug!(
            "whisper: {} samples ({language}) in {} ms",
            audio.len(),
            started.elapsed().as_millis()
        );
        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine (test-only)
// ---------------------------------------------------------------------------

/// Returns a canned response and records the language of every call.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<String, SttError>,
    pub languages: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSttEngine {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            languages: Default::default(),
        }
    }

    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
            languages: Default::default(),
        }
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(&self, audio: &[f32], language: &str) -> Result<String, SttError> {
        self.languages.lock().unwrap().push(language.to_string());
        check_length(audio)?;
        self.response.clone()
    }
}
