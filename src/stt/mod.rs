//! Offline speech recognition with Whisper.
//!
//! ```rust,no_run
//! use kisan_mitra::stt::{SttEngine, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-small.bin", false).unwrap();
//! let audio = vec![0.0_f32; 16_000]; // 1 s, 16 kHz mono
//! println!("{}", engine.transcribe(&audio, "hi").unwrap());
//! ```

pub mod engine;
pub mod model;

pub use engine::{SttEngine, SttError, WhisperEngine, MAX_AUDIO_SAMPLES, MIN_AUDIO_SAMPLES};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, WHISPER_MODELS};

#[cfg(test)]
pub use engine::MockSttEngine;
