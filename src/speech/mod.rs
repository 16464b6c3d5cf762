//! Voice in and voice out.
//!
//! * [`SpeechInput`] — single-shot dictation: microphone → endpointing →
//!   Whisper → one transcript per session.
//! * [`SpeechOutput`] — reads advice aloud through a [`SpeechSynthesizer`],
//!   keeping at most one utterance audible.
//! * [`speakable_text`] — strips Markdown markup before synthesis.

pub mod input;
pub mod markdown;
pub mod output;

use thiserror::Error;

pub use input::{SpeechInput, SpeechInputEvent};
pub use markdown::speakable_text;
pub use output::{
    CommandSynthesizer, SpeechOutput, SpeechOutputEvent, SpeechSynthesizer, Utterance,
    UtteranceId,
};

/// Errors from either speech direction.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    /// The platform lacks the capability (no microphone, no model, no TTS
    /// command). Surfaced once; the rest of the app keeps working.
    #[error("{0} is not supported on this device.")]
    Unsupported(&'static str),

    #[error("Speech recognition error: {0}. Please ensure microphone access is granted.")]
    Capture(String),

    #[error("{0}")]
    Recognition(String),

    #[error("Text-to-speech error: {0}")]
    Synthesis(String),
}
