//! Microphone path for voice queries.
//!
//! ```text
//! AudioSource (cpal) → AudioChunk (mpsc) → chunk_to_whisper (16 kHz mono)
//!                    → RingBuffer + Endpointer → VadDetector::trim_silence
//! ```
//!
//! ```rust,no_run
//! use std::sync::mpsc;
//! use kisan_mitra::audio::{AudioChunk, AudioSource, CpalSource};
//!
//! let (tx, rx) = mpsc::channel::<AudioChunk>();
//! let _handle = CpalSource.start(tx).unwrap(); // dropping the handle stops the stream
//!
//! while let Ok(chunk) = rx.recv() {
//!     println!("{} samples @ {} Hz", chunk.samples.len(), chunk.sample_rate);
//! }
//! ```

pub mod buffer;
pub mod capture;
pub mod resample;
pub mod vad;

pub use buffer::RingBuffer;
pub use capture::{AudioCapture, AudioChunk, AudioSource, CaptureError, CpalSource, StreamHandle};
pub use resample::{chunk_to_whisper, resample_to_16k, stereo_to_mono, WHISPER_SAMPLE_RATE};
pub use vad::{Endpoint, Endpointer, VadDetector};
