//! Microphone capture via `cpal`.
//!
//! [`AudioSource`] is the seam the speech-input session records through;
//! [`CpalSource`] opens the default input device each time a session starts.
//! The [`StreamHandle`] returned by [`AudioSource::start`] keeps the device
//! open and stops it when dropped, so it must stay on the thread that
//! created it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

/// One callback's worth of interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    /// Device rate in Hz.
    pub sample_rate: u32,
    pub channels: u16,
}

/// RAII guard for an active input stream.
pub struct StreamHandle {
    _stream: Option<cpal::Stream>,
}

impl StreamHandle {
    /// A handle with no device behind it, for sources that deliver audio
    /// without a live stream.
    pub fn detached() -> Self {
        Self { _stream: None }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no microphone found")]
    NoDevice,

    #[error("failed to query microphone config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to open microphone stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start microphone stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Something that can stream microphone audio into a channel.
pub trait AudioSource: Send + Sync {
    /// Begin streaming; audio flows into `tx` until the handle is dropped.
    fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError>;
}

// ---------------------------------------------------------------------------
// cpal implementation
// ---------------------------------------------------------------------------

/// The system default input device, opened on demand.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalSource;

impl CpalSource {
    /// `true` when the default host reports an input device with a usable
    /// config. Used once at startup to decide whether voice input is offered.
    pub fn is_available() -> bool {
        match AudioCapture::new() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("microphone unavailable: {e}");
                false
            }
        }
    }
}

impl AudioSource for CpalSource {
    fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        AudioCapture::new()?.start(tx)
    }
}

/// Default input device plus its preferred stream config.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    pub fn new() -> Result<Self, CaptureError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(CaptureError::NoDevice)?;
        let supported = device.default_input_config()?;

        Ok(Self {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
            config: supported.into(),
            device,
        })
    }

    /// Start the stream. Send failures mean the session ended and are ignored.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            |err: cpal::StreamError| log::error!("microphone stream error: {err}"),
            None,
        )?;

        stream.play()?;
        log::debug!("microphone open: {sample_rate} Hz, {channels} ch");
        Ok(StreamHandle {
            _stream: Some(stream),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn cpal_source_is_object_safe() {
        let source: Box<dyn AudioSource> = Box::new(CpalSource);
        drop(source);
    }

    #[test]
    fn capture_error_messages_are_user_readable() {
        assert_eq!(CaptureError::NoDevice.to_string(), "no microphone found");
    }
}
