//! Soil camera: device access, frame handling and the capture state machine.
//!
//! * [`CameraDevice`] / [`CameraStream`]: the hardware seam.
//! * [`FfmpegCamera`]: production device backed by an ffmpeg child process.
//! * [`CameraMachine`]: `Closed → Open → Captured` with retake/cancel.
//! * [`JpegSplitter`] / [`decode_preview`]: MJPEG framing and preview decode.

pub mod ffmpeg;
pub mod frame;
pub mod machine;

use thiserror::Error;

use crate::genai::EncodedImage;

pub use ffmpeg::FfmpegCamera;
pub use frame::{decode_preview, JpegSplitter, PreviewImage};
pub use machine::{CameraMachine, CameraPhase};

pub const CAMERA_ACCESS_MESSAGE: &str =
    "Could not access camera. Please ensure permissions are granted and try again.";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CameraError {
    #[error("Camera not supported on this device.")]
    Unsupported,

    #[error("camera could not be started: {0}")]
    Spawn(String),

    #[error("No picture yet. Wait for the preview, then capture again.")]
    NoFrame,

    #[error("camera image could not be decoded: {0}")]
    Encode(String),
}

impl CameraError {
    pub fn user_message(&self) -> String {
        match self {
            CameraError::Spawn(_) => CAMERA_ACCESS_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Something that can be opened to produce a live stream.
pub trait CameraDevice: Send + Sync {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// An open camera. Dropping it releases the device.
pub trait CameraStream: Send {
    /// Newest complete JPEG frame, if any has arrived.
    fn latest_frame(&self) -> Option<Vec<u8>>;

    /// `false` once the underlying capture has died.
    fn is_alive(&mut self) -> bool;

    /// Take the newest frame and stop the stream.
    fn capture(self: Box<Self>) -> Result<EncodedImage, CameraError>;

    /// Release the device.
    fn stop(&mut self);
}
