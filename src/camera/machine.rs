//! Camera sub-state of the soil panel.
//!
//! ```text
//! Closed ──open──▶ Open ──capture──▶ Captured ──take_for_analysis──▶ Closed
//!   ▲               │                   │
//!   └────cancel─────┘◀─────retake───────┘ (re-opens the device)
//! ```
//!
//! Every exit from `Open` stops the stream: capture consumes it, cancel and
//! drop stop it.

use std::sync::Arc;

use crate::camera::{CameraDevice, CameraError, CameraStream};
use crate::genai::EncodedImage;

/// Observable phase, without the resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPhase {
    Closed,
    Open,
    Captured,
}

enum CameraState {
    Closed,
    Open(Box<dyn CameraStream>),
    Captured(EncodedImage),
}

pub struct CameraMachine {
    device: Option<Arc<dyn CameraDevice>>,
    state: CameraState,
}

impl CameraMachine {
    /// `device` is `None` when no capture program was found.
    pub fn new(device: Option<Arc<dyn CameraDevice>>) -> Self {
        Self {
            device,
            state: CameraState::Closed,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.device.is_some()
    }

    pub fn phase(&self) -> CameraPhase {
        match self.state {
            CameraState::Closed => CameraPhase::Closed,
            CameraState::Open(_) => CameraPhase::Open,
            CameraState::Captured(_) => CameraPhase::Captured,
        }
    }

    /// Acquire the device. Also serves as retake from `Captured`; a no-op
    /// when already open. On failure the machine is `Closed`.
    pub fn open(&mut self) -> Result<(), CameraError> {
        if matches!(self.state, CameraState::Open(_)) {
            return Ok(());
        }
        self.state = CameraState::Closed;

        let device = self.device.as_ref().ok_or(CameraError::Unsupported)?;
        let stream = device.open()?;
        log::debug!("camera: Closed → Open");
        self.state = CameraState::Open(stream);
        Ok(())
    }

    /// Discard the captured picture and reopen the camera.
    pub fn retake(&mut self) -> Result<(), CameraError> {
        self.open()
    }

    /// Freeze the newest frame. Without a frame yet the camera stays open.
    pub fn capture(&mut self) -> Result<(), CameraError> {
        let CameraState::Open(stream) = &self.state else {
            return Err(CameraError::NoFrame);
        };
        if stream.latest_frame().is_none() {
            return Err(CameraError::NoFrame);
        }

        let CameraState::Open(stream) = std::mem::replace(&mut self.state, CameraState::Closed)
        else {
            return Err(CameraError::NoFrame);
        };
        let image = stream.capture()?;
        log::debug!("camera: Open → Captured");
        self.state = CameraState::Captured(image);
        Ok(())
    }

    /// Stop the camera or drop the captured picture.
    pub fn cancel(&mut self) {
        if let CameraState::Open(stream) = &mut self.state {
            stream.stop();
        }
        self.state = CameraState::Closed;
    }

    /// Hand the captured picture over for analysis, closing the machine.
    pub fn take_for_analysis(&mut self) -> Option<EncodedImage> {
        match std::mem::replace(&mut self.state, CameraState::Closed) {
            CameraState::Captured(image) => Some(image),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn captured(&self) -> Option<&EncodedImage> {
        match &self.state {
            CameraState::Captured(image) => Some(image),
            _ => None,
        }
    }

    /// Newest live frame while open.
    pub fn preview_frame(&self) -> Option<Vec<u8>> {
        match &self.state {
            CameraState::Open(stream) => stream.latest_frame(),
            _ => None,
        }
    }

    /// Detect a stream that died on its own (device unplugged, permission
    /// revoked); closes the machine and reports it once.
    pub fn check_stream(&mut self) -> Option<CameraError> {
        let CameraState::Open(stream) = &mut self.state else {
            return None;
        };
        if stream.is_alive() {
            return None;
        }
        log::warn!("camera: stream ended unexpectedly");
        self.cancel();
        Some(CameraError::Spawn("capture process exited".into()))
    }
}
