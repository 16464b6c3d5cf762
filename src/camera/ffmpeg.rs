//! Camera access through an ffmpeg child process.
//!
//! ffmpeg reads the platform capture device and writes MJPEG to stdout; a
//! reader thread splits the stream and keeps only the newest frame. Killing
//! the child is what releases the device.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::camera::frame::JpegSplitter;
use crate::camera::{CameraDevice, CameraError, CameraStream};
use crate::config::CameraConfig;
use crate::genai::EncodedImage;

type LatestFrame = Arc<Mutex<Option<Vec<u8>>>>;

/// Launches ffmpeg against the configured capture device.
#[derive(Debug, Clone)]
pub struct FfmpegCamera {
    config: CameraConfig,
}

impl FfmpegCamera {
    /// `None` when the capture program is missing.
    pub fn probe(config: &CameraConfig) -> Option<Self> {
        match Command::new(&config.command)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => Some(Self {
                config: config.clone(),
            }),
            Err(e) => {
                log::warn!("camera unavailable ({}): {e}", config.command);
                None
            }
        }
    }

    /// Arguments for one capture session.
    pub fn args(&self) -> Vec<String> {
        let c = &self.config;
        let quality = c.jpeg_quality.clamp(2, 31).to_string();
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            c.input_format.as_str(),
            "-i",
            c.device.as_str(),
            "-f",
            "mjpeg",
            "-q:v",
            quality.as_str(),
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl CameraDevice for FfmpegCamera {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        let mut child = Command::new(&self.config.command)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CameraError::Spawn(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CameraError::Spawn("capture process has no stdout".into()))?;

        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let reader = {
            let latest = Arc::clone(&latest);
            std::thread::Builder::new()
                .name("camera-reader".into())
                .spawn(move || read_frames(stdout, latest))
                .map_err(|e| CameraError::Spawn(e.to_string()))?
        };

        log::info!("camera: opened {} via {}", self.config.device, self.config.command);
        Ok(Box::new(FfmpegStream {
            child,
            latest,
            reader: Some(reader),
        }))
    }
}

fn read_frames(mut stdout: impl Read, latest: LatestFrame) {
    let mut splitter = JpegSplitter::default();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if let Some(frame) = splitter.push(&buf[..n]).pop() {
                    if let Ok(mut slot) = latest.lock() {
                        *slot = Some(frame);
                    }
                }
            }
            Err(e) => {
                log::debug!("camera: stream read ended: {e}");
                break;
            }
        }
    }
}

struct FfmpegStream {
    child: Child,
    latest: LatestFrame,
    reader: Option<JoinHandle<()>>,
}

impl CameraStream for FfmpegStream {
    fn latest_frame(&self) -> Option<Vec<u8>> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn capture(mut self: Box<Self>) -> Result<EncodedImage, CameraError> {
        let frame = self.latest_frame();
        self.stop();
        let frame = frame.ok_or(CameraError::NoFrame)?;
        Ok(EncodedImage::from_bytes("image/jpeg", &frame))
    }

    fn stop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        log::debug!("camera: stream stopped");
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.stop();
        }
    }
}
