//! Energy-based voice activity detection.
//!
//! Audio is judged in 30 ms frames (480 samples at 16 kHz); a frame is voice
//! when its RMS exceeds the threshold. [`VadDetector`] trims silence off a
//! finished clip, [`Endpointer`] decides while listening when the speaker
//! has finished.

/// 30 ms at 16 kHz.
const FRAME_SAMPLES: usize = 480;

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Silence trimmer for a complete clip.
///
/// ```rust
/// use kisan_mitra::audio::VadDetector;
///
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// assert_eq!(VadDetector::new(0.01).trim_silence(&audio).len(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct VadDetector {
    rms_threshold: f32,
    frame_size: usize,
}

impl VadDetector {
    pub fn new(rms_threshold: f32) -> Self {
        Self::with_frame_size(rms_threshold, FRAME_SAMPLES)
    }

    /// # Panics
    ///
    /// Panics if `frame_size == 0`.
    pub fn with_frame_size(rms_threshold: f32, frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be > 0");
        Self {
            rms_threshold,
            frame_size,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    pub fn is_voice(&self, frame: &[f32]) -> bool {
        rms(frame) > self.rms_threshold
    }

    /// Sub-slice from the first to the last voiced frame; empty when the
    /// whole clip is silent.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let voiced: Vec<usize> = audio
            .chunks(self.frame_size)
            .enumerate()
            .filter(|(_, frame)| self.is_voice(frame))
            .map(|(i, _)| i)
            .collect();

        match (voiced.first(), voiced.last()) {
            (Some(&first), Some(&last)) => {
                let start = first * self.frame_size;
                let end = ((last + 1) * self.frame_size).min(audio.len());
                &audio[start..end]
            }
            _ => &audio[..0],
        }
    }
}

// ---------------------------------------------------------------------------
// Endpointer
// ---------------------------------------------------------------------------

/// Where a listening session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Nothing voiced yet.
    Waiting,
    /// Speech heard, utterance not finished.
    Speaking,
    /// Speech followed by enough trailing silence.
    Finished,
    /// The listen limit elapsed.
    TimedOut,
}

/// Streaming end-of-utterance detector over 16 kHz mono samples.
///
/// ```rust
/// use kisan_mitra::audio::{Endpoint, Endpointer, VadDetector};
///
/// let mut ep = Endpointer::new(VadDetector::new(0.01), 300, 10.0);
/// assert_eq!(ep.feed(&vec![0.4; 4_800]), Endpoint::Speaking);
/// assert_eq!(ep.feed(&vec![0.0; 4_800]), Endpoint::Finished);
/// ```
#[derive(Debug)]
pub struct Endpointer {
    vad: VadDetector,
    /// Pending samples shorter than one frame.
    carry: Vec<f32>,
    heard_voice: bool,
    silent_frames: usize,
    end_silence_frames: usize,
    total_frames: usize,
    max_frames: usize,
}

impl Endpointer {
    pub fn new(vad: VadDetector, end_silence_ms: u64, max_listen_secs: f32) -> Self {
        // 16 samples per millisecond at 16 kHz.
        let end_silence_frames = (end_silence_ms as usize * 16).div_ceil(vad.frame_size);
        let max_samples = (max_listen_secs.max(0.0) * 16_000.0).round() as usize;
        let max_frames = max_samples.div_ceil(vad.frame_size);
        Self {
            vad,
            carry: Vec::new(),
            heard_voice: false,
            silent_frames: 0,
            end_silence_frames: end_silence_frames.max(1),
            total_frames: 0,
            max_frames: max_frames.max(1),
        }
    }

    /// Consume more samples and report the state after the last full frame.
    pub fn feed(&mut self, samples: &[f32]) -> Endpoint {
        self.carry.extend_from_slice(samples);
        let frame_size = self.vad.frame_size;
        let full = self.carry.len() / frame_size * frame_size;

        for frame in self.carry[..full].chunks_exact(frame_size) {
            self.total_frames += 1;
            if self.vad.is_voice(frame) {
                self.heard_voice = true;
                self.silent_frames = 0;
            } else if self.heard_voice {
                self.silent_frames += 1;
            }
        }
        self.carry.drain(..full);
        self.state()
    }

    pub fn state(&self) -> Endpoint {
        if self.heard_voice && self.silent_frames >= self.end_silence_frames {
            Endpoint::Finished
        } else if self.total_frames >= self.max_frames {
            Endpoint::TimedOut
        } else if self.heard_voice {
            Endpoint::Speaking
        } else {
            Endpoint::Waiting
        }
    }

    pub fn heard_voice(&self) -> bool {
        self.heard_voice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(pre: usize, voice: usize, post: usize) -> Vec<f32> {
        let mut v = vec![0.0; pre];
        v.extend(vec![0.5; voice]);
        v.extend(vec![0.0; post]);
        v
    }

    #[test]
    fn trims_both_ends() {
        let audio = signal(960, 480, 960);
        assert_eq!(VadDetector::new(0.01).trim_silence(&audio).len(), 480);
    }

    #[test]
    fn silent_clip_trims_to_nothing() {
        let vad = VadDetector::new(0.01);
        assert!(vad.trim_silence(&[0.0; 1440]).is_empty());
        assert!(vad.trim_silence(&[]).is_empty());
    }

    #[test]
    fn fully_voiced_clip_untouched() {
        assert_eq!(VadDetector::new(0.01).trim_silence(&[0.5; 1000]).len(), 1000);
    }

    #[test]
    fn custom_frame_size() {
        let vad = VadDetector::with_frame_size(0.01, 160);
        assert_eq!(vad.trim_silence(&signal(160, 160, 160)).len(), 160);
    }

    #[test]
    #[should_panic(expected = "frame_size must be > 0")]
    fn zero_frame_size_panics() {
        VadDetector::with_frame_size(0.01, 0);
    }

    #[test]
    fn silence_before_speech_never_finishes() {
        let mut ep = Endpointer::new(VadDetector::new(0.01), 300, 10.0);
        assert_eq!(ep.feed(&[0.0; 16_000]), Endpoint::Waiting);
        assert!(!ep.heard_voice());
    }

    #[test]
    fn short_pause_keeps_speaking() {
        let mut ep = Endpointer::new(VadDetector::new(0.01), 600, 10.0);
        ep.feed(&[0.5; 4_800]);
        assert_eq!(ep.feed(&[0.0; 4_800]), Endpoint::Speaking); // 300 ms < 600 ms
        ep.feed(&[0.5; 480]);
        assert_eq!(ep.feed(&[0.0; 4_800]), Endpoint::Speaking);
        assert_eq!(ep.feed(&[0.0; 4_800]), Endpoint::Finished);
    }

    #[test]
    fn partial_frames_accumulate() {
        let mut ep = Endpointer::new(VadDetector::new(0.01), 300, 10.0);
        assert_eq!(ep.feed(&[0.5; 100]), Endpoint::Waiting);
        assert_eq!(ep.feed(&[0.5; 380]), Endpoint::Speaking);
    }

    #[test]
    fn listen_limit_times_out() {
        // 1 s rounds up to 34 frames of 480 samples.
        let mut ep = Endpointer::new(VadDetector::new(0.01), 300, 1.0);
        assert_eq!(ep.feed(&[0.0; 15_840]), Endpoint::Waiting);
        assert_eq!(ep.feed(&[0.0; 480]), Endpoint::TimedOut);

        let mut ep = Endpointer::new(VadDetector::new(0.01), 300, 1.0);
        assert_eq!(ep.feed(&[0.5; 16_320]), Endpoint::TimedOut);
    }
}
