//! Single-shot voice query.
//!
//! # Session flow
//!
//! ```text
//! toggle() ──▶ session thread
//!                ├─ Started
//!                ├─ AudioSource chunks → 16 kHz mono → RingBuffer
//!                │     Endpointer: Finished | TimedOut | stop flag → stop
//!                ├─ drop StreamHandle (microphone released)
//!                ├─ trim silence → SttEngine::transcribe(language)
//!                ├─ Transcript(text)  or  Error(message)
//!                └─ Ended
//! ```
//!
//! A session emits at most one `Transcript`. Calling [`SpeechInput::toggle`]
//! while listening sets the stop flag; what was heard so far is still
//! transcribed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::{
    chunk_to_whisper, AudioSource, Endpoint, Endpointer, RingBuffer, VadDetector,
    WHISPER_SAMPLE_RATE,
};
use crate::config::SpeechConfig;
use crate::speech::SpeechError;
use crate::stt::{SttEngine, MAX_AUDIO_SAMPLES, MIN_AUDIO_SAMPLES};

const NO_SPEECH_MESSAGE: &str = "No speech was detected. Please try again.";

/// Progress of a listening session, delivered to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechInputEvent {
    Started,
    Transcript(String),
    Error(String),
    Ended,
}

struct Session {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Session {
    fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }
}

/// Microphone dictation front end.
pub struct SpeechInput {
    source: Option<Arc<dyn AudioSource>>,
    engine: Option<Arc<dyn SttEngine>>,
    config: SpeechConfig,
    events: mpsc::UnboundedSender<SpeechInputEvent>,
    session: Option<Session>,
}

impl SpeechInput {
    /// `source`/`engine` are `None` when no microphone or no Whisper model is
    /// present; [`toggle`](Self::toggle) then reports `Unsupported`.
    pub fn new(
        source: Option<Arc<dyn AudioSource>>,
        engine: Option<Arc<dyn SttEngine>>,
        config: SpeechConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SpeechInputEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let input = Self {
            source,
            engine,
            config,
            events,
            session: None,
        };
        (input, rx)
    }

    pub fn is_supported(&self) -> bool {
        self.source.is_some() && self.engine.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }

    /// Start listening in `language` (ISO-639-1), or stop early when a
    /// session is running. Returns `true` when a session was started.
    pub fn toggle(&mut self, language: &str) -> Result<bool, SpeechError> {
        if let Some(session) = self.session.as_ref().filter(|s| s.is_running()) {
            log::debug!("speech input: stop requested");
            session.stop.store(true, Ordering::SeqCst);
            return Ok(false);
        }

        let (Some(source), Some(engine)) = (self.source.clone(), self.engine.clone()) else {
            return Err(SpeechError::Unsupported("Voice input"));
        };

        let stop = Arc::new(AtomicBool::new(false));
        let worker = SessionWorker {
            source,
            engine,
            config: self.config.clone(),
            language: language.to_string(),
            stop: Arc::clone(&stop),
            events: self.events.clone(),
        };

        let thread = std::thread::Builder::new()
            .name("speech-input".into())
            .spawn(move || worker.run())
            .map_err(|e| SpeechError::Capture(e.to_string()))?;

        self.session = Some(Session { stop, thread });
        Ok(true)
    }

    /// Ask a running session to stop; it still transcribes what it heard.
    pub fn stop(&self) {
        if let Some(session) = &self.session {
            session.stop.store(true, Ordering::SeqCst);
        }
    }
}

impl Drop for SpeechInput {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Session worker
// ---------------------------------------------------------------------------

struct SessionWorker {
    source: Arc<dyn AudioSource>,
    engine: Arc<dyn SttEngine>,
    config: SpeechConfig,
    language: String,
    stop: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SpeechInputEvent>,
}

impl SessionWorker {
    fn run(self) {
        let _ = self.events.send(SpeechInputEvent::Started);
        let outcome = self.listen().and_then(|audio| self.recognise(&audio));

        let event = match outcome {
            Ok(text) => {
                log::info!("speech input: {} chars recognised", text.chars().count());
                SpeechInputEvent::Transcript(text)
            }
            Err(e) => {
                log::warn!("speech input: {e}");
                SpeechInputEvent::Error(e.to_string())
            }
        };
        let _ = self.events.send(event);
        let _ = self.events.send(SpeechInputEvent::Ended);
    }

    /// Record until end of utterance, timeout, stop request or source end.
    fn listen(&self) -> Result<Vec<f32>, SpeechError> {
        let (tx, rx) = std_mpsc::channel();
        let handle = self
            .source
            .start(tx)
            .map_err(|e| SpeechError::Capture(e.to_string()))?;

        let limit_secs = listen_limit_secs(&self.config);
        let vad = VadDetector::new(self.config.vad_threshold);
        let mut endpointer = Endpointer::new(vad.clone(), self.config.end_silence_ms, limit_secs);
        let mut buffer = RingBuffer::for_duration(limit_secs, WHISPER_SAMPLE_RATE);

        while !self.stop.load(Ordering::SeqCst) {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(chunk) => {
                    let samples = chunk_to_whisper(&chunk);
                    buffer.push_slice(&samples);
                    match endpointer.feed(&samples) {
                        Endpoint::Finished | Endpoint::TimedOut => break,
                        Endpoint::Waiting | Endpoint::Speaking => {}
                    }
                }
                Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        drop(handle);

        log::debug!(
            "speech input: captured {:.1}s ({:?})",
            buffer.duration_secs(WHISPER_SAMPLE_RATE),
            endpointer.state()
        );

        if !endpointer.heard_voice() {
            return Err(SpeechError::Recognition(NO_SPEECH_MESSAGE.into()));
        }
        let audio = buffer.drain();
        let mut clip = vad.trim_silence(&audio).to_vec();
        if clip.is_empty() {
            return Err(SpeechError::Recognition(NO_SPEECH_MESSAGE.into()));
        }
        // Short commands ("tomato") are padded up to Whisper's minimum.
        if clip.len() < MIN_AUDIO_SAMPLES {
            clip.resize(MIN_AUDIO_SAMPLES, 0.0);
        }
        Ok(clip)
    }

    fn recognise(&self, audio: &[f32]) -> Result<String, SpeechError> {
        let text = self
            .engine
            .transcribe(audio, &self.language)
            .map_err(|e| SpeechError::Recognition(e.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::Recognition(NO_SPEECH_MESSAGE.into()));
        }
        Ok(text.to_string())
    }
}

/// Configured listen time, capped at the longest clip Whisper accepts.
fn listen_limit_secs(config: &SpeechConfig) -> f32 {
    let whisper_max = MAX_AUDIO_SAMPLES as f32 / WHISPER_SAMPLE_RATE as f32;
    config.max_listen_secs.min(whisper_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioChunk, CaptureError, StreamHandle};
    use crate::stt::{MockSttEngine, SttError};

    /// Delivers a fixed recording, then closes the channel.
    struct RecordedSource {
        chunks: Vec<AudioChunk>,
    }

    impl AudioSource for RecordedSource {
        fn start(&self, tx: std_mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
            for chunk in &self.chunks {
                let _ = tx.send(chunk.clone());
            }
            Ok(StreamHandle::detached())
        }
    }

    struct BrokenSource;

    impl AudioSource for BrokenSource {
        fn start(&self, _tx: std_mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
            Err(CaptureError::NoDevice)
        }
    }

    /// Keeps the channel open without sending, like a muted microphone.
    struct SilentLiveSource {
        held: std::sync::Mutex<Vec<std_mpsc::Sender<AudioChunk>>>,
    }

    impl AudioSource for SilentLiveSource {
        fn start(&self, tx: std_mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
            self.held.lock().unwrap().push(tx);
            Ok(StreamHandle::detached())
        }
    }

    fn chunk(value: f32, samples: usize) -> AudioChunk {
        AudioChunk {
            samples: vec![value; samples],
            sample_rate: 16_000,
            channels: 1,
        }
    }

    /// 1 s of speech followed by 2 s of silence.
    fn utterance() -> Vec<AudioChunk> {
        vec![chunk(0.0, 4_800), chunk(0.3, 16_000), chunk(0.0, 32_000)]
    }

    fn config() -> SpeechConfig {
        SpeechConfig {
            end_silence_ms: 500,
            max_listen_secs: 10.0,
            ..SpeechConfig::default()
        }
    }

    fn collect(rx: &mut mpsc::UnboundedReceiver<SpeechInputEvent>) -> Vec<SpeechInputEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.blocking_recv() {
            let done = event == SpeechInputEvent::Ended;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn recognised_utterance_yields_one_transcript() {
        let engine = Arc::new(MockSttEngine::ok("गेहूं में पीला रतुआ"));
        let source = Arc::new(RecordedSource { chunks: utterance() });
        let (mut input, mut rx) = SpeechInput::new(Some(source), Some(engine.clone()), config());

        assert!(input.toggle("hi").unwrap());
        let events = collect(&mut rx);

        assert_eq!(
            events,
            vec![
                SpeechInputEvent::Started,
                SpeechInputEvent::Transcript("गेहूं में पीला रतुआ".into()),
                SpeechInputEvent::Ended,
            ]
        );
        assert_eq!(*engine.languages.lock().unwrap(), vec!["hi".to_string()]);
    }

    #[test]
    fn silence_only_reports_no_speech() {
        let engine = Arc::new(MockSttEngine::ok("hallucination"));
        let source = Arc::new(RecordedSource {
            chunks: vec![chunk(0.0, 32_000)],
        });
        let (mut input, mut rx) = SpeechInput::new(Some(source), Some(engine.clone()), config());

        input.toggle("en").unwrap();
        let events = collect(&mut rx);

        assert_eq!(events[1], SpeechInputEvent::Error(NO_SPEECH_MESSAGE.into()));
        assert!(engine.languages.lock().unwrap().is_empty());
    }

    #[test]
    fn recognition_error_is_surfaced_and_session_ends() {
        let engine = Arc::new(MockSttEngine::err(SttError::Transcription("decoder".into())));
        let source = Arc::new(RecordedSource { chunks: utterance() });
        let (mut input, mut rx) = SpeechInput::new(Some(source), Some(engine), config());

        input.toggle("en").unwrap();
        let events = collect(&mut rx);

        assert!(matches!(&events[1], SpeechInputEvent::Error(m) if m.contains("decoder")));
        assert_eq!(events.last(), Some(&SpeechInputEvent::Ended));
    }

    #[test]
    fn capture_failure_is_surfaced() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let (mut input, mut rx) =
            SpeechInput::new(Some(Arc::new(BrokenSource)), Some(engine), config());

        input.toggle("en").unwrap();
        let events = collect(&mut rx);
        assert!(matches!(&events[1], SpeechInputEvent::Error(m) if m.contains("no microphone")));
    }

    #[test]
    fn short_word_is_padded_for_whisper() {
        let engine = Arc::new(MockSttEngine::ok("tomato"));
        let source = Arc::new(RecordedSource {
            chunks: vec![chunk(0.3, 2_400), chunk(0.0, 16_000)],
        });
        let (mut input, mut rx) = SpeechInput::new(Some(source), Some(engine), config());

        input.toggle("en").unwrap();
        assert_eq!(collect(&mut rx)[1], SpeechInputEvent::Transcript("tomato".into()));
    }

    #[test]
    fn long_listen_setting_is_capped_to_whisper_limit() {
        let long = SpeechConfig {
            max_listen_secs: 120.0,
            ..config()
        };
        assert_eq!(listen_limit_secs(&long), 60.0);
        assert_eq!(listen_limit_secs(&config()), 10.0);

        // 70 s of unbroken speech: the session keeps the newest 60 s.
        let engine = Arc::new(MockSttEngine::ok("a very long question"));
        let source = Arc::new(RecordedSource {
            chunks: (0..70).map(|_| chunk(0.3, 16_000)).collect(),
        });
        let (mut input, mut rx) = SpeechInput::new(Some(source), Some(engine), long);

        input.toggle("en").unwrap();
        assert_eq!(
            collect(&mut rx)[1],
            SpeechInputEvent::Transcript("a very long question".into())
        );
    }

    #[test]
    fn toggle_while_listening_stops_early() {
        let engine = Arc::new(MockSttEngine::ok("never"));
        let source = Arc::new(SilentLiveSource {
            held: Default::default(),
        });
        let (mut input, mut rx) = SpeechInput::new(Some(source), Some(engine), config());

        assert!(input.toggle("en").unwrap());
        assert_eq!(rx.blocking_recv(), Some(SpeechInputEvent::Started));
        assert!(input.is_listening());

        assert!(!input.toggle("en").unwrap());
        let rest = collect(&mut rx);
        assert_eq!(rest.last(), Some(&SpeechInputEvent::Ended));
        assert!(rest.iter().all(|e| !matches!(e, SpeechInputEvent::Transcript(_))));
    }

    #[test]
    fn missing_capability_is_unsupported() {
        let (mut input, _rx) = SpeechInput::new(None, Some(Arc::new(MockSttEngine::ok("x"))), config());
        assert!(!input.is_supported());
        assert_eq!(input.toggle("en"), Err(SpeechError::Unsupported("Voice input")));

        let source: Arc<dyn AudioSource> = Arc::new(RecordedSource { chunks: vec![] });
        let (mut input, _rx) = SpeechInput::new(Some(source), None, config());
        assert_eq!(
            input.toggle("en").unwrap_err().to_string(),
            "Voice input is not supported on this device."
        );
    }
}
