//! Read-aloud with cancel-before-speak.
//!
//! [`SpeechOutput`] owns at most one active [`Utterance`]. Starting a new one
//! cancels the old one first, so two pieces of advice are never audible at
//! once. The UI calls [`SpeechOutput::poll`] every frame; events carry the
//! [`UtteranceId`] they belong to.

use std::collections::VecDeque;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use crate::config::TtsConfig;
use crate::speech::markdown::speakable_text;
use crate::speech::SpeechError;

pub type UtteranceId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutputEvent {
    Started(UtteranceId),
    Ended(UtteranceId),
    Error(UtteranceId, String),
}

/// A single piece of speech in progress.
pub trait Utterance: Send {
    /// `Ok(true)` once playback has completed.
    fn is_finished(&mut self) -> Result<bool, SpeechError>;
    /// Stop playback immediately.
    fn cancel(&mut self);
}

/// Text-to-speech backend.
pub trait SpeechSynthesizer: Send + Sync {
    /// Begin speaking `text` in `language` (ISO-639-1).
    fn speak(&self, text: &str, language: &str) -> Result<Box<dyn Utterance>, SpeechError>;
}

// ---------------------------------------------------------------------------
// CommandSynthesizer
// ---------------------------------------------------------------------------

/// Runs an espeak-compatible program (`-v <lang> -s <wpm> --stdin`).
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    rate_wpm: u32,
}

impl CommandSynthesizer {
    /// `None` when the configured program is empty or cannot be executed.
    pub fn probe(config: &TtsConfig) -> Option<Self> {
        let program = config.command.trim();
        if program.is_empty() {
            return None;
        }
        match Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => Some(Self {
                program: program.to_string(),
                rate_wpm: config.rate_wpm,
            }),
            Err(e) => {
                log::warn!("text-to-speech unavailable ({program}): {e}");
                None
            }
        }
    }
}

struct ChildUtterance {
    child: Child,
}

impl Utterance for ChildUtterance {
    fn is_finished(&mut self) -> Result<bool, SpeechError> {
        match self.child.try_wait() {
            Ok(None) => Ok(false),
            Ok(Some(status)) if status.success() => Ok(true),
            Ok(Some(status)) => Err(SpeechError::Synthesis(format!("synthesizer exited with {status}"))),
            Err(e) => Err(SpeechError::Synthesis(e.to_string())),
        }
    }

    fn cancel(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for ChildUtterance {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            self.cancel();
        }
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, text: &str, language: &str) -> Result<Box<dyn Utterance>, SpeechError> {
        let mut child = Command::new(&self.program)
            .args(["-v", language, "-s", &self.rate_wpm.to_string(), "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        // The synthesizer reads while it speaks; feed it off-thread.
        if let Some(mut stdin) = child.stdin.take() {
            let text = text.to_string();
            std::thread::spawn(move || {
                if let Err(e) = stdin.write_all(text.as_bytes()) {
                    log::debug!("tts stdin closed early: {e}");
                }
            });
        }
        Ok(Box::new(ChildUtterance { child }))
    }
}

// ---------------------------------------------------------------------------
// SpeechOutput
// ---------------------------------------------------------------------------

/// Keeps at most one utterance audible.
pub struct SpeechOutput {
    synth: Option<Arc<dyn SpeechSynthesizer>>,
    active: Option<(UtteranceId, Box<dyn Utterance>)>,
    next_id: UtteranceId,
    pending: VecDeque<SpeechOutputEvent>,
}

impl SpeechOutput {
    pub fn new(synth: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self {
            synth,
            active: None,
            next_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.synth.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    /// Cancel anything in progress, then speak `markdown` with its markup
    /// removed.
    pub fn speak(&mut self, markdown: &str, language: &str) -> Result<UtteranceId, SpeechError> {
        let synth = self
            .synth
            .clone()
            .ok_or(SpeechError::Unsupported("Text-to-speech"))?;
        self.cancel();

        let id = self.next_id;
        self.next_id += 1;

        match synth.speak(&speakable_text(markdown), language) {
            Ok(utterance) => {
                log::debug!("tts: utterance {id} started ({language})");
                self.active = Some((id, utterance));
                self.pending.push_back(SpeechOutputEvent::Started(id));
                Ok(id)
            }
            Err(e) => {
                self.pending.push_back(SpeechOutputEvent::Error(id, e.to_string()));
                Err(e)
            }
        }
    }

    /// Stop speaking. No event is emitted for a cancelled utterance.
    pub fn cancel(&mut self) {
        if let Some((id, mut utterance)) = self.active.take() {
            log::debug!("tts: utterance {id} cancelled");
            utterance.cancel();
        }
    }

    /// Cancel when speaking, otherwise speak. Returns the new id, if any.
    pub fn toggle(&mut self, markdown: &str, language: &str) -> Result<Option<UtteranceId>, SpeechError> {
        if self.is_speaking() {
            self.cancel();
            Ok(None)
        } else {
            self.speak(markdown, language).map(Some)
        }
    }

    /// Check the active utterance and return everything that happened since
    /// the last call.
    pub fn poll(&mut self) -> Vec<SpeechOutputEvent> {
        if let Some((id, utterance)) = self.active.as_mut() {
            let id = *id;
            match utterance.is_finished() {
                Ok(false) => {}
                Ok(true) => {
                    self.active = None;
                    self.pending.push_back(SpeechOutputEvent::Ended(id));
                }
                Err(e) => {
                    log::warn!("tts: utterance {id} failed: {e}");
                    self.active = None;
                    self.pending.push_back(SpeechOutputEvent::Error(id, e.to_string()));
                }
            }
        }
        self.pending.drain(..).collect()
    }
}

impl Drop for SpeechOutput {
    fn drop(&mut self) {
        self.cancel();
    }
}
