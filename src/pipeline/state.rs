//! Per-feature state machines and the UI-owned application state.
//!
//! [`FeatureState`] is the lifecycle of one feature's request:
//!
//! ```text
//! Idle ──submit──▶ Loading{ticket} ──resolve Ok──▶ Success(T)
//!                         │          ──resolve Err─▶ Error(message)
//! Success / Error ──submit──▶ Loading (previous result cleared)
//! Idle / Success / Error ──invalid input──▶ Error(validation message)
//! ```
//!
//! [`AppState`] owns the three features plus the form inputs. Its `submit_*`
//! methods validate input and hand back the [`PipelineCommand`] to dispatch;
//! [`AppState::apply`] folds a [`PipelineOutcome`] back in.

use crate::advisory::{Advisory, AdvisoryError};
use crate::genai::EncodedImage;
use crate::language::{Language, DEFAULT_LANGUAGE};
use crate::market::{MarketError, MarketPrice};
use crate::pipeline::runner::{PipelineCommand, PipelineOutcome};
use crate::soil::{SoilAnalysisResult, SoilError};

/// Identifies one submitted request. Monotonic per [`AppState`].
pub type Ticket = u64;

// ---------------------------------------------------------------------------
// FeatureState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeatureState<T> {
    #[default]
    Idle,
    Loading {
        ticket: Ticket,
    },
    Success(T),
    Error(String),
}

impl<T> FeatureState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FeatureState::Loading { .. })
    }

    /// Enter `Loading`, dropping any previous result.
    pub fn begin(&mut self, ticket: Ticket) {
        *self = FeatureState::Loading { ticket };
    }

    /// Settle the request identified by `ticket`. Results for any other
    /// ticket (or arriving when not loading) are stale and ignored.
    ///
    /// Returns `true` when the result was applied.
    ///
    /// ```
    /// use kisan_mitra::pipeline::FeatureState;
    ///
    /// let mut state: FeatureState<u32> = FeatureState::Idle;
    /// state.begin(2);
    /// assert!(!state.resolve(1, Ok(10)));
    /// assert!(state.resolve(2, Ok(20)));
    /// assert_eq!(state, FeatureState::Success(20));
    /// ```
    pub fn resolve(&mut self, ticket: Ticket, result: Result<T, String>) -> bool {
        match self {
            FeatureState::Loading { ticket: current } if *current == ticket => {
                *self = match result {
                    Ok(value) => FeatureState::Success(value),
                    Err(message) => FeatureState::Error(message),
                };
                true
            }
            _ => false,
        }
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            FeatureState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FeatureState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            FeatureState::Idle => "Idle",
            FeatureState::Loading { .. } => "Loading",
            FeatureState::Success(_) => "Success",
            FeatureState::Error(_) => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Everything the window renders, owned by the UI thread.
pub struct AppState {
    pub advisory: FeatureState<Advisory>,
    pub market: FeatureState<Vec<MarketPrice>>,
    pub soil: FeatureState<SoilAnalysisResult>,

    /// Advisory question box.
    pub query: String,
    /// Market location box.
    pub location: String,
    /// Drives the advisory/soil answer language and both speech directions.
    pub language: Language,

    pub listening: bool,
    pub speaking: bool,
    /// Speech or capability problems, shown under the advisory form without
    /// disturbing the advisory result itself.
    pub advisory_error: Option<String>,

    next_ticket: Ticket,
}

impl AppState {
    pub fn new(language: Language) -> Self {
        Self {
            advisory: FeatureState::Idle,
            market: FeatureState::Idle,
            soil: FeatureState::Idle,
            query: String::new(),
            location: String::new(),
            language,
            listening: false,
            speaking: false,
            advisory_error: None,
            next_ticket: 1,
        }
    }

    fn ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Validate the question and start an advisory request.
    ///
    /// `None` while a request is in flight (no-op) or when the question is
    /// blank (the feature moves to `Error` with the validation message).
    pub fn submit_advisory(&mut self) -> Option<PipelineCommand> {
        if self.advisory.is_loading() {
            return None;
        }
        let query = self.query.trim();
        if query.is_empty() {
            self.advisory = FeatureState::Error(AdvisoryError::Validation.user_message());
            return None;
        }
        let query = query.to_string();

        let ticket = self.ticket();
        self.advisory.begin(ticket);
        self.advisory_error = None;
        self.listening = false;
        log::debug!("advisory: → Loading (ticket {ticket})");
        Some(PipelineCommand::Advisory {
            ticket,
            query,
            language: self.language.name.to_string(),
        })
    }

    /// Put a dictated question into the query box. A transcript that lands
    /// after the question was already sent is dropped.
    pub fn accept_transcript(&mut self, text: String) -> bool {
        if self.advisory.is_loading() {
            log::debug!("speech input: transcript ignored, advisory already loading");
            return false;
        }
        self.query = text;
        true
    }

    pub fn submit_market(&mut self) -> Option<PipelineCommand> {
        if self.market.is_loading() {
            return None;
        }
        let location = self.location.trim();
        if location.is_empty() {
            self.market = FeatureState::Error(MarketError::Validation.user_message());
            return None;
        }
        let location = location.to_string();

        let ticket = self.ticket();
        self.market.begin(ticket);
        log::debug!("market: → Loading (ticket {ticket})");
        Some(PipelineCommand::Market { ticket, location })
    }

    /// `image` is the captured frame taken from the camera machine.
    pub fn submit_soil(&mut self, image: Option<EncodedImage>) -> Option<PipelineCommand> {
        if self.soil.is_loading() {
            return None;
        }
        let Some(image) = image.filter(|img| !img.data.is_empty()) else {
            self.soil = FeatureState::Error(SoilError::Validation.user_message());
            return None;
        };

        let ticket = self.ticket();
        self.soil.begin(ticket);
        log::debug!("soil: → Loading (ticket {ticket})");
        Some(PipelineCommand::Soil {
            ticket,
            image,
            language: self.language.name.to_string(),
        })
    }

    /// Fold a finished request back into its feature. Returns `true` when it
    /// was current; stale outcomes are dropped.
    pub fn apply(&mut self, outcome: PipelineOutcome) -> bool {
        let (feature, applied) = match outcome {
            PipelineOutcome::Advisory { ticket, result } => (
                "advisory",
                self.advisory
                    .resolve(ticket, result.map_err(|e| e.user_message())),
            ),
            PipelineOutcome::Market { ticket, result } => (
                "market",
                self.market
                    .resolve(ticket, result.map_err(|e| e.user_message())),
            ),
            PipelineOutcome::Soil { ticket, result } => (
                "soil",
                self.soil.resolve(ticket, result.map_err(|e| e.user_message())),
            ),
        };
        if !applied {
            log::debug!("{feature}: stale outcome discarded");
        }
        applied
    }

    /// Clear the soil result so a new sample can be photographed.
    pub fn reset_soil(&mut self) {
        if !self.soil.is_loading() {
            self.soil = FeatureState::Idle;
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
