//! Pipeline runner: dispatches UI commands to the orchestrators.
//!
//! [`PipelineRunner::run`] receives [`PipelineCommand`]s from the window and
//! spawns one tokio task per request, so a slow advisory never holds up a
//! market lookup or a soil analysis. Each task sends exactly one
//! [`PipelineOutcome`] back, tagged with the ticket it was submitted under.
//!
//! ```text
//! UI ──PipelineCommand──▶ run() ──tokio::spawn──▶ orchestrator
//!  ▲                                                   │
//!  └────────────────────PipelineOutcome────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::advisory::{Advisory, AdvisoryError, AdvisoryOrchestrator};
use crate::config::GenAiConfig;
use crate::genai::{EncodedImage, GenerativeClient};
use crate::market::{MarketError, MarketOrchestrator, MarketPrice};
use crate::pipeline::state::Ticket;
use crate::soil::{SoilAnalysisResult, SoilError, SoilOrchestrator};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Requests sent from the UI thread.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    Advisory {
        ticket: Ticket,
        query: String,
        /// Display name the answer should be written in.
        language: String,
    },
    Market {
        ticket: Ticket,
        location: String,
    },
    Soil {
        ticket: Ticket,
        image: EncodedImage,
        language: String,
    },
}

impl PipelineCommand {
    pub fn ticket(&self) -> Ticket {
        match self {
            PipelineCommand::Advisory { ticket, .. }
            | PipelineCommand::Market { ticket, .. }
            | PipelineCommand::Soil { ticket, .. } => *ticket,
        }
    }
}

/// Finished requests delivered back to the UI.
#[derive(Debug)]
pub enum PipelineOutcome {
    Advisory {
        ticket: Ticket,
        result: Result<Advisory, AdvisoryError>,
    },
    Market {
        ticket: Ticket,
        result: Result<Vec<MarketPrice>, MarketError>,
    },
    Soil {
        ticket: Ticket,
        result: Result<SoilAnalysisResult, SoilError>,
    },
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Owns the three orchestrators. Cheap to clone.
#[derive(Clone)]
pub struct PipelineRunner {
    advisory: Arc<AdvisoryOrchestrator>,
    market: Arc<MarketOrchestrator>,
    soil: Arc<SoilOrchestrator>,
}

impl PipelineRunner {
    /// Build every orchestrator over one shared client.
    pub fn new(client: Arc<dyn GenerativeClient>, config: &GenAiConfig) -> Self {
        Self {
            advisory: Arc::new(AdvisoryOrchestrator::new(Arc::clone(&client), config)),
            market: Arc::new(MarketOrchestrator::new(Arc::clone(&client), config)),
            soil: Arc::new(SoilOrchestrator::new(client, config)),
        }
    }

    /// Serve commands until `commands` is closed. Spawn this on the runtime.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<PipelineCommand>,
        outcomes: mpsc::Sender<PipelineOutcome>,
    ) {
        while let Some(command) = commands.recv().await {
            let runner = self.clone();
            let outcomes = outcomes.clone();
            tokio::spawn(async move {
                let ticket = command.ticket();
                let outcome = runner.execute(command).await;
                if outcomes.send(outcome).await.is_err() {
                    log::debug!("pipeline: UI gone, dropping outcome for ticket {ticket}");
                }
            });
        }

        log::info!("pipeline: command channel closed, runner shutting down");
    }

    /// Run one command to completion.
    pub async fn execute(&self, command: PipelineCommand) -> PipelineOutcome {
        match command {
            PipelineCommand::Advisory {
                ticket,
                query,
                language,
            } => {
                let result = self.advisory.get_advisory(&query, &language).await;
                if let Err(e) = &result {
                    log::error!("pipeline: advisory {ticket} failed: {e}");
                }
                PipelineOutcome::Advisory { ticket, result }
            }
            PipelineCommand::Market { ticket, location } => {
                let result = self.market.get_market_prices(&location).await;
                if let Err(e) = &result {
                    log::error!("pipeline: market {ticket} failed: {e}");
                }
                PipelineOutcome::Market { ticket, result }
            }
            PipelineCommand::Soil {
                ticket,
                image,
                language,
            } => {
                let result = self.soil.get_soil_analysis(&image, &language).await;
                if let Err(e) = &result {
                    log::error!("pipeline: soil {ticket} failed: {e}");
                }
                PipelineOutcome::Soil { ticket, result }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
