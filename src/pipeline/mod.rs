//! Presentation-layer state and the request pipeline.
//!
//! # Architecture
//!
//! ```text
//! KisanMitraApp (egui, UI thread)
//!        │  AppState::submit_*()  → PipelineCommand   (mpsc)
//!        ▼
//! PipelineRunner::run()  ← async tokio task
//!        │
//!        ├─ Advisory → AdvisoryOrchestrator  (structured → image → fallback)
//!        ├─ Market   → MarketOrchestrator
//!        └─ Soil     → SoilOrchestrator
//!        │
//!        ▼  PipelineOutcome (mpsc) → AppState::apply() each frame
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use kisan_mitra::config::AppConfig;
//! use kisan_mitra::genai::GeminiClient;
//! use kisan_mitra::pipeline::{AppState, PipelineRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = Arc::new(GeminiClient::from_config(&config.genai));
//!     let (command_tx, command_rx) = mpsc::channel(16);
//!     let (outcome_tx, mut outcome_rx) = mpsc::channel(16);
//!     tokio::spawn(PipelineRunner::new(client, &config.genai).run(command_rx, outcome_tx));
//!
//!     let mut state = AppState::default();
//!     state.location = "Nashik, Maharashtra".into();
//!     if let Some(command) = state.submit_market() {
//!         command_tx.send(command).await.unwrap();
//!     }
//!     if let Some(outcome) = outcome_rx.recv().await {
//!         state.apply(outcome);
//!     }
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineCommand, PipelineOutcome, PipelineRunner};
pub use state::{AppState, FeatureState, Ticket};
