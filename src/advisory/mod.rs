//! Farming advisory: a free-text question answered with Markdown advice and
//! an optional illustrative image.
//!
//! * [`AdvisoryOrchestrator`] — structured request, conditional image
//!   request, one plain-text fallback.
//! * [`Advisory`] — the combined result.
//! * [`AdvisoryError`] — validation vs. terminal upstream failure.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{Advisory, AdvisoryError, AdvisoryOrchestrator, ADVISORY_FAILED_MESSAGE};
