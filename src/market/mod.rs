//! Mandi (regional market) commodity prices for a location.

pub mod orchestrator;
pub mod price;
pub mod prompt;

pub use orchestrator::{MarketError, MarketOrchestrator, MARKET_EMPTY_MESSAGE, MARKET_FAILED_MESSAGE};
pub use price::{format_rupees, group_indian, MarketPrice};
