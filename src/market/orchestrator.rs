use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::config::GenAiConfig;
use crate::genai::{ContentRequest, GenerativeClient};
use crate::market::price::{MarketPrice, RawPrice};
use crate::market::prompt;

/// Message shown when the lookup fails.
pub const MARKET_FAILED_MESSAGE: &str = "Failed to fetch market prices. The AI expert might be busy or the location may not be found. Please try again.";

/// Message shown for a successful lookup with no rows.
pub const MARKET_EMPTY_MESSAGE: &str =
    "No market data found for this location. Please try a larger nearby city or region.";

/// Errors surfaced by [`MarketOrchestrator::get_market_prices`].
#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    #[error("Please enter a location.")]
    Validation,

    #[error("market lookup failed: {detail}")]
    Upstream { detail: String },
}

impl MarketError {
    pub fn user_message(&self) -> String {
        match self {
            MarketError::Validation => self.to_string(),
            MarketError::Upstream { .. } => MARKET_FAILED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceEnvelope {
    #[serde(default)]
    prices: Option<Vec<RawPrice>>,
}

/// One structured request per lookup; no fallback.
pub struct MarketOrchestrator {
    client: Arc<dyn GenerativeClient>,
    text_model: String,
}

impl MarketOrchestrator {
    pub fn new(client: Arc<dyn GenerativeClient>, config: &GenAiConfig) -> Self {
        Self {
            client,
            text_model: config.text_model.clone(),
        }
    }

    /// Prices near `location`, in the order the model listed them.
    ///
    /// An absent `prices` key yields an empty list. Rows that fail
    /// validation are dropped individually.
    pub async fn get_market_prices(&self, location: &str) -> Result<Vec<MarketPrice>, MarketError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(MarketError::Validation);
        }

        let request = ContentRequest::new(&self.text_model)
            .text(prompt::user_prompt(location))
            .system_instruction(prompt::system_instruction(location))
            .response_schema(prompt::response_schema());

        let raw = self.client.generate_content(&request).await.map_err(|e| {
            log::error!("market: request for {location:?} failed: {e}");
            MarketError::Upstream {
                detail: e.to_string(),
            }
        })?;

        let envelope: PriceEnvelope = serde_json::from_str(raw.trim()).map_err(|e| {
            log::error!("market: malformed response: {e}");
            MarketError::Upstream {
                detail: format!("malformed price data: {e}"),
            }
        })?;

        let rows = envelope.prices.unwrap_or_default();
        let total = rows.len();
        let prices: Vec<MarketPrice> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| match row.validate() {
                Ok(p) => Some(p),
                Err(reason) => {
                    log::warn!("market: dropping row {i}: {reason:?}");
                    None
                }
            })
            .collect();

        log::info!("market: {} of {total} rows for {location:?}", prices.len());
        Ok(prices)
    }
}
