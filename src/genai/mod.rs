//! Generative AI client module.
//!
//! This module provides:
//! * [`GenerativeClient`] — async trait implemented by every backend.
//! * [`GeminiClient`] — Gemini `generateContent` + Imagen `predict` over REST.
//! * [`ContentRequest`] / [`ImageRequest`] — provider-neutral requests.
//! * [`EncodedImage`] — base64 image payloads and data-URL conversion.
//! * [`GenAiError`] — error variants for API calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use kisan_mitra::config::GenAiConfig;
//! use kisan_mitra::genai::{ContentRequest, GeminiClient, GenerativeClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = GenAiConfig::default();
//!     config.resolve_api_key(|name| std::env::var(name).ok());
//!
//!     let client = GeminiClient::from_config(&config);
//!     let request = ContentRequest::new(&config.text_model)
//!         .text("When should I sow kharif maize?");
//!     let answer = client.generate_content(&request).await.unwrap();
//!     println!("{answer}");
//! }
//! ```

pub mod client;
pub mod image;
pub mod request;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{GeminiClient, GenAiError, GenerativeClient};
pub use image::{EncodedImage, ImageDataError};
pub use request::{ContentRequest, ImageRequest, Part};

#[cfg(test)]
pub use client::ScriptedClient;
