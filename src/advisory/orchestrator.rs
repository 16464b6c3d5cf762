//! Advisory orchestrator — structured advice + optional image, with a single
//! plain-text fallback.
//!
//! # Flow
//!
//! ```text
//! get_advisory(query, language)
//!   ├─ structured attempt ─────────────────────────────┐
//!   │    generateContent (JSON schema)                 │ any error
//!   │    parse {advice, imagePrompt}                   │ (transport, parse,
//!   │    imagePrompt non-empty → predict (1 image)     │  empty, image)
//!   │      no image returned → image: None             │
//!   │    └─▶ Ok(Advisory { text, image })              │
//!   └─ fallback attempt (exactly once) ◀───────────────┘
//!        generateContent (plain Markdown, same language)
//!        ├─ Ok  → Advisory { text, image: None }
//!        └─ Err → AdvisoryError::Upstream
//! ```

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::advisory::prompt;
use crate::config::GenAiConfig;
use crate::genai::{ContentRequest, EncodedImage, GenAiError, GenerativeClient, ImageRequest};

/// Message shown to the user when both attempts fail.
pub const ADVISORY_FAILED_MESSAGE: &str =
    "Failed to get advisory. The AI expert might be busy. Please try again later.";

// ---------------------------------------------------------------------------
// Advisory
// ---------------------------------------------------------------------------

/// A farming recommendation plus an optional illustrative image.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    /// Markdown advice in the requested language. Never empty.
    pub text: String,
    /// Generated illustration, absent when the model had no relevant visual
    /// or the fallback path produced the text.
    pub image: Option<EncodedImage>,
}

impl Advisory {
    /// The image as a displayable `data:` URL.
    pub fn image_url(&self) -> Option<String> {
        self.image.as_ref().map(EncodedImage::to_data_url)
    }
}

// ---------------------------------------------------------------------------
// AdvisoryError
// ---------------------------------------------------------------------------

/// Errors surfaced by [`AdvisoryOrchestrator::get_advisory`].
#[derive(Debug, Error, PartialEq)]
pub enum AdvisoryError {
    /// The query was empty; no request was made.
    #[error("Please enter a question.")]
    Validation,

    /// Both the structured and the fallback attempt failed.
    #[error("advisory failed: {detail}")]
    Upstream { detail: String },
}

impl AdvisoryError {
    /// Summarised text for the UI.
    pub fn user_message(&self) -> String {
        match self {
            AdvisoryError::Validation => self.to_string(),
            AdvisoryError::Upstream { .. } => ADVISORY_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Why a single attempt failed. Internal; collapsed into `AdvisoryError`.
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Api(#[from] GenAiError),

    #[error("malformed structured advice: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model returned empty advice")]
    EmptyAdvice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredAdvice {
    advice: String,
    image_prompt: String,
}

// ---------------------------------------------------------------------------
// AdvisoryOrchestrator
// ---------------------------------------------------------------------------

/// Sequences the advisory requests against a [`GenerativeClient`].
pub struct AdvisoryOrchestrator {
    client: Arc<dyn GenerativeClient>,
    text_model: String,
    image_model: String,
    aspect_ratio: String,
}

impl AdvisoryOrchestrator {
    pub fn new(client: Arc<dyn GenerativeClient>, config: &GenAiConfig) -> Self {
        Self {
            client,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            aspect_ratio: config.image_aspect_ratio.clone(),
        }
    }

    /// Answer `query` in `language` (a display name such as `"English (US)"`).
    ///
    /// The structured attempt and its image step fail as one unit; on any
    /// failure the plain-text fallback runs exactly once.
    pub async fn get_advisory(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Advisory, AdvisoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdvisoryError::Validation);
        }

        match self.structured_attempt(query, language).await {
            Ok(advisory) => Ok(advisory),
            Err(e) => {
                log::warn!("advisory: structured attempt failed ({e}); trying plain-text fallback");
                self.fallback_attempt(query, language).await.map_err(|fe| {
                    log::error!("advisory: fallback failed: {fe}");
                    AdvisoryError::Upstream {
                        detail: fe.to_string(),
                    }
                })
            }
        }
    }

    async fn structured_attempt(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Advisory, AttemptError> {
        let request = ContentRequest::new(&self.text_model)
            .text(query)
            .system_instruction(prompt::structured_instruction(language))
            .response_schema(prompt::response_schema());

        let raw = self.client.generate_content(&request).await?;
        let parsed: StructuredAdvice = serde_json::from_str(raw.trim())?;

        let text = parsed.advice.trim().to_string();
        if text.is_empty() {
            return Err(AttemptError::EmptyAdvice);
        }

        let image_prompt = parsed.image_prompt.trim();
        let image = if image_prompt.is_empty() {
            log::debug!("advisory: no image prompt, skipping image generation");
            None
        } else {
            let request = ImageRequest::new(&self.image_model, image_prompt)
                .aspect_ratio(&self.aspect_ratio);
            match self.client.generate_image(&request).await {
                Ok(image) => Some(image),
                // Imagen answers 200 without predictions when every sample
                // was filtered; the advice stands without a picture.
                Err(GenAiError::EmptyResponse) => {
                    log::warn!("advisory: image model returned no image, keeping advice");
                    None
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(Advisory { text, image })
    }

    async fn fallback_attempt(&self, query: &str, language: &str) -> Result<Advisory, AttemptError> {
        let request = ContentRequest::new(&self.text_model)
            .text(query)
            .system_instruction(prompt::fallback_instruction(language));

        let text = self.client.generate_content(&request).await?.trim().to_string();
        if text.is_empty() {
            return Err(AttemptError::EmptyAdvice);
        }
        Ok(Advisory { text, image: None })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::ScriptedClient;

    const TOMATO_QUERY: &str = "What are the best practices for organic tomato pest control?";

    fn orchestrator(client: Arc<ScriptedClient>) -> AdvisoryOrchestrator {
        AdvisoryOrchestrator::new(client, &GenAiConfig::default())
    }

    fn structured(advice: &str, image_prompt: &str) -> Result<String, GenAiError> {
        Ok(serde_json::json!({ "advice": advice, "imagePrompt": image_prompt }).to_string())
    }

    fn jpeg() -> EncodedImage {
        EncodedImage::from_bytes("image/jpeg", &[0xFF, 0xD8, 0xFF, 0xD9])
    }

    #[tokio::test]
    async fn structured_success_with_image() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(structured(
                    "## Neem oil\nSpray every 7 days.",
                    "A photorealistic tomato plant with aphids",
                ))
                .with_image(Ok(jpeg())),
        );
        let orc = orchestrator(Arc::clone(&client));

        let advisory = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap();
        assert!(advisory.text.contains("Neem oil"));
        assert_eq!(advisory.image, Some(jpeg()));
        assert!(advisory
            .image_url()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));

        assert_eq!(client.content_call_count(), 1);
        let image_calls = client.image_calls.lock().unwrap();
        assert_eq!(image_calls.len(), 1);
        assert_eq!(image_calls[0].prompt, "A photorealistic tomato plant with aphids");
        assert_eq!(image_calls[0].aspect_ratio, "16:9");
    }

    #[tokio::test]
    async fn structured_request_carries_schema_and_language() {
        let client = Arc::new(ScriptedClient::new().with_content(structured("advice", "")));
        let orc = orchestrator(Arc::clone(&client));

        orc.get_advisory("  irrigation?  ", "हिन्दी (भारत)").await.unwrap();

        let calls = client.content_calls.lock().unwrap();
        assert!(calls[0].expects_json());
        assert!(calls[0]
            .system_instruction
            .as_deref()
            .unwrap()
            .contains("हिन्दी (भारत)"));
        assert_eq!(calls[0].parts, vec![crate::genai::Part::Text("irrigation?".into())]);
    }

    #[tokio::test]
    async fn empty_image_prompt_skips_image_step() {
        let client = Arc::new(ScriptedClient::new().with_content(structured("Rotate crops.", "   ")));
        let orc = orchestrator(Arc::clone(&client));

        let advisory = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap();
        assert_eq!(advisory.text, "Rotate crops.");
        assert!(advisory.image.is_none());
        assert!(advisory.image_url().is_none());
        assert_eq!(client.image_call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_json_falls_back_once() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(Ok("not json at all".into()))
                .with_content(Ok("Use yellow sticky traps.".into())),
        );
        let orc = orchestrator(Arc::clone(&client));

        let advisory = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap();
        assert_eq!(advisory.text, "Use yellow sticky traps.");
        assert!(advisory.image.is_none());

        let calls = client.content_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].expects_json());
        assert!(calls[1]
            .system_instruction
            .as_deref()
            .unwrap()
            .contains("written in English (US)"));
    }

    #[tokio::test]
    async fn image_failure_discards_structured_text_and_falls_back() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(structured("Structured advice", "a leaf"))
                .with_image(Err(GenAiError::Api {
                    status: 400,
                    message: "prompt blocked".into(),
                }))
                .with_content(Ok("Fallback advice".into())),
        );
        let orc = orchestrator(Arc::clone(&client));

        let advisory = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap();
        assert_eq!(advisory.text, "Fallback advice");
        assert!(advisory.image.is_none());
        assert_eq!(client.content_call_count(), 2);
        assert_eq!(client.image_call_count(), 1);
    }

    #[tokio::test]
    async fn filtered_image_keeps_structured_advice() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(structured("Use neem oil.", "a tomato leaf"))
                .with_image(Err(GenAiError::EmptyResponse)),
        );
        let orc = orchestrator(Arc::clone(&client));

        let advisory = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap();
        assert_eq!(
            advisory,
            Advisory {
                text: "Use neem oil.".into(),
                image: None,
            }
        );
        assert_eq!(client.content_call_count(), 1);
        assert_eq!(client.image_call_count(), 1);
    }

    #[tokio::test]
    async fn empty_structured_advice_falls_back() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(structured("  ", "a field"))
                .with_content(Ok("Plain advice".into())),
        );
        let orc = orchestrator(Arc::clone(&client));

        let advisory = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap();
        assert_eq!(advisory.text, "Plain advice");
        assert_eq!(client.image_call_count(), 0);
    }

    #[tokio::test]
    async fn both_attempts_failing_is_terminal_after_exactly_two_calls() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(Err(GenAiError::Timeout))
                .with_content(Err(GenAiError::Request("connection refused".into())))
                .with_content(Ok("never used".into())),
        );
        let orc = orchestrator(Arc::clone(&client));

        let err = orc.get_advisory(TOMATO_QUERY, "English (US)").await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Upstream { .. }));
        assert_eq!(err.user_message(), ADVISORY_FAILED_MESSAGE);
        assert_eq!(client.content_call_count(), 2);
    }

    #[tokio::test]
    async fn empty_fallback_text_is_terminal() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_content(Err(GenAiError::EmptyResponse))
                .with_content(Ok("   ".into())),
        );
        let orc = orchestrator(client);

        assert!(matches!(
            orc.get_advisory(TOMATO_QUERY, "English (US)").await,
            Err(AdvisoryError::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn blank_query_is_rejected_without_calls() {
        let client = Arc::new(ScriptedClient::new());
        let orc = orchestrator(Arc::clone(&client));

        let err = orc.get_advisory(" \n ", "English (US)").await.unwrap_err();
        assert_eq!(err, AdvisoryError::Validation);
        assert_eq!(err.user_message(), "Please enter a question.");
        assert_eq!(client.content_call_count(), 0);
    }
}
