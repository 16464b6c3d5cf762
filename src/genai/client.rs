//! Core `GenerativeClient` trait and the Gemini / Imagen REST implementation.
//!
//! `GeminiClient` speaks the Generative Language API:
//! `models/{model}:generateContent` for text (optionally schema-constrained
//! JSON) and `models/{model}:predict` for Imagen pictures. All connection
//! details come from [`GenAiConfig`].

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::GenAiConfig;
use crate::genai::image::EncodedImage;
use crate::genai::request::{ContentRequest, ImageRequest, Part};

// ---------------------------------------------------------------------------
// GenAiError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the generative API.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// No credential was configured or found in the environment.
    #[error("no API key configured (set GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be parsed as expected JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The response held no usable text or image.
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenAiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenAiError::Timeout
        } else {
            GenAiError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// GenerativeClient trait
// ---------------------------------------------------------------------------

/// Async interface to a generative text + image service.
///
/// Implementors must be `Send + Sync` so orchestrators can share one client
/// behind an `Arc<dyn GenerativeClient>`.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Run a text request. With a response schema the returned string is the
    /// raw JSON document produced by the model.
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, GenAiError>;

    /// Generate exactly one image.
    async fn generate_image(&self, request: &ImageRequest) -> Result<EncodedImage, GenAiError>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// REST client for the Gemini / Imagen endpoints.
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Build a client from config.
    ///
    /// A timeout is only applied when `config.timeout_secs` is set.
    pub fn from_config(config: &GenAiConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        }
    }

    /// `true` when a credential is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.trim().trim_start_matches("models/");
        format!("{}/models/{}:{}", self.api_base, model, method)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, GenAiError> {
        let key = self.api_key.as_deref().ok_or(GenAiError::MissingApiKey)?;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GenAiError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| GenAiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, GenAiError> {
        let url = self.endpoint(&request.model, "generateContent");
        let body = content_body(request);
        log::debug!(
            "genai: generateContent model={} parts={} json={}",
            request.model,
            request.parts.len(),
            request.expects_json()
        );
        let json = self.post(&url, &body).await?;
        extract_text(&json)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<EncodedImage, GenAiError> {
        let url = self.endpoint(&request.model, "predict");
        let body = image_body(request);
        log::debug!("genai: predict model={}", request.model);
        let json = self.post(&url, &body).await?;
        extract_image(&json, &request.mime_type)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Build the `generateContent` request body.
pub(crate) fn content_body(request: &ContentRequest) -> Value {
    let parts: Vec<Value> = request
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::Image(image) => json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.data,
                }
            }),
        })
        .collect();

    let mut body = Map::new();
    body.insert(
        "contents".into(),
        json!([{ "role": "user", "parts": parts }]),
    );
    if let Some(instruction) = &request.system_instruction {
        body.insert(
            "systemInstruction".into(),
            json!({ "parts": [{ "text": instruction }] }),
        );
    }
    if let Some(schema) = &request.response_schema {
        body.insert(
            "generationConfig".into(),
            json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }),
        );
    }
    Value::Object(body)
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_text(response: &Value) -> Result<String, GenAiError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or(GenAiError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(GenAiError::EmptyResponse);
    }
    Ok(text)
}

/// Build the Imagen `predict` request body.
pub(crate) fn image_body(request: &ImageRequest) -> Value {
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": request.aspect_ratio,
            "outputOptions": { "mimeType": request.mime_type },
        }
    })
}

/// Take the first prediction carrying image bytes.
pub(crate) fn extract_image(response: &Value, default_mime: &str) -> Result<EncodedImage, GenAiError> {
    let predictions = response
        .get("predictions")
        .and_then(Value::as_array)
        .ok_or(GenAiError::EmptyResponse)?;

    predictions
        .iter()
        .find_map(|row| {
            let data = row.get("bytesBase64Encoded").and_then(Value::as_str)?;
            if data.is_empty() {
                return None;
            }
            let mime_type = row
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or(default_mime);
            Some(EncodedImage {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            })
        })
        .ok_or(GenAiError::EmptyResponse)
}

/// Pull `error.message` out of an API error body, falling back to the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

// ---------------------------------------------------------------------------
// ScriptedClient  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays queued responses and records every request.
///
/// When a queue runs dry the call fails with [`GenAiError::Request`].
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedClient {
    content: std::sync::Mutex<std::collections::VecDeque<Result<String, GenAiError>>>,
    images: std::sync::Mutex<std::collections::VecDeque<Result<EncodedImage, GenAiError>>>,
    pub content_calls: std::sync::Mutex<Vec<ContentRequest>>,
    pub image_calls: std::sync::Mutex<Vec<ImageRequest>>,
}

#[cfg(test)]
impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, response: Result<String, GenAiError>) -> Self {
        self.content.lock().unwrap().push_back(response);
        self
    }

    pub fn with_image(self, response: Result<EncodedImage, GenAiError>) -> Self {
        self.images.lock().unwrap().push_back(response);
        self
    }

    pub fn content_call_count(&self) -> usize {
        self.content_calls.lock().unwrap().len()
    }

    pub fn image_call_count(&self) -> usize {
        self.image_calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, GenAiError> {
        self.content_calls.lock().unwrap().push(request.clone());
        self.content
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenAiError::Request("no scripted response".into())))
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<EncodedImage, GenAiError> {
        self.image_calls.lock().unwrap().push(request.clone());
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenAiError::Request("no scripted image".into())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, key: Option<&str>) -> GenAiConfig {
        GenAiConfig {
            api_base: format!("{}/v1beta/", server.uri()),
            api_key: key.map(str::to_string),
            ..GenAiConfig::default()
        }
    }

    #[test]
    fn content_body_carries_schema_and_instruction() {
        let req = ContentRequest::new("gemini-2.5-flash")
            .text("question")
            .system_instruction("be helpful")
            .response_schema(json!({ "type": "OBJECT" }));
        let body = content_body(&req);

        assert_eq!(body["contents"][0]["parts"][0]["text"], "question");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be helpful");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn plain_body_has_no_generation_config() {
        let body = content_body(&ContentRequest::new("m").text("q"));
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn image_parts_become_inline_data() {
        let img = EncodedImage::from_bytes("image/jpeg", b"soil");
        let body = content_body(&ContentRequest::new("m").image(img.clone()).text("t"));
        let part = &body["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(part["mimeType"], "image/jpeg");
        assert_eq!(part["data"], img.data.as_str());
    }

    #[test]
    fn extract_text_joins_parts() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(extract_text(&resp).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn extract_text_without_candidates_is_empty() {
        assert!(matches!(
            extract_text(&json!({ "candidates": [] })),
            Err(GenAiError::EmptyResponse)
        ));
        let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert!(matches!(extract_text(&blank), Err(GenAiError::EmptyResponse)));
    }

    #[test]
    fn image_body_requests_one_sample() {
        let body = image_body(&ImageRequest::new("imagen", "a field"));
        assert_eq!(body["instances"][0]["prompt"], "a field");
        assert_eq!(body["parameters"]["sampleCount"], 1);
        assert_eq!(body["parameters"]["aspectRatio"], "16:9");
    }

    #[test]
    fn extract_image_skips_filtered_predictions() {
        let resp = json!({
            "predictions": [
                { "raiFilteredReason": "blocked" },
                { "bytesBase64Encoded": "QUJD", "mimeType": "image/png" }
            ]
        });
        let img = extract_image(&resp, "image/jpeg").unwrap();
        assert_eq!(img.data, "QUJD");
        assert_eq!(img.mime_type, "image/png");

        assert!(matches!(
            extract_image(&json!({ "predictions": [] }), "image/jpeg"),
            Err(GenAiError::EmptyResponse)
        ));
        assert!(matches!(
            extract_image(&json!({}), "image/jpeg"),
            Err(GenAiError::EmptyResponse)
        ));
    }

    #[test]
    fn api_error_message_prefers_error_field() {
        let body = r#"{"error":{"code":429,"message":"quota exceeded"}}"#;
        assert_eq!(api_error_message(body), "quota exceeded");
        assert_eq!(api_error_message("bad gateway"), "bad gateway");
    }

    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn GenerativeClient> =
            Box::new(GeminiClient::from_config(&GenAiConfig::default()));
        drop(client);
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let client = GeminiClient::from_config(&GenAiConfig::default());
        assert!(!client.has_api_key());
        let err = client
            .generate_content(&ContentRequest::new("m").text("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::MissingApiKey));
    }

    #[tokio::test]
    async fn generate_content_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"ok\":true}" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::from_config(&config_for(&server, Some("test-key")));
        let req = ContentRequest::new("gemini-2.5-flash")
            .text("q")
            .response_schema(json!({ "type": "OBJECT" }));
        assert_eq!(client.generate_content(&req).await.unwrap(), "{\"ok\":true}");
    }

    #[tokio::test]
    async fn generate_image_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/imagen-4.0-generate-001:predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "bytesBase64Encoded": "/9j/", "mimeType": "image/jpeg" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::from_config(&config_for(&server, Some("k")));
        let img = client
            .generate_image(&ImageRequest::new("imagen-4.0-generate-001", "a beetle"))
            .await
            .unwrap();
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "model overloaded" }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::from_config(&config_for(&server, Some("k")));
        let err = client
            .generate_content(&ContentRequest::new("m").text("q"))
            .await
            .unwrap_err();
        match err {
            GenAiError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = GeminiClient::from_config(&config_for(&server, Some("k")));
        let err = client
            .generate_content(&ContentRequest::new("m").text("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::Parse(_)));
    }
}
