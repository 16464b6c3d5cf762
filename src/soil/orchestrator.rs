use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::config::GenAiConfig;
use crate::genai::{ContentRequest, EncodedImage, GenerativeClient};
use crate::soil::prompt;

/// Message shown when analysis fails.
pub const SOIL_FAILED_MESSAGE: &str =
    "Failed to analyze the soil image. Please try again with a clearer, well-lit photo.";

/// Structured assessment of a soil photograph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilAnalysisResult {
    pub soil_type: String,
    pub texture: String,
    #[serde(rename = "potentialPH")]
    pub potential_ph: String,
    pub nutrient_status: String,
    /// Newline-delimited list, see [`SoilAnalysisResult::recommendation_items`].
    pub recommendations: String,
}

impl SoilAnalysisResult {
    /// Non-blank recommendation lines without their leading bullet marker.
    pub fn recommendation_items(&self) -> Vec<String> {
        self.recommendations
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                ["- ", "* ", "• "]
                    .iter()
                    .find_map(|bullet| line.strip_prefix(bullet))
                    .unwrap_or(line)
                    .trim()
                    .to_string()
            })
            .filter(|item| !item.is_empty())
            .collect()
    }

    fn trimmed(self) -> Result<Self, &'static str> {
        let field = |value: String, name: &'static str| {
            let value = value.trim().to_string();
            if value.is_empty() {
                Err(name)
            } else {
                Ok(value)
            }
        };
        Ok(Self {
            soil_type: field(self.soil_type, "soilType")?,
            texture: field(self.texture, "texture")?,
            potential_ph: field(self.potential_ph, "potentialPH")?,
            nutrient_status: field(self.nutrient_status, "nutrientStatus")?,
            recommendations: field(self.recommendations, "recommendations")?,
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SoilError {
    /// No captured frame was supplied.
    #[error("Please capture a soil image first.")]
    Validation,

    #[error("soil analysis failed: {detail}")]
    Upstream { detail: String },
}

impl SoilError {
    pub fn user_message(&self) -> String {
        match self {
            SoilError::Validation => self.to_string(),
            SoilError::Upstream { .. } => SOIL_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Single structured request carrying the image; any failure is terminal.
pub struct SoilOrchestrator {
    client: Arc<dyn GenerativeClient>,
    text_model: String,
}

impl SoilOrchestrator {
    pub fn new(client: Arc<dyn GenerativeClient>, config: &GenAiConfig) -> Self {
        Self {
            client,
            text_model: config.text_model.clone(),
        }
    }

    pub async fn get_soil_analysis(
        &self,
        image: &EncodedImage,
        language: &str,
    ) -> Result<SoilAnalysisResult, SoilError> {
        if image.data.is_empty() {
            return Err(SoilError::Validation);
        }

        let request = ContentRequest::new(&self.text_model)
            .image(image.clone())
            .text(prompt::analysis_instruction(language))
            .response_schema(prompt::response_schema());

        let upstream = |detail: String| {
            log::error!("soil: {detail}");
            SoilError::Upstream { detail }
        };

        let raw = self
            .client
            .generate_content(&request)
            .await
            .map_err(|e| upstream(e.to_string()))?;

        let parsed: SoilAnalysisResult = serde_json::from_str(raw.trim())
            .map_err(|e| upstream(format!("malformed analysis: {e}")))?;

        parsed
            .trimmed()
            .map_err(|name| upstream(format!("empty field {name}")))
    }
}
