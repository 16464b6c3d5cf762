//! Instruction and schema for photographic soil assessment.

use serde_json::{json, Value};

/// Text part sent next to the captured image.
pub fn analysis_instruction(language: &str) -> String {
    format!(
        "You are an expert soil scientist. Analyze the soil shown in this photograph taken by a farmer \
in the field. Estimate its properties from colour, structure, moisture and visible organic matter. \
Respond with a JSON object with these string properties, all written in {language}:
- \"soilType\": the most likely soil type (e.g., alluvial, black cotton, red laterite).
- \"texture\": the apparent texture (e.g., sandy loam, clayey).
- \"potentialPH\": the likely pH range and whether it is acidic, neutral or alkaline.
- \"nutrientStatus\": a short assessment of likely nutrient levels and organic matter.
- \"recommendations\": practical improvement steps, one per line, each line starting with \"- \".
Remind the farmer in the recommendations that a laboratory soil test confirms these estimates."
    )
}

/// `{soilType, texture, potentialPH, nutrientStatus, recommendations}`, all required strings.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "soilType": { "type": "STRING" },
            "texture": { "type": "STRING" },
            "potentialPH": { "type": "STRING" },
            "nutrientStatus": { "type": "STRING" },
            "recommendations": { "type": "STRING" },
        },
        "required": ["soilType", "texture", "potentialPH", "nutrientStatus", "recommendations"],
    })
}
