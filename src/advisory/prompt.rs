//! System instructions and response schema for farming advice.
//!
//! Two instructions exist: the structured one asks for a JSON object with the
//! advice and an English image prompt; the fallback one asks for plain
//! Markdown only and is used when the structured path fails.

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Persona shared by both instructions.
const ADVISOR_PERSONA: &str = "\
You are Kisan Mitra, an expert agricultural advisor AI. Your purpose is to provide farmers \
with clear, concise, and actionable advice based on their queries. Address the user directly \
and respectfully. Structure your answers with headings, bullet points, or numbered lists for \
maximum readability. If a query is about a specific crop, pest, or disease, provide scientific \
names where appropriate but explain them in simple terms. Always prioritize safe, sustainable, \
and economically viable farming practices.";

/// Instruction for the structured (JSON) advisory request.
pub fn structured_instruction(language: &str) -> String {
    format!(
        "{ADVISOR_PERSONA}
Your final output must be a JSON object. The JSON object must have two properties:
1. \"advice\": (string) Your full advisory response, formatted in Markdown, in the {language} language.
2. \"imagePrompt\": (string) A concise, descriptive English prompt for an image generation model \
to create a photorealistic image relevant to the advice. For example, if the advice is about \
Colorado potato beetle, the prompt could be \"A photorealistic close-up of a Colorado potato \
beetle on a green potato leaf\". If no specific visual is relevant, return an empty string."
    )
}

/// Instruction for the plain-text fallback request.
pub fn fallback_instruction(language: &str) -> String {
    format!(
        "{ADVISOR_PERSONA} Your response must be in well-formatted Markdown and written in {language}."
    )
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// `{advice: string, imagePrompt: string}`, both required.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "advice": { "type": "STRING" },
            "imagePrompt": { "type": "STRING" },
        },
        "required": ["advice", "imagePrompt"],
    })
}
