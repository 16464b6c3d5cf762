//! System instruction and response schema for mandi price lookups.

use serde_json::{json, Value};

/// User turn sent alongside the instruction.
pub fn user_prompt(location: &str) -> String {
    format!("Get market prices for {location}")
}

/// Instruction asking for 5–10 commodities priced per quintal near `location`.
pub fn system_instruction(location: &str) -> String {
    format!(
        "You are an agricultural market data analyst. Your task is to provide the latest available \
market prices for common agricultural commodities in and around the specified location: {location}.
Provide data for at least 5 to 10 common commodities found in that region. The prices should be per quintal (100 kg).
Your final output must be a JSON object containing a single key \"prices\" which is an array of objects. \
Each object in the array represents a commodity and must have the following properties:
- \"commodity\": (string) The name of the commodity (e.g., \"Wheat\", \"Tomato\").
- \"variety\": (string) The specific variety (e.g., \"Lokwan\", \"Deshi\").
- \"minPrice\": (number) The minimum price per quintal.
- \"maxPrice\": (number) The maximum price per quintal.
- \"market\": (string) The name of the market (mandi) where this price was recorded.

If you cannot find data for the specific location, try to find data for the nearest major agricultural market.
Do not include any introductory text, just the JSON object."
    )
}

/// `{prices: [{commodity, variety, minPrice, maxPrice, market}]}`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "prices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "commodity": { "type": "STRING" },
                        "variety": { "type": "STRING" },
                        "minPrice": { "type": "NUMBER" },
                        "maxPrice": { "type": "NUMBER" },
                        "market": { "type": "STRING" },
                    },
                    "required": ["commodity", "variety", "minPrice", "maxPrice", "market"],
                },
            },
        },
        "required": ["prices"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_mentions_location_and_unit() {
        let s = system_instruction("Nashik, Maharashtra");
        assert!(s.contains("specified location: Nashik, Maharashtra."));
        assert!(s.contains("per quintal (100 kg)"));
    }

    #[test]
    fn user_prompt_format() {
        assert_eq!(user_prompt("Pune"), "Get market prices for Pune");
    }

    #[test]
    fn schema_item_fields_all_required() {
        let schema = response_schema();
        let required = schema["properties"]["prices"]["items"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 5);
        assert_eq!(schema["properties"]["prices"]["items"]["properties"]["minPrice"]["type"], "NUMBER");
    }
}
