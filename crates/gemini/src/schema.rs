//! Structured output configuration.
//!
//! The category enumeration is the only thing keeping the model inside the
//! budget's category list, so it is rebuilt for every request.

use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: &'static str,
    pub response_schema: Value,
}

impl GenerationConfig {
    pub fn for_categories(categories: &[String]) -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 16384,
            response_mime_type: "application/json",
            response_schema: response_schema(categories),
        }
    }
}

/// Receipt schema with `category` restricted to `categories`.
pub fn response_schema(categories: &[String]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "merchant": { "type": "STRING" },
            "transactionDate": { "type": "STRING" },
            "memo": { "type": "STRING" },
            "totalTaxes": { "type": "NUMBER" },
            "totalAmount": { "type": "NUMBER" },
            "lineItems": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "productName": { "type": "STRING" },
                        "quantity": { "type": "NUMBER" },
                        "lineItemTotalAmount": { "type": "NUMBER" },
                        "category": { "type": "STRING", "enum": categories },
                    },
                    "required": ["productName", "category", "lineItemTotalAmount"],
                },
            },
            "category": { "type": "STRING", "enum": categories },
        },
        "required": ["merchant", "totalAmount", "transactionDate", "category", "memo"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_enumerated_twice() {
        let categories = vec!["Groceries".to_string(), "Dining".to_string()];
        let schema = response_schema(&categories);

        assert_eq!(
            schema["properties"]["category"]["enum"],
            json!(["Groceries", "Dining"])
        );
        assert_eq!(
            schema["properties"]["lineItems"]["items"]["properties"]["category"]["enum"],
            json!(["Groceries", "Dining"])
        );
    }

    #[test]
    fn required_fields() {
        let schema = response_schema(&["Dining".to_string()]);
        assert_eq!(
            schema["required"],
            json!(["merchant", "totalAmount", "transactionDate", "category", "memo"])
        );
    }

    #[test]
    fn config_serializes_camel_case() {
        let config = GenerationConfig::for_categories(&["Dining".to_string()]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 16384);
        assert_eq!(json["responseMimeType"], "application/json");
        assert_eq!(json["topP"], 0.95);
    }
}
