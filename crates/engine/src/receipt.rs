//! Receipt primitives.
//!
//! A `Receipt` is what the extraction backend understood from a photographed
//! slip. It is built once per pipeline run and never mutated afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ExtractionError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_name: String,
    pub category: String,
    pub line_item_total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub merchant: String,
    /// Serialized as `YYYY-MM-DD`.
    pub transaction_date: NaiveDate,
    pub memo: String,
    pub category: String,
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_taxes: Option<f64>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Receipt {
    /// Parses the JSON emitted by an extraction backend and checks it against
    /// the categories that were allowed for the request.
    ///
    /// Anything that does not fit the receipt schema is rejected as a whole;
    /// there is no partial receipt.
    pub fn from_json(raw: &str, allowed_categories: &[String]) -> Result<Self, ExtractionError> {
        if raw.trim().is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }
        let receipt: Receipt = serde_json::from_str(raw)?;
        receipt.validate(allowed_categories)?;
        Ok(receipt)
    }

    /// Checks the shape constraints the output schema promises.
    pub fn validate(&self, allowed_categories: &[String]) -> Result<(), ExtractionError> {
        if self.merchant.trim().is_empty() {
            return Err(ExtractionError::Schema("merchant is empty".to_string()));
        }

        let allowed = |category: &str| allowed_categories.iter().any(|c| c == category);
        if !allowed(&self.category) {
            return Err(ExtractionError::CategoryNotAllowed(self.category.clone()));
        }
        if let Some(item) = self.line_items.iter().find(|item| !allowed(&item.category)) {
            return Err(ExtractionError::CategoryNotAllowed(item.category.clone()));
        }

        Ok(())
    }
}

/// The original uploaded file, kept around so it can be archived after the
/// transaction has been recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        vec!["Groceries".to_string(), "Dining".to_string()]
    }

    #[test]
    fn parses_minimal_receipt() {
        let raw = r#"{
            "merchant": "Ikea",
            "totalAmount": 42.50,
            "transactionDate": "2024-03-01",
            "category": "Groceries",
            "memo": "home goods"
        }"#;

        let receipt = Receipt::from_json(raw, &categories()).unwrap();
        assert_eq!(receipt.merchant, "Ikea");
        assert_eq!(
            receipt.transaction_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(receipt.total_amount, 42.50);
        assert_eq!(receipt.total_taxes, None);
        assert!(receipt.line_items.is_empty());
    }

    #[test]
    fn parses_line_items_and_taxes() {
        let raw = r#"{
            "merchant": "Spar",
            "totalAmount": 20.0,
            "totalTaxes": 2.6,
            "transactionDate": "2024-01-31",
            "category": "Groceries",
            "memo": "bread, wine",
            "lineItems": [
                {"productName": "Bread", "category": "Groceries", "lineItemTotalAmount": 5.0},
                {"productName": "Wine", "category": "Dining", "lineItemTotalAmount": 15.0, "quantity": 1}
            ]
        }"#;

        let receipt = Receipt::from_json(raw, &categories()).unwrap();
        assert_eq!(receipt.total_taxes, Some(2.6));
        assert_eq!(receipt.line_items.len(), 2);
        assert_eq!(receipt.line_items[1].quantity, Some(1.0));
    }

    #[test]
    fn rejects_category_outside_allowed_list() {
        let raw = r#"{
            "merchant": "Ikea",
            "totalAmount": 10,
            "transactionDate": "2024-03-01",
            "category": "Furniture",
            "memo": "chair"
        }"#;

        let err = Receipt::from_json(raw, &categories()).unwrap_err();
        assert!(matches!(err, ExtractionError::CategoryNotAllowed(c) if c == "Furniture"));
    }

    #[test]
    fn rejects_line_item_category_outside_allowed_list() {
        let raw = r#"{
            "merchant": "Ikea",
            "totalAmount": 10,
            "transactionDate": "2024-03-01",
            "category": "Groceries",
            "memo": "chair",
            "lineItems": [{"productName": "Chair", "category": "Furniture", "lineItemTotalAmount": 10}]
        }"#;

        assert!(matches!(
            Receipt::from_json(raw, &categories()),
            Err(ExtractionError::CategoryNotAllowed(_))
        ));
    }

    #[test]
    fn rejects_missing_required_fields_and_bad_dates() {
        let missing_memo = r#"{"merchant": "Ikea", "totalAmount": 1, "transactionDate": "2024-03-01", "category": "Groceries"}"#;
        assert!(matches!(
            Receipt::from_json(missing_memo, &categories()),
            Err(ExtractionError::Json(_))
        ));

        let bad_date = r#"{"merchant": "Ikea", "totalAmount": 1, "transactionDate": "01/03/2024", "category": "Groceries", "memo": "x"}"#;
        assert!(matches!(
            Receipt::from_json(bad_date, &categories()),
            Err(ExtractionError::Json(_))
        ));
    }

    #[test]
    fn rejects_empty_merchant_and_empty_body() {
        let raw = r#"{"merchant": "  ", "totalAmount": 1, "transactionDate": "2024-03-01", "category": "Groceries", "memo": "x"}"#;
        assert!(matches!(
            Receipt::from_json(raw, &categories()),
            Err(ExtractionError::Schema(_))
        ));
        assert!(matches!(
            Receipt::from_json("   ", &categories()),
            Err(ExtractionError::EmptyResponse)
        ));
    }

    #[test]
    fn serializes_camel_case_date() {
        let receipt = Receipt {
            merchant: "Ikea".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            memo: "home goods".to_string(),
            category: "Groceries".to_string(),
            total_amount: 42.5,
            total_taxes: None,
            line_items: vec![],
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["transactionDate"], "2024-03-01");
        assert_eq!(json["totalAmount"], 42.5);
        assert!(json.get("totalTaxes").is_none());
    }
}
