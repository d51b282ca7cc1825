//! Contract of the structured-extraction backend.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{ExtractionError, Receipt};

/// Everything an extractor needs for one receipt.
#[derive(Clone, Copy, Debug)]
pub struct ExtractionRequest<'a> {
    pub image: &'a [u8],
    pub mime_type: &'a str,
    /// Closed list of category labels the receipt may use.
    pub allowed_categories: &'a [String],
    /// Advisory list of merchants already known to the budget.
    pub known_payees: Option<&'a [String]>,
    /// Anchor used to complete partial dates printed on the slip.
    pub today: NaiveDate,
}

impl ExtractionRequest<'_> {
    /// Rejects requests that can't produce a meaningful receipt.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.image.is_empty() {
            return Err(ExtractionError::InvalidInput("image is empty".to_string()));
        }
        if self.allowed_categories.is_empty() {
            return Err(ExtractionError::InvalidInput(
                "no allowed categories".to_string(),
            ));
        }
        Ok(())
    }
}

/// Turns a receipt image into a [`Receipt`].
///
/// Implementations either return a receipt whose categories all belong to
/// `allowed_categories`, or an error. Never a partial receipt.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    /// Prompt text sent along with the image.
    fn prompt(&self, known_payees: Option<&[String]>) -> String;

    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Receipt, ExtractionError>;
}
