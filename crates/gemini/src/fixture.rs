use std::path::{Path, PathBuf};

use async_trait::async_trait;
use engine::{ExtractionError, ExtractionRequest, Receipt, ReceiptExtractor};

use crate::prompt::build_prompt;

pub const DEFAULT_FIXTURE: &str = "parseReceipt-ikea-single-category.json";

/// Offline extractor answering every request with a JSON fixture from disk.
///
/// It honours the same contract as [`GeminiClient`]: the fixture goes through
/// the same parser and category check as a live response.
///
/// [`GeminiClient`]: crate::GeminiClient
#[derive(Clone, Debug)]
pub struct FixtureExtractor {
    path: PathBuf,
}

impl FixtureExtractor {
    pub fn new(dir: impl AsRef<Path>, fixture: Option<&str>) -> Self {
        Self {
            path: dir.as_ref().join(fixture.unwrap_or(DEFAULT_FIXTURE)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReceiptExtractor for FixtureExtractor {
    fn prompt(&self, known_payees: Option<&[String]>) -> String {
        build_prompt(known_payees)
    }

    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Receipt, ExtractionError> {
        request.validate()?;
        tracing::debug!(mock_path = %self.path.display(), "using mock ai response");

        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            tracing::error!("failed to load mock ai file: {err}");
            ExtractionError::Io(err)
        })?;
        Receipt::from_json(&raw, request.allowed_categories)
    }
}
