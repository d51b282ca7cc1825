//! Receipt pipeline.
//!
//! Runs the five stages of a receipt import in order:
//!
//! 1. upload received (`upload-start`)
//! 2. categories and payees loaded (`categories-loaded`)
//! 3. extraction (`request-gemini`)
//! 4. transaction creation (`request-ynab`)
//! 5. archival, when an archive is configured (`upload-file`)
//!
//! Each stage runs at most once and only after the previous one succeeded.
//! Nothing is retried and nothing is rolled back: a failed archival leaves
//! the recorded transaction in place.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    ArchiveService, BudgetGateway, ExtractionRequest, NewTransaction, ProgressEvent,
    ProgressSink, Receipt, ReceiptError, ReceiptExtractor, ReceiptFile, StorageInfo,
};

type Clock = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Result of a standalone archival.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    pub storage_info: StorageInfo,
}

pub struct ReceiptPipeline {
    budget: Arc<dyn BudgetGateway>,
    extractor: Arc<dyn ReceiptExtractor>,
    archive: Option<Arc<dyn ArchiveService>>,
    include_payees: bool,
    clock: Clock,
}

impl ReceiptPipeline {
    /// Return a builder for `ReceiptPipeline`. Help to build the struct.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Where archived receipts land, or `configured: false`.
    pub fn storage_info(&self) -> StorageInfo {
        self.archive
            .as_ref()
            .map_or_else(StorageInfo::not_configured, |archive| archive.storage_info())
    }

    /// Extracts, imports and archives one receipt.
    ///
    /// `account` identifies the budget account the transaction is recorded
    /// in. Progress is reported to `progress`, which is awaited before each
    /// stage continues.
    pub async fn process(
        &self,
        account: &str,
        file: &ReceiptFile,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Receipt, ReceiptError> {
        let span = tracing::info_span!("receipt", id = %Uuid::new_v4());
        self.run(account, file, progress).instrument(span).await
    }

    async fn run(
        &self,
        account: &str,
        file: &ReceiptFile,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Receipt, ReceiptError> {
        tracing::debug!(
            account,
            file_type = %file.mime_type,
            file_size = file.len(),
            "processing receipt"
        );

        notify(progress, ProgressEvent::UploadStart).await;

        let categories = self.budget.get_all_categories().await.map_err(|err| {
            tracing::error!("failed to load the budget categories: {err}");
            ReceiptError::ContextUnavailable(err)
        })?;
        notify(progress, ProgressEvent::CategoriesLoaded(categories.clone())).await;

        let payees = if self.include_payees {
            let payees = self.budget.get_all_payees().await.map_err(|err| {
                tracing::error!("failed to load the budget payees: {err}");
                ReceiptError::ContextUnavailable(err)
            })?;
            Some(payees)
        } else {
            None
        };
        tracing::debug!(?categories, ?payees, "budget context loaded");

        let prompt = self.extractor.prompt(payees.as_deref());
        notify(progress, ProgressEvent::RequestGemini(prompt)).await;
        let request = ExtractionRequest {
            image: &file.bytes,
            mime_type: &file.mime_type,
            allowed_categories: &categories,
            known_payees: payees.as_deref(),
            today: (self.clock)(),
        };
        let receipt = self.extractor.extract(request).await.map_err(|err| {
            tracing::error!("failed to parse the receipt: {err}");
            ReceiptError::Parse(err)
        })?;
        tracing::info!("receipt parsed successfully");

        notify(progress, ProgressEvent::RequestYnab).await;
        let transaction = NewTransaction::from_receipt(account, &receipt);
        let transaction_id = self
            .budget
            .create_transaction(&transaction)
            .await
            .map_err(|err| {
                tracing::error!("failed to import the receipt into the budget: {err}");
                ReceiptError::Import(err)
            })?;
        tracing::info!(%transaction_id, "receipt imported into the budget");

        if let Some(archive) = &self.archive {
            notify(progress, ProgressEvent::UploadFile).await;
            archive
                .upload_file(&receipt.merchant, receipt.transaction_date, file)
                .await
                .map_err(|err| {
                    tracing::error!("failed to upload the receipt: {err}");
                    ReceiptError::Upload(err)
                })?;
            tracing::info!("receipt uploaded to storage");
        }

        tracing::debug!(?receipt, "receipt processed");
        Ok(receipt)
    }

    /// Archives a file outside of the import flow.
    ///
    /// A missing archive is not an error here: the outcome simply reports
    /// `configured: false`.
    pub async fn archive_standalone(
        &self,
        merchant: &str,
        date: NaiveDate,
        file: &ReceiptFile,
    ) -> Result<UploadOutcome, ReceiptError> {
        tracing::debug!(
            merchant,
            %date,
            file_type = %file.mime_type,
            file_size = file.len(),
            "standalone upload"
        );

        let Some(archive) = &self.archive else {
            tracing::warn!("no storage service configured, skipping upload");
            return Ok(UploadOutcome {
                success: true,
                storage_info: StorageInfo::not_configured(),
            });
        };

        archive
            .upload_file(merchant, date, file)
            .await
            .map_err(|err| {
                tracing::error!("failed to upload the receipt: {err}");
                ReceiptError::Upload(err)
            })?;
        tracing::debug!("standalone upload completed");

        Ok(UploadOutcome {
            success: true,
            storage_info: archive.storage_info(),
        })
    }
}

async fn notify(progress: Option<&dyn ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = progress {
        sink.emit(event).await;
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    budget: Option<Arc<dyn BudgetGateway>>,
    extractor: Option<Arc<dyn ReceiptExtractor>>,
    archive: Option<Arc<dyn ArchiveService>>,
    include_payees: bool,
    clock: Option<Clock>,
}

impl PipelineBuilder {
    pub fn budget(mut self, budget: Arc<dyn BudgetGateway>) -> PipelineBuilder {
        self.budget = Some(budget);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ReceiptExtractor>) -> PipelineBuilder {
        self.extractor = Some(extractor);
        self
    }

    /// Archive used after a successful import. Leave unset to skip archival.
    pub fn archive(mut self, archive: Option<Arc<dyn ArchiveService>>) -> PipelineBuilder {
        self.archive = archive;
        self
    }

    /// Send the known payees to the extractor.
    pub fn include_payees(mut self, include: bool) -> PipelineBuilder {
        self.include_payees = include;
        self
    }

    /// Override the date used to complete partial receipt dates.
    pub fn clock(mut self, clock: fn() -> NaiveDate) -> PipelineBuilder {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<ReceiptPipeline, String> {
        tracing::info!("Initializing receipt pipeline...");
        Ok(ReceiptPipeline {
            budget: self.budget.ok_or("missing budget gateway")?,
            extractor: self.extractor.ok_or("missing receipt extractor")?,
            archive: self.archive,
            include_payees: self.include_payees,
            clock: self.clock.unwrap_or(local_today),
        })
    }
}
