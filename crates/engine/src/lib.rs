//! Receipt import engine.
//!
//! The engine owns the receipt data model, the contracts of the external
//! collaborators (extraction backend, budgeting service, archive storage) and
//! the [`ReceiptPipeline`] that runs them in order.

pub use archive::{ArchiveService, StorageInfo, StorageKind};
pub use budget::{BudgetGateway, NewTransaction, SplitLine};
pub use error::{
    ArchiveError, BoxError, BudgetError, ExtractionError, ReceiptError, ReceiptErrorKind,
};
pub use extraction::{ExtractionRequest, ReceiptExtractor};
pub use pipeline::{PipelineBuilder, ReceiptPipeline, UploadOutcome};
pub use progress::{ProgressEvent, ProgressSink};
pub use receipt::{LineItem, Receipt, ReceiptFile};

mod archive;
mod budget;
mod error;
mod extraction;
mod pipeline;
mod progress;
mod receipt;
