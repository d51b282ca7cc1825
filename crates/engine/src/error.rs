//! The module contains the errors the engine can throw.
//!
//! Collaborators report their own failures with [`ExtractionError`],
//! [`BudgetError`] and [`ArchiveError`]. The pipeline never hands those to the
//! caller directly: every stage translates its collaborator failure into one
//! [`ReceiptError`] kind and keeps the original as `source`.
use thiserror::Error;

/// Boxed transport error coming from a concrete client (HTTP, filesystem...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of the extraction backend.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("invalid extraction input: {0}")]
    InvalidInput(String),
    #[error("extraction request failed: {0}")]
    Request(#[source] BoxError),
    #[error("extraction backend answered {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("extraction backend returned an empty response")]
    EmptyResponse,
    #[error("response is not a valid receipt: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is not a valid receipt: {0}")]
    Schema(String),
    #[error("category \"{0}\" is not one of the allowed categories")]
    CategoryNotAllowed(String),
    #[error("failed to read extraction fixture: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the budgeting service.
#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("budget request failed: {0}")]
    Request(#[source] BoxError),
    #[error("budget service answered {status}: {message}")]
    Api { status: u16, message: String },
    #[error("\"{0}\" category not found!")]
    UnknownCategory(String),
    #[error("\"{0}\" account not found!")]
    UnknownAccount(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Failures of the archive storage.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive request failed: {0}")]
    Request(#[source] BoxError),
    #[error("archive storage answered {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid archive input: {0}")]
    InvalidInput(String),
}

/// Stage-scoped pipeline errors.
///
/// - [`Parse`] the receipt image could not be understood.
/// - [`Import`] the receipt was understood but not recorded.
/// - [`Upload`] the receipt was recorded but the file was not archived.
/// - [`ContextUnavailable`] categories or payees could not be loaded, nothing
///   was attempted.
///
///  [`Parse`]: ReceiptError::Parse
///  [`Import`]: ReceiptError::Import
///  [`Upload`]: ReceiptError::Upload
///  [`ContextUnavailable`]: ReceiptError::ContextUnavailable
#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("Failed to load the budget categories or payees")]
    ContextUnavailable(#[source] BudgetError),
    #[error("Failed to parse the receipt")]
    Parse(#[source] ExtractionError),
    #[error("Failed to import the receipt into YNAB")]
    Import(#[source] BudgetError),
    #[error("Failed to upload the receipt file")]
    Upload(#[source] ArchiveError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptErrorKind {
    Context,
    Parse,
    Import,
    Upload,
}

impl ReceiptErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Parse => "parse",
            Self::Import => "import",
            Self::Upload => "upload",
        }
    }
}

impl ReceiptError {
    pub fn kind(&self) -> ReceiptErrorKind {
        match self {
            Self::ContextUnavailable(_) => ReceiptErrorKind::Context,
            Self::Parse(_) => ReceiptErrorKind::Parse,
            Self::Import(_) => ReceiptErrorKind::Import,
            Self::Upload(_) => ReceiptErrorKind::Upload,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn stage_errors_keep_their_cause() {
        let err = ReceiptError::Import(BudgetError::UnknownCategory("Dining".to_string()));
        assert_eq!(err.kind(), ReceiptErrorKind::Import);
        assert_eq!(err.to_string(), "Failed to import the receipt into YNAB");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("\"Dining\" category not found!"));
    }

    #[test]
    fn kinds_have_stable_names() {
        assert_eq!(ReceiptErrorKind::Context.as_str(), "context");
        assert_eq!(ReceiptErrorKind::Parse.as_str(), "parse");
        assert_eq!(ReceiptErrorKind::Import.as_str(), "import");
        assert_eq!(ReceiptErrorKind::Upload.as_str(), "upload");
    }
}
