//! Contract of the optional archive storage.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::{ArchiveError, ReceiptFile};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    S3,
}

/// Where archived receipts end up, for display purposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub configured: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StorageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl StorageInfo {
    pub fn not_configured() -> Self {
        Self {
            configured: false,
            kind: None,
            location: None,
        }
    }

    pub fn configured(kind: StorageKind, location: impl Into<String>) -> Self {
        Self {
            configured: true,
            kind: Some(kind),
            location: Some(location.into()),
        }
    }
}

#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// Stores `file` under a location derived from `merchant` and `date`.
    async fn upload_file(
        &self,
        merchant: &str,
        date: NaiveDate,
        file: &ReceiptFile,
    ) -> Result<(), ArchiveError>;

    fn storage_info(&self) -> StorageInfo;
}
