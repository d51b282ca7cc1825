use serde::{Deserialize, Serialize};

/// Body of every non-streaming error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod events {
    //! Names of the server-sent events of `POST /api/receipt`.
    //!
    //! Progress events are named after the pipeline stage they announce; the
    //! stream always ends with either [`COMPLETE`] or [`ERROR`].

    pub const UPLOAD_START: &str = "upload-start";
    pub const CATEGORIES_LOADED: &str = "categories-loaded";
    pub const REQUEST_GEMINI: &str = "request-gemini";
    pub const REQUEST_YNAB: &str = "request-ynab";
    pub const UPLOAD_FILE: &str = "upload-file";
    pub const COMPLETE: &str = "complete";
    pub const ERROR: &str = "error";
}

pub mod receipt {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FailureKind {
        Parse,
        Import,
        Upload,
        Context,
        Invalid,
    }

    /// Payload of the terminal `error` event.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptFailure {
        pub kind: FailureKind,
        pub error: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum StorageType {
        Local,
        S3,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StorageInfo {
        pub configured: bool,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub storage_type: Option<StorageType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub location: Option<String>,
    }

    /// Response of `POST /api/receipt/upload`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UploadResponse {
        pub success: bool,
        pub storage_info: StorageInfo,
    }
}
