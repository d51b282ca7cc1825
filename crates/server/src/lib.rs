use api_types::{ErrorBody, receipt::FailureKind};
use axum::{
    Json, extract::multipart::MultipartError, http::StatusCode, response::IntoResponse,
};
use engine::{ReceiptError, ReceiptErrorKind};

pub use server::{
    AuthConfig, DEFAULT_MAX_FILE_SIZE, ServerConfig, router, run_with_listener,
    spawn_with_listener,
};

mod form;
mod progress;
mod receipt;
mod server;

pub enum ServerError {
    Receipt(ReceiptError),
    Multipart(MultipartError),
    Invalid(String),
    TooLarge(String),
}

pub(crate) fn failure_kind(kind: ReceiptErrorKind) -> FailureKind {
    match kind {
        ReceiptErrorKind::Context => FailureKind::Context,
        ReceiptErrorKind::Parse => FailureKind::Parse,
        ReceiptErrorKind::Import => FailureKind::Import,
        ReceiptErrorKind::Upload => FailureKind::Upload,
    }
}

fn status_for_receipt_error(err: &ReceiptError) -> StatusCode {
    match err.kind() {
        ReceiptErrorKind::Parse => StatusCode::UNPROCESSABLE_ENTITY,
        ReceiptErrorKind::Context | ReceiptErrorKind::Import | ReceiptErrorKind::Upload => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Receipt(err) => (status_for_receipt_error(&err), err.to_string()),
            ServerError::Multipart(err) => (err.status(), err.body_text()),
            ServerError::Invalid(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::TooLarge(err) => (StatusCode::PAYLOAD_TOO_LARGE, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<ReceiptError> for ServerError {
    fn from(value: ReceiptError) -> Self {
        Self::Receipt(value)
    }
}
