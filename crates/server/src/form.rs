//! Multipart forms accepted by the receipt endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::{DateTime, NaiveDate};
use engine::ReceiptFile;

use crate::ServerError;

const FILE_FIELD: &str = "file";
const DEFAULT_FILE_NAME: &str = "receipt";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Form of `POST /api/receipt`.
#[derive(Debug)]
pub(crate) struct ReceiptForm {
    pub account: String,
    pub file: ReceiptFile,
}

/// Form of `POST /api/receipt/upload`.
#[derive(Debug)]
pub(crate) struct UploadForm {
    pub merchant: String,
    pub date: NaiveDate,
    pub file: ReceiptFile,
}

#[derive(Default)]
struct Fields {
    file: Option<ReceiptFile>,
    text: HashMap<String, String>,
}

impl Fields {
    async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self, ServerError> {
        let mut fields = Fields::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(ServerError::Multipart)?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == FILE_FIELD {
                let file_name = field.file_name().unwrap_or(DEFAULT_FILE_NAME).to_string();
                let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();
                let bytes = field.bytes().await.map_err(ServerError::Multipart)?;
                if bytes.len() > max_file_size {
                    return Err(ServerError::TooLarge(format!(
                        "file exceeds the {max_file_size} bytes limit"
                    )));
                }
                fields.file = Some(ReceiptFile::new(file_name, mime_type, bytes.to_vec()));
            } else {
                let value = field.text().await.map_err(ServerError::Multipart)?;
                fields.text.insert(name, value);
            }
        }
        Ok(fields)
    }

    fn text(&mut self, name: &str) -> Result<String, ServerError> {
        self.text
            .remove(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ServerError::Invalid(format!("missing \"{name}\" field")))
    }

    fn file(&mut self) -> Result<ReceiptFile, ServerError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| ServerError::Invalid("missing \"file\" field".to_string()))?;
        if file.is_empty() {
            return Err(ServerError::Invalid("the uploaded file is empty".to_string()));
        }
        if !is_supported(&file.mime_type) {
            return Err(ServerError::Invalid(format!(
                "unsupported file type \"{}\"",
                file.mime_type
            )));
        }
        Ok(file)
    }
}

fn is_supported(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || mime_type == "application/pdf"
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ServerError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| ServerError::Invalid(format!("invalid transaction date \"{value}\"")))
}

impl ReceiptForm {
    pub(crate) async fn read(
        multipart: Multipart,
        max_file_size: usize,
    ) -> Result<Self, ServerError> {
        let mut fields = Fields::read(multipart, max_file_size).await?;
        Ok(Self {
            file: fields.file()?,
            account: fields.text("account")?,
        })
    }
}

impl UploadForm {
    pub(crate) async fn read(
        multipart: Multipart,
        max_file_size: usize,
    ) -> Result<Self, ServerError> {
        let mut fields = Fields::read(multipart, max_file_size).await?;
        Ok(Self {
            file: fields.file()?,
            merchant: fields.text("merchant")?,
            date: parse_date(&fields.text("transactionDate")?)?,
        })
    }
}
