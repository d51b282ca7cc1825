//! S3-compatible archive.
//!
//! Objects are written with a single path-style `PUT` signed with AWS
//! Signature Version 4, which every S3-compatible service accepts (AWS,
//! MinIO, R2, Backblaze...). Only the three headers S3 requires are signed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use engine::{ArchiveError, ArchiveService, ReceiptFile, StorageInfo, StorageKind};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url, header};
use sha2::{Digest, Sha256};

use crate::key::object_key;

pub const DEFAULT_REGION: &str = "us-east-1";
const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

type HmacSha256 = Hmac<Sha256>;

fn request_error(err: reqwest::Error) -> ArchiveError {
    ArchiveError::Request(Box::new(err))
}

fn hmac(key: &[u8], data: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| ArchiveError::InvalidInput(format!("invalid signing key: {err}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encodes everything but unreserved characters, and `/` when
/// `keep_slash` is set.
pub(crate) fn uri_encode(value: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if keep_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

pub(crate) fn signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, ArchiveError> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date)?;
    let k_region = hmac(&k_date, region)?;
    let k_service = hmac(&k_region, service)?;
    hmac(&k_service, "aws4_request")
}

#[derive(Clone)]
pub struct S3Archive {
    client: Client,
    endpoint: Url,
    bucket: String,
    path_prefix: Option<String>,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    date_subdirectories: bool,
}

/// Headers of a signed request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Signature {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

impl S3Archive {
    pub fn builder() -> S3ArchiveBuilder {
        S3ArchiveBuilder::default()
    }

    fn object_path(&self, key: &str) -> String {
        let key = match &self.path_prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        };
        let base = self.endpoint.path().trim_end_matches('/');
        format!("{base}/{}/{}", uri_encode(&self.bucket, false), uri_encode(&key, true))
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    pub(crate) fn sign(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Signature, ArchiveError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let content_sha256 = sha256_hex(body);

        let canonical_request = format!(
            "{method}\n{path}\n\nhost:{}\nx-amz-content-sha256:{content_sha256}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{content_sha256}",
            self.host()
        );
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.region);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        let key = signing_key(&self.secret_access_key, &date, &self.region, SERVICE)?;
        let signature = hex::encode(hmac(&key, &string_to_sign)?);

        Ok(Signature {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
                self.access_key_id
            ),
            amz_date,
            content_sha256,
        })
    }
}

/// Pulls `<Message>` out of an S3 XML error document, entities decoded.
fn error_message(body: &str) -> Option<String> {
    let start = body.find("<Message>")? + "<Message>".len();
    let end = body[start..].find("</Message>")? + start;
    Some(html_escape::decode_html_entities(&body[start..end]).into_owned())
}

#[async_trait]
impl ArchiveService for S3Archive {
    async fn upload_file(
        &self,
        merchant: &str,
        date: NaiveDate,
        file: &ReceiptFile,
    ) -> Result<(), ArchiveError> {
        if file.is_empty() {
            return Err(ArchiveError::InvalidInput("empty file".to_string()));
        }

        let key = object_key(merchant, date, file, self.date_subdirectories);
        let path = self.object_path(&key);
        let signature = self.sign("PUT", &path, &file.bytes, Utc::now())?;

        let mut url = self.endpoint.clone();
        url.set_path(&path);
        tracing::debug!(%url, size = file.len(), "uploading receipt");

        let resp = self
            .client
            .put(url)
            .header(header::AUTHORIZATION, signature.authorization)
            .header("x-amz-date", signature.amz_date)
            .header("x-amz-content-sha256", signature.content_sha256)
            .header(header::CONTENT_TYPE, file.mime_type.as_str())
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ArchiveError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(bucket = %self.bucket, %key, "receipt archived");
        Ok(())
    }

    fn storage_info(&self) -> StorageInfo {
        let location = match &self.path_prefix {
            Some(prefix) => format!("s3://{}/{prefix}", self.bucket),
            None => format!("s3://{}", self.bucket),
        };
        StorageInfo::configured(StorageKind::S3, location)
    }
}

#[derive(Default)]
pub struct S3ArchiveBuilder {
    bucket: String,
    access_key_id: String,
    secret_access_key: String,
    region: Option<String>,
    endpoint: Option<String>,
    path_prefix: Option<String>,
    date_subdirectories: bool,
}

impl S3ArchiveBuilder {
    pub fn bucket(mut self, bucket: &str) -> S3ArchiveBuilder {
        self.bucket = bucket.to_string();
        self
    }

    pub fn credentials(mut self, access_key_id: &str, secret_access_key: &str) -> S3ArchiveBuilder {
        self.access_key_id = access_key_id.to_string();
        self.secret_access_key = secret_access_key.to_string();
        self
    }

    pub fn region(mut self, region: Option<&str>) -> S3ArchiveBuilder {
        self.region = region.map(str::to_string);
        self
    }

    /// Defaults to the AWS endpoint of the region.
    pub fn endpoint(mut self, endpoint: Option<&str>) -> S3ArchiveBuilder {
        self.endpoint = endpoint.map(str::to_string);
        self
    }

    pub fn path_prefix(mut self, path_prefix: Option<&str>) -> S3ArchiveBuilder {
        self.path_prefix = path_prefix
            .map(|prefix| prefix.trim_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty());
        self
    }

    pub fn date_subdirectories(mut self, enabled: bool) -> S3ArchiveBuilder {
        self.date_subdirectories = enabled;
        self
    }

    pub fn build(self) -> Result<S3Archive, String> {
        tracing::info!("Initializing s3 archive...");
        if self.bucket.is_empty() {
            return Err("s3 bucket is required".to_string());
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err("s3 credentials are required".to_string());
        }

        let region = self
            .region
            .filter(|region| !region.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"));
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| format!("invalid s3 endpoint \"{endpoint}\": {err}"))?;
        if endpoint.host_str().is_none() {
            return Err(format!("s3 endpoint \"{endpoint}\" has no host"));
        }

        let client = Client::builder()
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;

        Ok(S3Archive {
            client,
            endpoint,
            bucket: self.bucket,
            path_prefix: self.path_prefix,
            region,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            date_subdirectories: self.date_subdirectories,
        })
    }
}
