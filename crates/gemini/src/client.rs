use async_trait::async_trait;
use base64::Engine as _;
use engine::{ExtractionError, ExtractionRequest, Receipt, ReceiptExtractor};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use crate::{
    prompt::{build_prompt, system_instruction},
    schema::GenerationConfig,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn request_error(err: reqwest::Error) -> ExtractionError {
    ExtractionError::Request(Box::new(err))
}

/// Live extractor backed by the Gemini `generateContent` endpoint.
///
/// The client is built once and shared; it holds no per-request state.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self, String> {
        let mut key = header::HeaderValue::try_from(api_key)
            .map_err(|err| format!("invalid api key header value: {err}"))?;
        key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert("x-goog-api-key", key);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }

    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::default()
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ReceiptExtractor for GeminiClient {
    fn prompt(&self, known_payees: Option<&[String]>) -> String {
        build_prompt(known_payees)
    }

    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Receipt, ExtractionError> {
        tracing::debug!(model = %self.model, "parse receipt called");
        request.validate()?;

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: system_instruction(request.today),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![
                    Part::Text {
                        text: self.prompt(request.known_payees),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type,
                            data: base64::prelude::BASE64_STANDARD.encode(request.image),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig::for_categories(request.allowed_categories),
        };

        let resp = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(err) => err.error.message,
                Err(_) => "extraction backend error".to_string(),
            };
            return Err(ExtractionError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let response: GenerateContentResponse = resp.json().await.map_err(request_error)?;
        let text = response.text();
        tracing::debug!(response = %text, "parse receipt got response");

        Receipt::from_json(&text, request.allowed_categories)
    }
}

#[derive(Default, Debug)]
pub struct GeminiClientBuilder {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl GeminiClientBuilder {
    pub fn api_key(mut self, api_key: &str) -> GeminiClientBuilder {
        self.api_key = api_key.to_string();
        self
    }

    pub fn model(mut self, model: &str) -> GeminiClientBuilder {
        self.model = model.to_string();
        self
    }

    /// Override the API endpoint (defaults to Google's public one).
    pub fn base_url(mut self, base_url: Option<&str>) -> GeminiClientBuilder {
        self.base_url = base_url.map(str::to_string);
        self
    }

    pub fn build(self) -> Result<GeminiClient, String> {
        tracing::info!("Initializing gemini client...");
        if self.model.is_empty() {
            return Err("gemini model is required".to_string());
        }
        GeminiClient::new(
            &self.api_key,
            &self.model,
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), r#"{"a":1}"#);
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn url_includes_model() {
        let client = GeminiClient::builder()
            .api_key("key")
            .model("gemini-2.0-flash")
            .base_url(Some("http://127.0.0.1:9/"))
            .build()
            .unwrap();
        assert_eq!(
            client.url(),
            "http://127.0.0.1:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn builder_requires_model() {
        assert!(GeminiClient::builder().api_key("key").build().is_err());
    }
}
