//! Progress notifications emitted while a receipt moves through the pipeline.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A named checkpoint of the pipeline.
///
/// Events are emitted in this order when every stage runs; a failing stage
/// truncates the sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ProgressEvent {
    UploadStart,
    CategoriesLoaded(Vec<String>),
    /// Carries the exact prompt sent to the extraction backend.
    RequestGemini(String),
    RequestYnab,
    UploadFile,
}

impl ProgressEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadStart => "upload-start",
            Self::CategoriesLoaded(_) => "categories-loaded",
            Self::RequestGemini(_) => "request-gemini",
            Self::RequestYnab => "request-ynab",
            Self::UploadFile => "upload-file",
        }
    }

    /// Payload as JSON, `Null` for events without one.
    pub fn payload(&self) -> Value {
        match self {
            Self::CategoriesLoaded(categories) => Value::from(categories.clone()),
            Self::RequestGemini(prompt) => Value::from(prompt.clone()),
            Self::UploadStart | Self::RequestYnab | Self::UploadFile => Value::Null,
        }
    }
}

/// Observer of pipeline progress.
///
/// The pipeline awaits every call before moving on, so a slow sink slows the
/// pipeline down.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_wire_format() {
        let events = [
            ProgressEvent::UploadStart,
            ProgressEvent::CategoriesLoaded(vec![]),
            ProgressEvent::RequestGemini(String::new()),
            ProgressEvent::RequestYnab,
            ProgressEvent::UploadFile,
        ];
        let names: Vec<_> = events.iter().map(ProgressEvent::name).collect();
        assert_eq!(
            names,
            [
                "upload-start",
                "categories-loaded",
                "request-gemini",
                "request-ynab",
                "upload-file"
            ]
        );
    }

    #[test]
    fn serializes_with_payload() {
        let event = ProgressEvent::CategoriesLoaded(vec!["Groceries".to_string()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "categories-loaded");
        assert_eq!(json["data"][0], "Groceries");
        assert_eq!(event.payload(), serde_json::json!(["Groceries"]));
        assert_eq!(ProgressEvent::RequestYnab.payload(), Value::Null);
    }
}
