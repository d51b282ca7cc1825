//! Server-sent events for pipeline progress.

use api_types::{
    events,
    receipt::{FailureKind, ReceiptFailure},
};
use async_trait::async_trait;
use axum::response::sse::Event;
use engine::{ProgressEvent, ProgressSink, Receipt, ReceiptError};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::failure_kind;

pub(crate) fn sse_event(name: &str, payload: &impl Serialize) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!("failed to encode {name} event: {err}");
            failure_event(FailureKind::Invalid, "failed to encode event".to_string())
        }
    }
}

fn failure_event(kind: FailureKind, error: String) -> Event {
    let failure = ReceiptFailure { kind, error };
    Event::default()
        .event(events::ERROR)
        .json_data(&failure)
        .unwrap_or_else(|_| Event::default().event(events::ERROR))
}

/// Terminal event of a receipt stream.
pub(crate) fn outcome_event(outcome: Result<Receipt, ReceiptError>) -> Event {
    match outcome {
        Ok(receipt) => sse_event(events::COMPLETE, &receipt),
        Err(err) => failure_event(failure_kind(err.kind()), err.to_string()),
    }
}

/// Forwards progress to the SSE response of one request.
///
/// The channel is bounded: a slow client holds the pipeline back instead of
/// buffering events without limit.
pub(crate) struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    pub(crate) fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&self, event: ProgressEvent) {
        let sse = sse_event(event.name(), &event.payload());
        if self.tx.send(sse).await.is_err() {
            tracing::debug!(event = event.name(), "progress listener disconnected");
        }
    }
}
