//! Receipt API endpoints.

use std::convert::Infallible;

use api_types::receipt::{StorageInfo, StorageType, UploadResponse};
use axum::{
    Json,
    extract::{Multipart, State},
    response::sse::{Event, KeepAlive, Sse},
};
use engine::{StorageKind, UploadOutcome};
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};

use crate::{
    ServerError,
    form::{ReceiptForm, UploadForm},
    progress::{ChannelSink, outcome_event},
    server::ServerState,
};

const EVENT_BUFFER: usize = 8;

/// Runs the pipeline on the uploaded receipt and streams its progress.
///
/// The pipeline keeps running if the client goes away: the transaction is
/// recorded either way.
pub async fn process(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let form = ReceiptForm::read(multipart, state.max_file_size).await?;
    tracing::debug!(
        account = %form.account,
        file_type = %form.file.mime_type,
        file_size = form.file.len(),
        "receipt received"
    );

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let sink = ChannelSink::new(tx.clone());
        let outcome = pipeline
            .process(&form.account, &form.file, Some(&sink))
            .await;
        if tx.send(outcome_event(outcome)).await.is_err() {
            tracing::debug!("receipt listener disconnected before completion");
        }
    });

    let stream = ReceiverStream::new(rx).map(Ok);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn storage_info(outcome: UploadOutcome) -> StorageInfo {
    let info = outcome.storage_info;
    StorageInfo {
        configured: info.configured,
        storage_type: info.kind.map(|kind| match kind {
            StorageKind::Local => StorageType::Local,
            StorageKind::S3 => StorageType::S3,
        }),
        location: info.location,
    }
}

/// Archives a file without extracting or importing it.
pub async fn upload(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let form = UploadForm::read(multipart, state.max_file_size).await?;
    let outcome = state
        .pipeline
        .archive_standalone(&form.merchant, form.date, &form.file)
        .await?;

    Ok(Json(UploadResponse {
        success: outcome.success,
        storage_info: storage_info(outcome),
    }))
}
