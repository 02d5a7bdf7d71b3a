//! Telemetry dashboard handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio::sync::watch;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::{AppState, AppResult};
use crate::normalizer::{self, DashboardSnapshot};
use crate::services::ServiceError;

/// Latest normalized reading for one satellite.
///
/// A satellite without a record still answers 200 with `noData: true`.
pub async fn snapshot(
    State(state): State<AppState>,
    Path(satellite_id): Path<String>,
) -> AppResult<Json<DashboardSnapshot>> {
    let record = state
        .source
        .fetch_telemetry(&satellite_id)
        .await
        .map_err(|source| ServiceError::Telemetry {
            context: format!("fetching telemetry for '{}'", satellite_id),
            source,
        })?;

    Ok(Json(normalizer::snapshot(&satellite_id, record.as_ref(), state.config.battery_range)))
}

#[derive(Clone)]
enum StreamUpdate {
    Snapshot(DashboardSnapshot),
    Error(String),
}

/// Live normalized readings as server-sent events.
///
/// Only the newest update waits for a slow client; anything it replaced is
/// never sent. The subscription lives inside the response stream, so a
/// disconnecting client unsubscribes by dropping it.
pub async fn stream(
    State(state): State<AppState>,
    Path(satellite_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = watch::channel(None::<StreamUpdate>);
    let tx = Arc::new(tx);
    let range = state.config.battery_range;

    let data_tx = tx.clone();
    let id = satellite_id.clone();
    let subscription = state.source.subscribe_telemetry(
        &satellite_id,
        Box::new(move |record| {
            let snapshot = normalizer::snapshot(&id, record.as_ref(), range);
            data_tx.send_replace(Some(StreamUpdate::Snapshot(snapshot)));
        }),
        Box::new(move |err| {
            tx.send_replace(Some(StreamUpdate::Error(err.to_string())));
        }),
    );

    tracing::info!("Telemetry stream opened for {}", satellite_id);

    let events = WatchStream::new(rx).filter_map(move |update| {
        let _held = &subscription;
        update.map(|update| match update {
            StreamUpdate::Snapshot(snapshot) => Event::default().event("telemetry").json_data(snapshot),
            StreamUpdate::Error(message) => Ok(Event::default().event("error").data(message)),
        })
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
