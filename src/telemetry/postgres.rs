//! PostgreSQL telemetry store
//!
//! Documents live in `satellite_telemetry` as JSONB. Subscriptions listen on
//! [`TELEMETRY_CHANNEL`] and re-read the document when its ID is notified.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{DataCallback, Delivery, ErrorCallback, TelemetryError, TelemetrySource, TelemetrySubscription};
use crate::db::TELEMETRY_CHANNEL;
use crate::models::TelemetryRecord;

/// Pause before receiving again after a listener error
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct PgTelemetrySource {
    pool: PgPool,
}

impl PgTelemetrySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn fetch_document(pool: &PgPool, satellite_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError> {
    let document = sqlx::query_scalar::<_, Json<TelemetryRecord>>(
        "SELECT document FROM satellite_telemetry WHERE id = $1",
    )
    .bind(satellite_id)
    .fetch_optional(pool)
    .await?;

    Ok(document.map(|Json(mut record)| {
        record.id.get_or_insert_with(|| satellite_id.to_string());
        record
    }))
}

/// One wake-up of the listener loop
enum ListenerEvent<'a> {
    Notified(&'a str),
    Interrupted,
}

fn should_refetch(event: ListenerEvent<'_>, satellite_id: &str) -> bool {
    match event {
        ListenerEvent::Notified(payload) => payload == satellite_id,
        // Notifications sent while the connection was down are gone
        ListenerEvent::Interrupted => true,
    }
}

async fn deliver_latest(pool: &PgPool, satellite_id: &str, delivery: &Delivery) {
    match fetch_document(pool, satellite_id).await {
        Ok(record) => delivery.data(record),
        Err(e) => delivery.error(e),
    }
}

async fn run_subscription(pool: PgPool, satellite_id: String, delivery: Delivery) {
    let mut listener = match PgListener::connect_with(&pool).await {
        Ok(listener) => listener,
        Err(e) => {
            delivery.error(TelemetryError::Subscription(format!("listener connect failed: {}", e)));
            return;
        }
    };

    if let Err(e) = listener.listen(TELEMETRY_CHANNEL).await {
        delivery.error(TelemetryError::Subscription(format!("LISTEN {} failed: {}", TELEMETRY_CHANNEL, e)));
        return;
    }

    deliver_latest(&pool, &satellite_id, &delivery).await;

    while !delivery.is_cancelled() {
        let refetch = match listener.recv().await {
            Ok(notification) => should_refetch(ListenerEvent::Notified(notification.payload()), &satellite_id),
            Err(e) => {
                tracing::warn!("Telemetry listener for {} failed: {}", satellite_id, e);
                delivery.error(TelemetryError::Subscription(e.to_string()));
                // The next recv() reconnects
                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                should_refetch(ListenerEvent::Interrupted, &satellite_id)
            }
        };

        if refetch {
            deliver_latest(&pool, &satellite_id, &delivery).await;
        }
    }
}

#[async_trait]
impl TelemetrySource for PgTelemetrySource {
    async fn fetch_telemetry(&self, satellite_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError> {
        fetch_document(&self.pool, satellite_id).await
    }

    fn subscribe_telemetry(
        &self,
        satellite_id: &str,
        on_data: DataCallback,
        on_error: ErrorCallback,
    ) -> TelemetrySubscription {
        let pool = self.pool.clone();
        let satellite_id = satellite_id.to_string();

        tracing::debug!("Subscribing to telemetry for {}", satellite_id);
        TelemetrySubscription::spawn(on_data, on_error, move |delivery| {
            run_subscription(pool, satellite_id, delivery)
        })
    }
}
