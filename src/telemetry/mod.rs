//! Telemetry source
//!
//! Reads the latest [`TelemetryRecord`] for a satellite from an external
//! document store, once or as a live subscription. Each delivery is a full
//! replacement of the previous record; missed updates are not buffered.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::models::TelemetryRecord;

pub use memory::MemoryTelemetrySource;
pub use postgres::PgTelemetrySource;

#[derive(Debug, Clone, Error)]
pub enum TelemetryError {
    #[error("telemetry store error: {0}")]
    Store(String),

    #[error("telemetry subscription error: {0}")]
    Subscription(String),
}

impl From<sqlx::Error> for TelemetryError {
    fn from(err: sqlx::Error) -> Self {
        TelemetryError::Store(err.to_string())
    }
}

/// Receives the latest record, or `None` when the satellite has no record
pub type DataCallback = Box<dyn Fn(Option<TelemetryRecord>) + Send + Sync>;

pub type ErrorCallback = Box<dyn Fn(TelemetryError) + Send + Sync>;

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_telemetry(&self, satellite_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError>;

    /// Push every new record for `satellite_id` until the returned handle is
    /// unsubscribed or dropped. The current record is delivered first.
    fn subscribe_telemetry(
        &self,
        satellite_id: &str,
        on_data: DataCallback,
        on_error: ErrorCallback,
    ) -> TelemetrySubscription;
}

/// Callback side of a subscription.
///
/// A callback runs under the read side of the cancellation lock, so
/// cancelling waits for an in-flight callback and no new one starts after.
pub struct Delivery {
    cancelled: Arc<RwLock<bool>>,
    on_data: DataCallback,
    on_error: ErrorCallback,
}

impl Delivery {
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn data(&self, record: Option<TelemetryRecord>) {
        let cancelled = self.cancelled.read().unwrap_or_else(|e| e.into_inner());
        if !*cancelled {
            (self.on_data)(record);
        }
    }

    pub fn error(&self, err: TelemetryError) {
        let cancelled = self.cancelled.read().unwrap_or_else(|e| e.into_inner());
        if !*cancelled {
            (self.on_error)(err);
        }
    }
}

/// Live subscription handle.
///
/// Unsubscribing (explicitly or by drop) stops delivery immediately: no
/// callback starts after the call returns. Callbacks must not unsubscribe
/// their own subscription.
pub struct TelemetrySubscription {
    cancelled: Arc<RwLock<bool>>,
    task: Option<JoinHandle<()>>,
}

impl TelemetrySubscription {
    /// Run `body` on the runtime with a cancellable [`Delivery`]
    pub fn spawn<F, Fut>(on_data: DataCallback, on_error: ErrorCallback, body: F) -> Self
    where
        F: FnOnce(Delivery) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(RwLock::new(false));
        let delivery = Delivery {
            cancelled: cancelled.clone(),
            on_data,
            on_error,
        };
        let task = tokio::spawn(body(delivery));

        Self {
            cancelled,
            task: Some(task),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        *self.cancelled.write().unwrap_or_else(|e| e.into_inner()) = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
