//! In-process telemetry store
//!
//! One `watch` channel per satellite holds the latest record, which gives the
//! "latest only, no backlog" delivery model for free. A channel for a
//! satellite without a record exists only while someone is subscribed to it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use super::{DataCallback, ErrorCallback, TelemetryError, TelemetrySource, TelemetrySubscription};
use crate::models::TelemetryRecord;

type Channels = Arc<Mutex<HashMap<String, watch::Sender<Option<TelemetryRecord>>>>>;

#[derive(Debug, Default)]
pub struct MemoryTelemetrySource {
    channels: Channels,
}

impl MemoryTelemetrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from a JSON object keyed by satellite ID
    pub fn from_seed_file(path: &Path) -> Result<Self, TelemetryError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::Store(format!("cannot read {}: {}", path.display(), e)))?;
        let records: HashMap<String, TelemetryRecord> = serde_json::from_str(&raw)
            .map_err(|e| TelemetryError::Store(format!("invalid seed file {}: {}", path.display(), e)))?;

        let source = Self::new();
        for (id, record) in records {
            source.publish(&id, record);
        }
        tracing::info!("Seeded {} satellite record(s) from {}", source.satellite_count(), path.display());
        Ok(source)
    }

    /// Replace the latest record for a satellite and notify subscribers
    pub fn publish(&self, satellite_id: &str, mut record: TelemetryRecord) {
        record.id.get_or_insert_with(|| satellite_id.to_string());
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channel_for(&mut channels, satellite_id).send_replace(Some(record));
    }

    pub fn satellite_count(&self) -> usize {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.values().filter(|tx| tx.borrow().is_some()).count()
    }

    fn watch(&self, satellite_id: &str) -> Watcher {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        Watcher {
            rx: channel_for(&mut channels, satellite_id).subscribe(),
            channels: self.channels.clone(),
            satellite_id: satellite_id.to_string(),
        }
    }
}

// Channels are only touched under the map lock so a pruning watcher never
// races a publish or a new subscriber
fn channel_for<'a>(
    channels: &'a mut HashMap<String, watch::Sender<Option<TelemetryRecord>>>,
    satellite_id: &str,
) -> &'a watch::Sender<Option<TelemetryRecord>> {
    channels
        .entry(satellite_id.to_string())
        .or_insert_with(|| watch::channel(None).0)
}

/// Receiver half owned by one subscription task.
///
/// Dropping the last watcher of a satellite that has no record removes its
/// channel again.
struct Watcher {
    rx: watch::Receiver<Option<TelemetryRecord>>,
    channels: Channels,
    satellite_id: String,
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        // Our own receiver is still alive here
        let unused = channels
            .get(&self.satellite_id)
            .is_some_and(|tx| tx.borrow().is_none() && tx.receiver_count() <= 1);
        if unused {
            channels.remove(&self.satellite_id);
        }
    }
}

#[async_trait]
impl TelemetrySource for MemoryTelemetrySource {
    async fn fetch_telemetry(&self, satellite_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        Ok(channels.get(satellite_id).and_then(|tx| tx.borrow().clone()))
    }

    fn subscribe_telemetry(
        &self,
        satellite_id: &str,
        on_data: DataCallback,
        on_error: ErrorCallback,
    ) -> TelemetrySubscription {
        let watcher = self.watch(satellite_id);

        TelemetrySubscription::spawn(on_data, on_error, |delivery| async move {
            let mut watcher = watcher;
            let current = watcher.rx.borrow_and_update().clone();
            delivery.data(current);

            while watcher.rx.changed().await.is_ok() {
                if delivery.is_cancelled() {
                    break;
                }
                let latest = watcher.rx.borrow_and_update().clone();
                delivery.data(latest);
            }
        })
    }
}
