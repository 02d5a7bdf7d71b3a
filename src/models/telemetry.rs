//! Telemetry record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signal strength reported when a satellite has never been heard from (dBm)
pub const NO_CONTACT_SIGNAL_DBM: f64 = -120.0;

/// Packet delay reported when a satellite has never been heard from (ms)
pub const NO_CONTACT_PACKET_DELAY_MS: f64 = 999.0;

/// 3-axis sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommunicationLogs {
    /// dBm
    pub signal_strength: f64,
    /// ms
    pub packet_delay: f64,
}

impl Default for CommunicationLogs {
    fn default() -> Self {
        Self {
            signal_strength: NO_CONTACT_SIGNAL_DBM,
            packet_delay: NO_CONTACT_PACKET_DELAY_MS,
        }
    }
}

/// Snapshot of sensor readings for one satellite.
///
/// Documents missing any numeric field deserialize with the placeholder
/// values from [`TelemetryRecord::default`], so a record is never partially
/// populated. An absent record is represented as `Option::None` by callers,
/// never as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// deg/s
    pub gyroscope: Vector3,
    /// μT
    pub magnetometer: Vector3,
    /// V
    pub battery_voltage: f64,
    /// W
    pub solar_panel_output: f64,
    /// °C
    pub internal_temperature: f64,
    /// °C
    pub external_temperature: f64,
    pub communication_logs: CommunicationLogs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self {
            id: None,
            gyroscope: Vector3::default(),
            magnetometer: Vector3::default(),
            battery_voltage: 0.0,
            solar_panel_output: 0.0,
            internal_temperature: 0.0,
            external_temperature: 0.0,
            communication_logs: CommunicationLogs::default(),
            timestamp: None,
        }
    }
}

impl TelemetryRecord {
    /// Placeholder record for a satellite that exists but has not reported yet
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// True when the record still carries the "no contact" link sentinels
    pub fn is_placeholder(&self) -> bool {
        self.communication_logs == CommunicationLogs::default()
    }
}
