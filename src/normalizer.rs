//! Telemetry normalization
//!
//! Pure functions turning a raw [`TelemetryRecord`] into the numbers and
//! categories the dashboard shows and the risk pipeline consumes. An absent
//! record is never turned into a silent zero reading: every output carries a
//! `no_data` flag the caller must surface.

use serde::Serialize;

use crate::models::{CommunicationStatus, RiskScoreInput, TelemetryRecord};

/// Signal strength at or above which the link is stable (dBm)
pub const STABLE_SIGNAL_DBM: f64 = -85.0;

/// Signal strength at or above which the link is unstable rather than lost (dBm)
pub const UNSTABLE_SIGNAL_DBM: f64 = -95.0;

/// Battery voltage range mapped onto 0..=100 percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageRange {
    pub min_voltage: f64,
    pub max_voltage: f64,
}

impl Default for VoltageRange {
    fn default() -> Self {
        Self {
            min_voltage: 3.5,
            max_voltage: 4.2,
        }
    }
}

/// Link category shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Stable,
    Unstable,
    Lost,
    Unknown,
}

impl LinkStatus {
    /// Category accepted by the risk model; `Unknown` has none
    pub fn as_risk_status(&self) -> Option<CommunicationStatus> {
        match self {
            Self::Stable => Some(CommunicationStatus::Stable),
            Self::Unstable => Some(CommunicationStatus::Unstable),
            Self::Lost => Some(CommunicationStatus::Lost),
            Self::Unknown => None,
        }
    }
}

/// A displayed value together with whether it came from a real record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub value: f64,
    pub no_data: bool,
}

/// Dashboard view of one satellite's latest record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub satellite_id: String,
    pub no_data: bool,
    pub battery_percent: u8,
    pub temperature: f64,
    pub communication_status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_input: Option<RiskScoreInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<TelemetryRecord>,
}

/// Map a battery voltage onto 0..=100 percent, rounded and clamped
pub fn battery_percent(voltage: f64, range: VoltageRange) -> u8 {
    let span = range.max_voltage - range.min_voltage;
    if !(span > 0.0) || voltage.is_nan() {
        return 0;
    }

    let percent = ((voltage - range.min_voltage) / span * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Categorize a signal strength reading
pub fn communication_status(signal_dbm: Option<f64>) -> LinkStatus {
    match signal_dbm {
        None => LinkStatus::Unknown,
        Some(s) if s.is_nan() => LinkStatus::Unknown,
        Some(s) if s >= STABLE_SIGNAL_DBM => LinkStatus::Stable,
        Some(s) if s >= UNSTABLE_SIGNAL_DBM => LinkStatus::Unstable,
        Some(_) => LinkStatus::Lost,
    }
}

pub fn display_temperature(record: Option<&TelemetryRecord>) -> Reading {
    match record {
        Some(r) => Reading { value: r.internal_temperature, no_data: false },
        None => Reading { value: 0.0, no_data: true },
    }
}

/// Risk pipeline input for a present record with a known link status
pub fn risk_input(record: &TelemetryRecord, range: VoltageRange) -> Option<RiskScoreInput> {
    let status = communication_status(Some(record.communication_logs.signal_strength));
    Some(RiskScoreInput {
        battery_level: f64::from(battery_percent(record.battery_voltage, range)),
        temperature: record.internal_temperature,
        communication_status: status.as_risk_status()?,
    })
}

pub fn snapshot(satellite_id: &str, record: Option<&TelemetryRecord>, range: VoltageRange) -> DashboardSnapshot {
    let temperature = display_temperature(record);

    match record {
        Some(r) => DashboardSnapshot {
            satellite_id: satellite_id.to_string(),
            no_data: false,
            battery_percent: battery_percent(r.battery_voltage, range),
            temperature: temperature.value,
            communication_status: communication_status(Some(r.communication_logs.signal_strength)),
            risk_input: risk_input(r, range),
            record: Some(r.clone()),
        },
        None => DashboardSnapshot {
            satellite_id: satellite_id.to_string(),
            no_data: temperature.no_data,
            battery_percent: 0,
            temperature: temperature.value,
            communication_status: communication_status(None),
            risk_input: None,
            record: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_percent_endpoints() {
        let range = VoltageRange::default();
        assert_eq!(battery_percent(3.5, range), 0);
        assert_eq!(battery_percent(4.2, range), 100);
        assert_eq!(battery_percent(3.85, range), 50);
    }

    #[test]
    fn test_battery_percent_clamped_and_monotonic() {
        let range = VoltageRange::default();
        let mut previous = 0;
        let mut v = 0.0;
        while v <= 6.0 {
            let pct = battery_percent(v, range);
            assert!(pct <= 100);
            assert!(pct >= previous, "not monotonic at {}V", v);
            previous = pct;
            v += 0.01;
        }
        assert_eq!(battery_percent(-10.0, range), 0);
        assert_eq!(battery_percent(f64::INFINITY, range), 100);
        assert_eq!(battery_percent(f64::NAN, range), 0);
    }

    #[test]
    fn test_battery_percent_misconfigured_range() {
        let flat = VoltageRange { min_voltage: 4.0, max_voltage: 4.0 };
        let inverted = VoltageRange { min_voltage: 4.2, max_voltage: 3.5 };
        assert_eq!(battery_percent(4.1, flat), 0);
        assert_eq!(battery_percent(4.1, inverted), 0);
    }

    #[test]
    fn test_communication_status_thresholds() {
        assert_eq!(communication_status(Some(-80.0)), LinkStatus::Stable);
        assert_eq!(communication_status(Some(-85.0)), LinkStatus::Stable);
        assert_eq!(communication_status(Some(-90.0)), LinkStatus::Unstable);
        assert_eq!(communication_status(Some(-95.0)), LinkStatus::Unstable);
        assert_eq!(communication_status(Some(-100.0)), LinkStatus::Lost);
        assert_eq!(communication_status(None), LinkStatus::Unknown);
        assert_eq!(communication_status(Some(f64::NAN)), LinkStatus::Unknown);
    }

    #[test]
    fn test_absent_record_is_flagged() {
        let reading = display_temperature(None);
        assert_eq!(reading, Reading { value: 0.0, no_data: true });

        let snap = snapshot("sat-9", None, VoltageRange::default());
        assert!(snap.no_data);
        assert_eq!(snap.battery_percent, 0);
        assert_eq!(snap.temperature, 0.0);
        assert_eq!(snap.communication_status, LinkStatus::Unknown);
        assert!(snap.risk_input.is_none());
    }

    #[test]
    fn test_genuine_zero_reading_is_not_no_data() {
        let mut record = TelemetryRecord::placeholder("sat-1");
        record.internal_temperature = 0.0;

        let reading = display_temperature(Some(&record));
        assert_eq!(reading, Reading { value: 0.0, no_data: false });
    }

    #[test]
    fn test_placeholder_record_maps_to_lost() {
        let record = TelemetryRecord::placeholder("sat-1");
        let snap = snapshot("sat-1", Some(&record), VoltageRange::default());

        assert!(!snap.no_data);
        assert_eq!(snap.communication_status, LinkStatus::Lost);
        assert_eq!(snap.risk_input.unwrap().communication_status, CommunicationStatus::Lost);
    }

    #[test]
    fn test_risk_input_from_record() {
        let mut record = TelemetryRecord::placeholder("sat-2");
        record.battery_voltage = 3.57;
        record.internal_temperature = 41.5;
        record.communication_logs.signal_strength = -91.0;

        let input = risk_input(&record, VoltageRange::default()).unwrap();
        assert_eq!(input.battery_level, 10.0);
        assert_eq!(input.temperature, 41.5);
        assert_eq!(input.communication_status, CommunicationStatus::Unstable);

        record.communication_logs.signal_strength = f64::NAN;
        assert!(risk_input(&record, VoltageRange::default()).is_none());
    }
}
