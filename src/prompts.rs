//! Prompt templates for the two model calls
//!
//! The anomaly thresholds below are guidance handed to the model. Nothing in
//! this crate classifies risk with them.

use crate::models::{RiskScoreInput, TelemetryRecord};

// ============================================================================
// ANOMALY GUIDELINES
// ============================================================================

/// Gyroscope change between readings that signals an attitude problem (deg/s)
pub const GYRO_DELTA_DEG_S: f64 = 1.0;
/// Magnetometer change between readings that signals an attitude problem (μT)
pub const MAG_DELTA_UT: f64 = 10.0;

pub const BATTERY_CRITICAL_V: f64 = 3.65;
pub const BATTERY_LOW_V: f64 = 3.75;
pub const SOLAR_LOW_W: f64 = 0.5;

pub const INTERNAL_TEMP_CRITICAL_C: f64 = 38.0;
pub const INTERNAL_TEMP_HIGH_C: f64 = 35.0;
pub const EXTERNAL_TEMP_MIN_C: f64 = -30.0;
pub const EXTERNAL_TEMP_MAX_C: f64 = 50.0;

pub const SIGNAL_CRITICAL_DBM: f64 = -95.0;
pub const SIGNAL_WEAK_DBM: f64 = -90.0;
pub const DELAY_CRITICAL_MS: f64 = 300.0;
pub const DELAY_HIGH_MS: f64 = 250.0;

pub fn risk_score_prompt(input: &RiskScoreInput) -> String {
    format!(
        r#"You are a satellite operations analyst. Assess the overall risk of an anomaly
for a satellite from its current condition.

Current condition:
- Battery level: {battery}%
- Temperature: {temperature} °C
- Communication status: {status}

Guidance:
- A low battery level increases risk; below 20% is serious.
- Temperatures far outside the normal operating band, hot or cold, increase risk.
- An "unstable" communication link increases risk; a "lost" link increases it sharply.
- Combined problems compound each other.

Respond with a JSON object containing:
- "riskScore": a number from 0 (no risk) to 100 (failure imminent)
- "explanation": one or two sentences naming the factors behind the score"#,
        battery = input.battery_level,
        temperature = input.temperature,
        status = input.communication_status,
    )
}

pub fn anomaly_explanation_prompt(satellite_id: &str, record: &TelemetryRecord) -> String {
    let timestamp = record
        .timestamp
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        r#"You are a satellite operations analyst. Explain the anomaly score for
satellite "{satellite_id}" from its latest telemetry.

Telemetry (recorded {timestamp}):
- Gyroscope (deg/s): x={gx}, y={gy}, z={gz}
- Magnetometer (μT): x={mx}, y={my}, z={mz}
- Battery voltage: {battery} V
- Solar panel output: {solar} W
- Internal temperature: {internal} °C
- External temperature: {external} °C
- Signal strength: {signal} dBm
- Packet delay: {delay} ms

Risk guidelines:
- Orientation: a gyroscope change above {GYRO_DELTA_DEG_S} deg/s or a magnetometer
  change above {MAG_DELTA_UT} μT indicates an attitude control problem.
- Power: battery below {BATTERY_CRITICAL_V} V is critical, below {BATTERY_LOW_V} V is low.
  Solar output below {SOLAR_LOW_W} W indicates a charging problem.
- Thermal: internal temperature above {INTERNAL_TEMP_CRITICAL_C} °C is critical, above
  {INTERNAL_TEMP_HIGH_C} °C is high. External temperature outside
  [{EXTERNAL_TEMP_MIN_C}, {EXTERNAL_TEMP_MAX_C}] °C is abnormal.
- Communication: signal below {SIGNAL_CRITICAL_DBM} dBm is critical, below
  {SIGNAL_WEAK_DBM} dBm is weak. Packet delay above {DELAY_CRITICAL_MS} ms is critical,
  above {DELAY_HIGH_MS} ms is high.

Respond with a JSON object containing:
- "explanation": a short paragraph describing what is driving the anomaly
- "breakdown": an object with "thermal", "comm", "power" and "orientation",
  each a number from 0 to 100 estimating that category's contribution. The
  values may sum roughly to 100, or highlight the primary risk factor."#,
        gx = record.gyroscope.x,
        gy = record.gyroscope.y,
        gz = record.gyroscope.z,
        mx = record.magnetometer.x,
        my = record.magnetometer.y,
        mz = record.magnetometer.z,
        battery = record.battery_voltage,
        solar = record.solar_panel_output,
        internal = record.internal_temperature,
        external = record.external_temperature,
        signal = record.communication_logs.signal_strength,
        delay = record.communication_logs.packet_delay,
    )
}
