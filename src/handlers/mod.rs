//! HTTP handlers

pub mod health;
pub mod risk;
pub mod anomaly;
pub mod telemetry;
