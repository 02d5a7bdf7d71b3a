//! Data models

pub mod telemetry;
pub mod risk;
pub mod anomaly;

pub use telemetry::*;
pub use risk::*;
pub use anomaly::*;
