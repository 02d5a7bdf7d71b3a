//! Anomaly explanation request/response models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyExplanationRequest {
    pub satellite_id: String,
}

/// Per-category contribution estimate.
///
/// Each category is bounded 0..=100 on its own; the categories may overlap
/// and are not normalized to a total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyBreakdown {
    pub thermal: f64,
    pub comm: f64,
    pub power: f64,
    pub orientation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyExplanationResult {
    pub explanation: String,
    pub breakdown: AnomalyBreakdown,
}
