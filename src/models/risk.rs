//! Risk score request/response models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Link quality category accepted by the risk model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationStatus {
    Stable,
    Unstable,
    Lost,
}

impl CommunicationStatus {
    pub const ALL: [&'static str; 3] = ["stable", "unstable", "lost"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Unstable => "unstable",
            Self::Lost => "lost",
        }
    }
}

impl std::fmt::Display for CommunicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RiskScoreInput {
    /// Percent
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_level: f64,
    /// °C
    pub temperature: f64,
    pub communication_status: CommunicationStatus,
}

/// Model answer, checked against `RISK_SCORE_OUTPUT` before it is returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScoreResult {
    pub risk_score: f64,
    pub explanation: String,
}
