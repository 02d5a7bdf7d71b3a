//! AI-backed services
//!
//! Both services follow the same shape: validate the request, render a
//! prompt, ask the model for structured output, validate what came back.
//! Each call is a single attempt; nothing is cached or retried.

pub mod risk_score;
pub mod anomaly;

use thiserror::Error;

use crate::ai::AiInvocationError;
use crate::schema::Violations;
use crate::telemetry::TelemetryError;

pub use risk_score::RiskScoreService;
pub use anomaly::AnomalyExplanationService;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request payload failed its contract; the caller can fix it
    #[error("invalid request: {0}")]
    Validation(Violations),

    #[error("no telemetry found for satellite '{satellite_id}'")]
    NotFound { satellite_id: String },

    /// The model could not be called
    #[error("{context}: {source}")]
    AiInvocation {
        context: String,
        #[source]
        source: AiInvocationError,
    },

    /// The model answered but its output failed the response contract
    #[error("{context}: model returned an invalid response: {violations}")]
    AiResponse {
        context: String,
        violations: Violations,
    },

    #[error("{context}: {source}")]
    Telemetry {
        context: String,
        #[source]
        source: TelemetryError,
    },
}
