//! Anomaly explanation service

use std::sync::Arc;

use crate::ai::CompletionClient;
use crate::models::AnomalyExplanationResult;
use crate::prompts;
use crate::schema::{self, ViolationKind, Violations, ANOMALY_EXPLANATION_OUTPUT};
use crate::telemetry::TelemetrySource;

use super::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct AnomalyExplanationService {
    client: Arc<dyn CompletionClient>,
    source: Arc<dyn TelemetrySource>,
}

impl AnomalyExplanationService {
    pub fn new(client: Arc<dyn CompletionClient>, source: Arc<dyn TelemetrySource>) -> Self {
        Self { client, source }
    }

    /// Explain the anomaly score of a satellite's latest telemetry.
    ///
    /// Classification is left to the model; only the shape of its answer is
    /// checked here.
    pub async fn explain_anomaly(&self, satellite_id: &str) -> ServiceResult<AnomalyExplanationResult> {
        // IDs are opaque; surrounding whitespace is part of the key
        if satellite_id.trim().is_empty() {
            return Err(ServiceError::Validation(Violations::single("satelliteId", ViolationKind::Empty)));
        }

        // An absent record is an error here, never a zeroed placeholder
        let record = self
            .source
            .fetch_telemetry(satellite_id)
            .await
            .map_err(|source| ServiceError::Telemetry {
                context: format!("fetching telemetry for '{}'", satellite_id),
                source,
            })?
            .ok_or_else(|| ServiceError::NotFound {
                satellite_id: satellite_id.to_string(),
            })?;

        if record.is_placeholder() {
            tracing::debug!("Satellite {} has not reported a link reading yet", satellite_id);
        }

        let prompt = prompts::anomaly_explanation_prompt(satellite_id, &record);
        let output = self
            .client
            .complete_structured(&prompt, &ANOMALY_EXPLANATION_OUTPUT)
            .await
            .map_err(|source| ServiceError::AiInvocation {
                context: format!("anomaly explanation for '{}'", satellite_id),
                source,
            })?;

        let result: AnomalyExplanationResult = schema::validate_payload(&ANOMALY_EXPLANATION_OUTPUT, &output)
            .map_err(|violations| ServiceError::AiResponse {
                context: format!("anomaly explanation for '{}'", satellite_id),
                violations,
            })?;

        tracing::info!(
            "Anomaly explained for {}: thermal={} comm={} power={} orientation={}",
            satellite_id,
            result.breakdown.thermal,
            result.breakdown.comm,
            result.breakdown.power,
            result.breakdown.orientation
        );
        Ok(result)
    }
}
