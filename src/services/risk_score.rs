//! Risk score service

use std::sync::Arc;

use crate::ai::CompletionClient;
use crate::models::{RiskScoreInput, RiskScoreResult};
use crate::prompts;
use crate::schema::{self, Violation, ViolationKind, Violations, RISK_SCORE_INPUT, RISK_SCORE_OUTPUT};

use super::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct RiskScoreService {
    client: Arc<dyn CompletionClient>,
}

impl RiskScoreService {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Score the risk of an anomaly from three coarse inputs.
    ///
    /// The model's score is returned as validated, without clamping or
    /// rescaling. Identical inputs may score differently across calls.
    pub async fn compute_risk_score(&self, input: &RiskScoreInput) -> ServiceResult<RiskScoreResult> {
        check_input(input).map_err(ServiceError::Validation)?;

        let prompt = prompts::risk_score_prompt(input);
        let output = self
            .client
            .complete_structured(&prompt, &RISK_SCORE_OUTPUT)
            .await
            .map_err(|source| ServiceError::AiInvocation {
                context: "risk score".to_string(),
                source,
            })?;

        let result: RiskScoreResult =
            schema::validate_payload(&RISK_SCORE_OUTPUT, &output).map_err(|violations| ServiceError::AiResponse {
                context: "risk score".to_string(),
                violations,
            })?;

        tracing::debug!(
            "Risk score {} for battery={} temperature={} link={}",
            result.risk_score,
            input.battery_level,
            input.temperature,
            input.communication_status
        );
        Ok(result)
    }
}

fn check_input(input: &RiskScoreInput) -> Result<(), Violations> {
    let mut violations = match schema::validate_typed(&RISK_SCORE_INPUT, input) {
        Ok(()) => Violations::default(),
        Err(v) => v,
    };

    if input.battery_level.is_nan() {
        violations.0.push(Violation {
            field: "batteryLevel".to_string(),
            kind: ViolationKind::WrongType { expected: "number" },
        });
    }
    if !input.temperature.is_finite() {
        violations.0.push(Violation {
            field: "temperature".to_string(),
            kind: ViolationKind::WrongType { expected: "finite number" },
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
