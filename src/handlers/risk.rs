//! Risk score handler

use axum::{extract::{rejection::JsonRejection, State}, Json};
use serde_json::Value;

use crate::{AppState, AppResult};
use crate::models::{RiskScoreInput, RiskScoreResult};
use crate::schema::{self, RISK_SCORE_INPUT};
use crate::services::ServiceError;

/// Score a risk input supplied by the dashboard
pub async fn compute(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<RiskScoreResult>> {
    let Json(payload) = payload?;

    let input: RiskScoreInput = schema::validate_payload(&RISK_SCORE_INPUT, &payload)
        .map_err(ServiceError::Validation)?;

    let result = state.risk.compute_risk_score(&input).await?;
    Ok(Json(result))
}
