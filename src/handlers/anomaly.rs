//! Anomaly explanation handler

use axum::{extract::{rejection::JsonRejection, State}, Json};
use serde_json::Value;

use crate::{AppState, AppResult};
use crate::models::{AnomalyExplanationRequest, AnomalyExplanationResult};
use crate::schema::{self, ANOMALY_EXPLANATION_INPUT};
use crate::services::ServiceError;

pub async fn explain(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<AnomalyExplanationResult>> {
    let Json(payload) = payload?;

    let request: AnomalyExplanationRequest = schema::validate_payload(&ANOMALY_EXPLANATION_INPUT, &payload)
        .map_err(ServiceError::Validation)?;

    let result = state.anomaly.explain_anomaly(&request.satellite_id).await?;
    Ok(Json(result))
}
