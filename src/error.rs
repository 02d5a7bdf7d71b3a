//! Error handling
//!
//! The HTTP boundary is the only place a failure becomes a status code.

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::ai::AiErrorKind;
use crate::services::ServiceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Client errors
    ValidationError(String),
    NotFound(String),

    // AI service errors
    InvalidCredentials(String),
    RateLimited(String),
    ExternalServiceError(String),
    InvalidModelResponse(String),

    // Telemetry store errors
    DatabaseError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidCredentials(msg) => {
                tracing::warn!("AI credential rejected: {}", msg);
                (StatusCode::UNAUTHORIZED, "AI service credential is invalid or missing".to_string())
            }
            AppError::RateLimited(msg) => {
                tracing::warn!("AI rate limit: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "AI service rate limit reached, try again later".to_string())
            }
            AppError::ExternalServiceError(msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "AI service is unavailable".to_string())
            }
            AppError::InvalidModelResponse(msg) => {
                tracing::error!("Invalid model response: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "AI service returned an invalid response".to_string())
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Telemetry store error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Validation(violations) => AppError::ValidationError(violations.to_string()),
            ServiceError::NotFound { .. } => AppError::NotFound(message),
            ServiceError::AiInvocation { source, .. } => match source.kind {
                AiErrorKind::InvalidCredential => AppError::InvalidCredentials(message),
                AiErrorKind::RateLimited => AppError::RateLimited(message),
                AiErrorKind::Network | AiErrorKind::Upstream => AppError::ExternalServiceError(message),
            },
            ServiceError::AiResponse { .. } => AppError::InvalidModelResponse(message),
            ServiceError::Telemetry { .. } => AppError::DatabaseError(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiInvocationError;
    use crate::schema::{ViolationKind, Violations};
    use serde_json::Value;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn invocation(kind: AiErrorKind) -> ServiceError {
        ServiceError::AiInvocation {
            context: "risk score".to_string(),
            source: AiInvocationError::new(kind, "detail"),
        }
    }

    #[tokio::test]
    async fn test_validation_is_bad_request() {
        let err = ServiceError::Validation(Violations::single("batteryLevel", ViolationKind::Missing));
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "batteryLevel is required");
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_not_found_names_satellite() {
        let err = ServiceError::NotFound { satellite_id: "sat-x".to_string() };
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("sat-x"));
    }

    #[tokio::test]
    async fn test_ai_failures_by_kind() {
        let (status, _) = render(invocation(AiErrorKind::InvalidCredential).into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = render(invocation(AiErrorKind::RateLimited).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("rate limit"));

        let (status, _) = render(invocation(AiErrorKind::Network).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_model_response_is_server_error() {
        let err = ServiceError::AiResponse {
            context: "risk score".to_string(),
            violations: Violations::single("riskScore", ViolationKind::Missing),
        };
        let (status, body) = render(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "AI service returned an invalid response");
    }
}
