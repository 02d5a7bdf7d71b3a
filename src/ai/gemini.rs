//! Gemini API client
//!
//! Calls `generateContent` with a JSON response schema and hands back whatever
//! the model produced as untyped JSON.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AiErrorKind, AiInvocationError, CompletionClient};
use crate::schema::Schema;

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_seconds: 30,
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

impl GeminiClient {
    /// Create new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, http_client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete_structured(&self, prompt: &str, schema: &Schema) -> Result<Value, AiInvocationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiInvocationError::new(AiErrorKind::InvalidCredential, "AI API key is not configured"))?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema.response_schema(),
            },
        };

        tracing::debug!("Requesting {} completion from {}", schema.name, self.config.model);

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiInvocationError::new(AiErrorKind::Network, e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_failure(status, &body);
            tracing::warn!("Completion failed ({}): {}", status, error);
            return Err(error);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiInvocationError::new(AiErrorKind::Upstream, format!("unreadable response: {}", e)))?;

        Ok(extract_output(body))
    }
}

/// Classify a non-2xx reply from its status and error envelope
fn classify_failure(status: u16, body: &str) -> AiInvocationError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    let key_rejected = envelope.as_ref().is_some_and(|e| {
        e.status == "UNAUTHENTICATED"
            || e.status == "PERMISSION_DENIED"
            || e.details.iter().any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
    });
    let exhausted = envelope.as_ref().is_some_and(|e| e.status == "RESOURCE_EXHAUSTED");

    let kind = match status {
        401 | 403 => AiErrorKind::InvalidCredential,
        429 => AiErrorKind::RateLimited,
        _ if key_rejected => AiErrorKind::InvalidCredential,
        _ if exhausted => AiErrorKind::RateLimited,
        _ => AiErrorKind::Upstream,
    };

    let detail = match envelope {
        Some(e) if !e.message.is_empty() => format!("HTTP {}: {}", status, e.message),
        _ => format!("HTTP {}", status),
    };

    AiInvocationError::new(kind, detail)
}

/// Pull the model's JSON out of the first candidate.
///
/// No candidate yields `Null` and text that is not JSON is returned as a
/// string; both then fail output validation rather than the invocation.
fn extract_output(response: GenerateContentResponse) -> Value {
    let Some(content) = response.candidates.into_iter().next().and_then(|c| c.content) else {
        return Value::Null;
    };

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Value::Null;
    }

    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_key_is_credential_failure() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{ "reason": "API_KEY_INVALID" }]
            }
        })
        .to_string();

        let err = classify_failure(400, &body);
        assert_eq!(err.kind, AiErrorKind::InvalidCredential);
        assert!(err.detail.contains("API key not valid"));
    }

    #[test]
    fn test_status_codes_classified() {
        assert_eq!(classify_failure(401, "").kind, AiErrorKind::InvalidCredential);
        assert_eq!(classify_failure(403, "").kind, AiErrorKind::InvalidCredential);
        assert_eq!(classify_failure(429, "").kind, AiErrorKind::RateLimited);
        assert_eq!(classify_failure(500, "upstream down").kind, AiErrorKind::Upstream);
        assert_eq!(classify_failure(400, "{}").kind, AiErrorKind::Upstream);

        let quota = json!({ "error": { "status": "RESOURCE_EXHAUSTED", "message": "quota" } }).to_string();
        assert_eq!(classify_failure(503, &quota).kind, AiErrorKind::RateLimited);
    }

    #[test]
    fn test_extract_output_parses_json_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"riskScore\": 40, " }, { "text": "\"explanation\": \"ok\"}" }] }
            }]
        }))
        .unwrap();

        assert_eq!(extract_output(response), json!({ "riskScore": 40, "explanation": "ok" }));
    }

    #[test]
    fn test_extract_output_without_json() {
        assert_eq!(extract_output(GenerateContentResponse::default()), Value::Null);

        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot help with that" }] } }]
        }))
        .unwrap();
        assert_eq!(extract_output(response), json!("I cannot help with that"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();

        let err = client
            .complete_structured("hello", &crate::schema::RISK_SCORE_OUTPUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, AiErrorKind::InvalidCredential);
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();

        assert_eq!(client.endpoint(), "http://localhost:9000/v1beta/models/gemini-2.0-flash:generateContent");
        assert_eq!(client.model(), "gemini-2.0-flash");
    }
}
