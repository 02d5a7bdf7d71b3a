//! Structured completion client
//!
//! Services receive an explicit client handle at construction; the model is
//! an opaque function from prompt + output schema to untyped JSON.

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::schema::Schema;

pub use gemini::{GeminiClient, GeminiConfig};

/// Why a completion call failed, decided where the failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiErrorKind {
    InvalidCredential,
    RateLimited,
    Network,
    Upstream,
}

impl AiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid credential",
            Self::RateLimited => "rate limited",
            Self::Network => "network failure",
            Self::Upstream => "upstream error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("AI invocation failed ({}): {detail}", .kind.as_str())]
pub struct AiInvocationError {
    pub kind: AiErrorKind,
    pub detail: String,
}

impl AiInvocationError {
    pub fn new(kind: AiErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Ask the model for output conforming to `schema`.
    ///
    /// The returned JSON is untrusted and must be validated by the caller.
    async fn complete_structured(&self, prompt: &str, schema: &Schema) -> Result<Value, AiInvocationError>;
}
