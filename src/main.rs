//! SatWatch Server
//!
//! Satellite telemetry risk scoring and anomaly explanation for the
//! operations dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SATWATCH                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────────────────┐ │
//! │  │  API      │  │  Normalizer  │  │  Risk / Anomaly      │ │
//! │  │  (Axum)   │  │  (pure)      │  │  Services            │ │
//! │  └─────┬─────┘  └──────┬───────┘  └─────┬──────────┬─────┘ │
//! │        └───────────────┼────────────────┘          │       │
//! │                        ▼                           ▼       │
//! │              ┌──────────────────┐        ┌──────────────┐  │
//! │              │ Telemetry store  │        │  AI model    │  │
//! │              │ (Postgres / mem) │        │  (Gemini)    │  │
//! │              └──────────────────┘        └──────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod ai;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod normalizer;
mod prompts;
mod schema;
mod services;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ai::{CompletionClient, GeminiClient};
use services::{AnomalyExplanationService, RiskScoreService};
use telemetry::{MemoryTelemetrySource, PgTelemetrySource, TelemetrySource};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(&config);

    tracing::info!("SatWatch server starting...");

    let (source, store_kind): (Arc<dyn TelemetrySource>, &'static str) = match &config.database_url {
        Some(url) => {
            tracing::info!("Telemetry store: {}", url.split('@').last().unwrap_or("***"));

            let pool = db::create_pool(url).await
                .context("failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await
                .context("failed to run migrations")?;

            (Arc::new(PgTelemetrySource::new(pool)), "postgres")
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory telemetry store");
            let store = match &config.telemetry_seed_file {
                Some(path) => MemoryTelemetrySource::from_seed_file(path)?,
                None => MemoryTelemetrySource::new(),
            };
            (Arc::new(store), "memory")
        }
    };

    let client = GeminiClient::new(config.gemini())
        .context("failed to build AI HTTP client")?;
    if config.ai_api_key.is_none() {
        tracing::warn!("AI_API_KEY not set; AI requests will be rejected as unauthorized");
    }
    tracing::info!("AI model: {}", client.model());

    // Build application state
    let state = AppState::new(config.clone(), source, Arc::new(client), store_kind);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &config::Config) {
    let default_filter = if config.is_production() {
        "satwatch=info,tower_http=info"
    } else {
        "satwatch=debug,tower_http=debug"
    };
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()));

    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub source: Arc<dyn TelemetrySource>,
    pub risk: RiskScoreService,
    pub anomaly: AnomalyExplanationService,
    pub store_kind: &'static str,
}

impl AppState {
    pub fn new(
        config: config::Config,
        source: Arc<dyn TelemetrySource>,
        client: Arc<dyn CompletionClient>,
        store_kind: &'static str,
    ) -> Self {
        Self {
            risk: RiskScoreService::new(client.clone()),
            anomaly: AnomalyExplanationService::new(client, source.clone()),
            config,
            source,
            store_kind,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // AI pipeline
        .route("/risk-score", post(handlers::risk::compute))
        .route("/anomaly-explanation", post(handlers::anomaly::explain))

        // Dashboard telemetry
        .route("/satellites/:id/telemetry", get(handlers::telemetry::snapshot))
        .route("/satellites/:id/telemetry/stream", get(handlers::telemetry::stream))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiErrorKind, AiInvocationError};
    use crate::models::TelemetryRecord;
    use crate::schema::Schema;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use tower::ServiceExt;

    /// Answers each schema with a fixed reply
    struct FakeModel {
        failure: Option<AiErrorKind>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionClient for FakeModel {
        async fn complete_structured(&self, _prompt: &str, schema: &Schema) -> Result<Value, AiInvocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(kind) = self.failure {
                return Err(AiInvocationError::new(kind, "scripted failure"));
            }
            Ok(match schema.name {
                "RiskScoreOutput" => json!({ "riskScore": 64, "explanation": "Link is unstable." }),
                _ => json!({
                    "explanation": "Weak signal and long packet delay.",
                    "breakdown": { "thermal": 5, "comm": 80, "power": 10, "orientation": 5 }
                }),
            })
        }
    }

    fn test_app(failure: Option<AiErrorKind>) -> (Router, Arc<MemoryTelemetrySource>, Arc<FakeModel>) {
        let store = Arc::new(MemoryTelemetrySource::new());
        let model = Arc::new(FakeModel { failure, calls: AtomicUsize::new(0) });
        let state = AppState::new(config::Config::from_env(), store.clone(), model.clone(), "memory");
        (create_router(state), store, model)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn weak_link_record() -> TelemetryRecord {
        let mut record = TelemetryRecord::placeholder("sat-1");
        record.battery_voltage = 3.85;
        record.internal_temperature = 22.0;
        record.communication_logs.signal_strength = -92.0;
        record.communication_logs.packet_delay = 280.0;
        record
    }

    #[tokio::test]
    async fn test_risk_score_round_trip() {
        let (app, _, _) = test_app(None);

        let response = app
            .oneshot(post_json(
                "/risk-score",
                r#"{"batteryLevel": 55, "temperature": 21.5, "communicationStatus": "unstable"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body, json!({ "riskScore": 64.0, "explanation": "Link is unstable." }));
    }

    #[tokio::test]
    async fn test_risk_score_rejects_bad_payload() {
        let (app, _, model) = test_app(None);

        let response = app
            .oneshot(post_json("/risk-score", r#"{"temperature": 21.5, "communicationStatus": "offline"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("batteryLevel is required"));
        assert!(message.contains("communicationStatus must be one of"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (app, _, _) = test_app(None);

        let response = app.oneshot(post_json("/risk-score", "{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_anomaly_explanation_for_known_satellite() {
        let (app, store, _) = test_app(None);
        store.publish("sat-1", weak_link_record());

        let response = app
            .oneshot(post_json("/anomaly-explanation", r#"{"satelliteId": "sat-1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["breakdown"]["comm"], json!(80.0));
    }

    #[tokio::test]
    async fn test_anomaly_explanation_unknown_satellite() {
        let (app, _, _) = test_app(None);

        let response = app
            .oneshot(post_json("/anomaly-explanation", r#"{"satelliteId": "unknown-sat-id"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(read_json(response).await["error"].as_str().unwrap().contains("unknown-sat-id"));
    }

    #[tokio::test]
    async fn test_invalid_credential_is_unauthorized() {
        let (app, store, _) = test_app(Some(AiErrorKind::InvalidCredential));
        store.publish("sat-1", weak_link_record());

        let response = app
            .oneshot(post_json("/anomaly-explanation", r#"{"satelliteId": "sat-1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_snapshot_flags_missing_record() {
        let (app, _, _) = test_app(None);

        let request = Request::builder().uri("/satellites/sat-404/telemetry").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["noData"], json!(true));
        assert_eq!(body["communicationStatus"], json!("unknown"));
        assert_eq!(body["batteryPercent"], json!(0));
    }

    #[tokio::test]
    async fn test_snapshot_normalizes_record() {
        let (app, store, _) = test_app(None);
        store.publish("sat-1", weak_link_record());

        let request = Request::builder().uri("/satellites/sat-1/telemetry").body(Body::empty()).unwrap();
        let body = read_json(app.oneshot(request).await.unwrap()).await;

        assert_eq!(body["noData"], json!(false));
        assert_eq!(body["batteryPercent"], json!(50));
        assert_eq!(body["temperature"], json!(22.0));
        assert_eq!(body["communicationStatus"], json!("unstable"));
        assert_eq!(body["riskInput"]["communicationStatus"], json!("unstable"));
    }

    #[tokio::test]
    async fn test_stream_sends_current_snapshot() {
        let (app, store, _) = test_app(None);
        store.publish("sat-1", weak_link_record());

        let request = Request::builder().uri("/satellites/sat-1/telemetry/stream").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .expect("no event within timeout")
            .expect("stream ended")
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();

        assert!(text.contains("event: telemetry"));
        assert!(text.contains("\"satelliteId\":\"sat-1\""));
    }

    #[tokio::test]
    async fn test_stream_skips_superseded_records() {
        let (app, store, _) = test_app(None);
        store.publish("sat-1", weak_link_record());

        let request = Request::builder().uri("/satellites/sat-1/telemetry/stream").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let mut body = response.into_body().into_data_stream();

        // Client falls behind while five records arrive
        for voltage in [3.6, 3.7, 3.8, 3.9, 4.0] {
            let mut record = weak_link_record();
            record.battery_voltage = voltage;
            store.publish("sat-1", record);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .expect("no event within timeout")
            .expect("stream ended")
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert_eq!(text.matches("event: telemetry").count(), 1);
        assert!(text.contains("\"batteryPercent\":71"));

        let backlog = tokio::time::timeout(Duration::from_millis(100), body.next()).await;
        assert!(backlog.is_err());
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _) = test_app(None);

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let body = read_json(app.oneshot(request).await.unwrap()).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["telemetry_store"], "memory");
    }
}
