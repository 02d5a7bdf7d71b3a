//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::ai::GeminiConfig;
use crate::normalizer::VoltageRange;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Telemetry store connection URL; in-memory store when unset
    pub database_url: Option<String>,

    /// JSON file of records to preload into the in-memory store
    pub telemetry_seed_file: Option<PathBuf>,

    /// AI model API key
    pub ai_api_key: Option<String>,

    /// AI model name
    pub ai_model: String,

    /// AI API base URL
    pub ai_base_url: String,

    /// AI request timeout in seconds
    pub ai_timeout_seconds: u64,

    /// Voltage range mapped to 0-100% battery
    pub battery_range: VoltageRange,

    /// "json" for structured log lines
    pub log_format: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let ai_defaults = GeminiConfig::default();
        let battery_defaults = VoltageRange::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            database_url: non_empty_var("DATABASE_URL"),

            telemetry_seed_file: non_empty_var("TELEMETRY_SEED_FILE").map(PathBuf::from),

            ai_api_key: non_empty_var("AI_API_KEY").or_else(|| non_empty_var("GEMINI_API_KEY")),

            ai_model: env::var("AI_MODEL")
                .unwrap_or(ai_defaults.model),

            ai_base_url: env::var("AI_BASE_URL")
                .unwrap_or(ai_defaults.base_url),

            ai_timeout_seconds: env::var("AI_TIMEOUT_SECONDS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(ai_defaults.timeout_seconds),

            battery_range: VoltageRange {
                min_voltage: env::var("BATTERY_MIN_VOLTAGE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(battery_defaults.min_voltage),
                max_voltage: env::var("BATTERY_MAX_VOLTAGE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(battery_defaults.max_voltage),
            },

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.ai_api_key.clone(),
            model: self.ai_model.clone(),
            base_url: self.ai_base_url.clone(),
            timeout_seconds: self.ai_timeout_seconds,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
