//! # Structured Logging Module
//!
//! Environment-aware structured logging for harness runs. Console output is
//! human-readable by default or JSON lines for log shippers; `RUST_LOG`
//! always wins over the configured level.

use crate::config::loader::detect_environment;
use crate::config::TelemetryConfig;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with the level implied by the environment
pub fn init_structured_logging() {
    let environment = detect_environment();
    let level = get_log_level(&environment);
    install(&environment, level, false);
}

/// Initialize structured logging from the telemetry section of the configuration
pub fn init_with_config(telemetry: &TelemetryConfig) {
    let environment = detect_environment();
    install(&environment, &telemetry.log_level, telemetry.json_logs);
}

fn install(environment: &str, level: &str, json: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let subscriber = tracing_subscriber::registry()
            .with(json.then(|| {
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false)
                    .with_filter(filter())
            }))
            .with((!json).then(|| {
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_filter(filter())
            }));

        // Use try_init to avoid panic if global subscriber already set
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %level,
            json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "ci" => "info",
        _ => "debug",
    }
}

/// Log one outbound API request and its result
pub fn log_api_request(
    endpoint: &str,
    resource_id: i64,
    status: Option<u16>,
    duration_ms: u64,
    outcome: &str,
) {
    tracing::info!(
        endpoint = %endpoint,
        resource_id,
        status = status,
        duration_ms,
        outcome = %outcome,
        timestamp = %Utc::now().to_rfc3339(),
        "🌐 API_REQUEST"
    );
}

/// Log a circuit breaker state change observed by a caller
pub fn log_circuit_transition(endpoint: &str, from: u8, to: u8) {
    tracing::warn!(
        endpoint = %endpoint,
        from_state = from,
        to_state = to,
        timestamp = %Utc::now().to_rfc3339(),
        "⚡ CIRCUIT_TRANSITION"
    );
}

/// Log a schema drift summary for an endpoint
pub fn log_schema_drift(endpoint: &str, added: usize, removed: usize, modified: usize) {
    tracing::warn!(
        endpoint = %endpoint,
        added,
        removed,
        modified,
        timestamp = %Utc::now().to_rfc3339(),
        "🧬 SCHEMA_DRIFT"
    );
}
