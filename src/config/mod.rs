//! # Harness Configuration
//!
//! Serde representation of every tunable: API access, rate limiting, circuit
//! breaking, the response cache database and telemetry. All sections have
//! defaults, so an empty file (or no file at all) is a valid configuration.
//! [`ConfigManager`] layers a TOML file and `POKEAPI_QA__SECTION__KEY`
//! environment variables on top.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::client::ApiClientConfig;
use crate::resilience::{CircuitBreakerConfig, RateLimiterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl HarnessConfig {
    /// Validate every section, reporting the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        self.api.validate()?;
        self.rate_limit.to_rate_limiter_config()?;
        self.circuit_breaker.to_circuit_breaker_config()?;
        self.database.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt for 429, 5xx and network failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Backoff unit: retry `n` waits `2^n` units plus jitter
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to every retry wait
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    /// Ceiling on a server-supplied `Retry-After` wait
    #[serde(default = "default_max_retry_after_ms")]
    pub max_retry_after_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            max_retry_after_ms: default_max_retry_after_ms(),
        }
    }
}

impl ApiConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "api.base_url",
                &self.base_url,
                "must not be empty",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "api.timeout_ms",
                self.timeout_ms,
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn to_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            user_agent: self.user_agent.clone(),
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
            max_retry_after: Duration::from_millis(self.max_retry_after_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_time_window_seconds")]
    pub time_window_seconds: f64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            time_window_seconds: default_time_window_seconds(),
        }
    }
}

impl RateLimitSettings {
    pub fn to_rate_limiter_config(&self) -> ConfigResult<RateLimiterConfig> {
        let config = RateLimiterConfig::new(
            self.max_requests,
            positive_seconds("rate_limit.time_window_seconds", self.time_window_seconds)?,
        );
        config
            .validate()
            .map_err(|e| ConfigurationError::invalid_value("rate_limit", self.max_requests, e))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,

    /// Cooldown before an open circuit admits a trial call
    #[serde(default = "default_cb_timeout_seconds")]
    pub timeout_seconds: f64,

    #[serde(default = "default_minimum_requests")]
    pub minimum_requests: u32,

    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    /// Concurrent trial calls admitted while half-open
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,

    /// Endpoints whose breakers exist from startup
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            timeout_seconds: default_cb_timeout_seconds(),
            minimum_requests: default_minimum_requests(),
            success_threshold: default_success_threshold(),
            window_seconds: default_window_seconds(),
            half_open_max_calls: default_half_open_max_calls(),
            endpoints: default_endpoints(),
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_circuit_breaker_config(&self) -> ConfigResult<CircuitBreakerConfig> {
        let config = CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: positive_seconds("circuit_breaker.timeout_seconds", self.timeout_seconds)?,
            minimum_requests: self.minimum_requests,
            success_threshold: self.success_threshold,
            window: positive_seconds("circuit_breaker.window_seconds", self.window_seconds)?,
            half_open_max_calls: self.half_open_max_calls,
        };
        config.validate().map_err(|e| {
            ConfigurationError::invalid_value("circuit_breaker", self.failure_threshold, e)
        })?;
        Ok(config)
    }
}

/// PostgreSQL connection settings for the response cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub database: String,
    #[serde(default = "default_db_user")]
    pub username: String,
    #[serde(default = "default_db_user")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Full connection URL; takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            database: default_db_name(),
            username: default_db_user(),
            password: default_db_user(),
            max_connections: default_max_connections(),
            url: None,
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                self.max_connections,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn positive_seconds(field: &str, seconds: f64) -> ConfigResult<Duration> {
    if seconds.is_nan() || seconds <= 0.0 {
        return Err(ConfigurationError::invalid_value(
            field,
            seconds,
            "must be greater than 0",
        ));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| ConfigurationError::invalid_value(field, seconds, e.to_string()))
}

fn default_base_url() -> String {
    "https://pokeapi.co/api/v2".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    concat!("pokeapi-qa-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_max_jitter_ms() -> u64 {
    1_000
}

fn default_max_retry_after_ms() -> u64 {
    60_000
}

fn default_max_requests() -> u32 {
    100
}

fn default_time_window_seconds() -> f64 {
    60.0
}

fn default_failure_threshold() -> f64 {
    0.5
}

fn default_cb_timeout_seconds() -> f64 {
    30.0
}

fn default_minimum_requests() -> u32 {
    10
}

fn default_success_threshold() -> u32 {
    3
}

fn default_window_seconds() -> f64 {
    300.0
}

fn default_half_open_max_calls() -> u32 {
    3
}

fn default_endpoints() -> Vec<String> {
    vec!["pokemon".to_string(), "type".to_string(), "ability".to_string()]
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "pokeapi_cache".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
