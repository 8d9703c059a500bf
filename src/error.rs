//! # Error Types
//!
//! Crate-wide error handling. Resilience failures stay distinguishable from
//! transport and validation failures so a harness can report an unhealthy
//! endpoint as a blocked check rather than a failed assertion.

use crate::config::ConfigurationError;
use crate::models::ValidationError;
use crate::schema::SchemaError;
use thiserror::Error;

/// Errors surfaced by the harness core
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The endpoint's circuit breaker is open and the cooldown has not elapsed
    #[error("Circuit breaker is open for endpoint: {endpoint}")]
    CircuitOpen { endpoint: String },

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {endpoint}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Request never produced a response (timeout, connection refused, ...)
    #[error("Network error for {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Response validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a failed check should be reported by the surrounding test harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// The check could not run because the endpoint is degraded
    Blocked,
    /// The check ran and failed
    Failed,
}

impl HarnessError {
    pub fn http(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API client should retry the request that produced this error.
    /// 429 is handled separately by the client and is never classified here.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::Network { .. } => true,
            _ => false,
        }
    }

    pub fn outcome(&self) -> TestOutcome {
        if self.is_circuit_open() {
            TestOutcome::Blocked
        } else {
            TestOutcome::Failed
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
