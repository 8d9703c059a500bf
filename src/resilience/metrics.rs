//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshots of breaker state for monitoring and logging.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Snapshot of a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Endpoint the breaker guards
    pub name: String,

    /// Current circuit breaker state
    pub state: CircuitState,

    /// Outcomes currently inside the sliding window
    pub requests_in_window: usize,

    /// Failed outcomes currently inside the sliding window
    pub failures_in_window: usize,

    /// Raw failure rate over the window (0.0 to 1.0), regardless of minimum_requests
    pub failure_rate: f64,

    /// Half-open trial successes in a row
    pub consecutive_successes: u32,

    /// Lifetime success count, not bounded by the window
    pub total_successes: u64,

    /// Lifetime failure count, not bounded by the window
    pub total_failures: u64,

    /// How long the circuit has been open, if it is open
    pub open_for: Option<Duration>,

    pub since_last_failure: Option<Duration>,
}

impl CircuitBreakerMetrics {
    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true, // Half-open is attempting recovery
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing endpoint health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "{}: {} | Window: {} requests, {:.1}% failing | Lifetime: {} ok / {} failed",
            self.name,
            self.state_description(),
            self.requests_in_window,
            self.failure_rate * 100.0,
            self.total_successes,
            self.total_failures
        )
    }
}

/// Snapshot across every registered breaker, keyed by endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetrics {
    pub circuit_breakers: BTreeMap<String, CircuitBreakerMetrics>,
}

impl RegistryMetrics {
    /// Endpoints whose circuit is currently open
    pub fn open_circuits(&self) -> Vec<&str> {
        self.circuit_breakers
            .values()
            .filter(|metrics| metrics.state == CircuitState::Open)
            .map(|metrics| metrics.name.as_str())
            .collect()
    }

    /// Fraction of breakers that are healthy (1.0 when there are none)
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }

        let healthy_count = self
            .circuit_breakers
            .values()
            .filter(|metrics| metrics.is_healthy())
            .count();

        healthy_count as f64 / self.circuit_breakers.len() as f64
    }
}
