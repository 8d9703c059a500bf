//! Metrics sink for client-observed request outcomes.
//!
//! The resilience components never push metrics themselves; the client reports
//! what it sees through this trait and an exporter forwards it.

use dashmap::DashMap;
use std::time::Duration;

/// Metrics collection trait for integration with monitoring systems
pub trait MetricsCollector: Send + Sync {
    /// A request completed successfully
    fn increment_request_counter(&self, endpoint: &str);

    /// A request failed; `reason` is e.g. `http_503`, `network_error` or `circuit_open`
    fn increment_failure_counter(&self, endpoint: &str, reason: &str);

    fn record_latency(&self, endpoint: &str, duration: Duration);

    /// Circuit breaker state ordinal after a request (0 closed, 1 open, 2 half-open)
    fn record_circuit_state(&self, endpoint: &str, state: u8);
}

/// Emits every metric as a structured log event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsCollector;

impl MetricsCollector for TracingMetricsCollector {
    fn increment_request_counter(&self, endpoint: &str) {
        tracing::debug!(endpoint, "Request succeeded");
    }

    fn increment_failure_counter(&self, endpoint: &str, reason: &str) {
        tracing::info!(endpoint, reason, "Request failed");
    }

    fn record_latency(&self, endpoint: &str, duration: Duration) {
        tracing::debug!(
            endpoint,
            duration_ms = duration.as_millis() as u64,
            "Request latency"
        );
    }

    fn record_circuit_state(&self, endpoint: &str, state: u8) {
        tracing::trace!(endpoint, state, "Circuit breaker state");
    }
}

/// Counters held in memory, for assertions and periodic export
#[derive(Debug, Default)]
pub struct InMemoryMetricsCollector {
    requests: DashMap<String, u64>,
    failures: DashMap<(String, String), u64>,
    latencies: DashMap<String, Vec<Duration>>,
    circuit_states: DashMap<String, u8>,
}

impl InMemoryMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self, endpoint: &str) -> u64 {
        self.requests.get(endpoint).map_or(0, |count| *count)
    }

    pub fn failure_count(&self, endpoint: &str, reason: &str) -> u64 {
        self.failures
            .get(&(endpoint.to_string(), reason.to_string()))
            .map_or(0, |count| *count)
    }

    /// Failures for an endpoint across every reason
    pub fn total_failures(&self, endpoint: &str) -> u64 {
        self.failures
            .iter()
            .filter(|entry| entry.key().0 == endpoint)
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn latency_samples(&self, endpoint: &str) -> usize {
        self.latencies.get(endpoint).map_or(0, |samples| samples.len())
    }

    pub fn circuit_state(&self, endpoint: &str) -> Option<u8> {
        self.circuit_states.get(endpoint).map(|state| *state)
    }
}

impl MetricsCollector for InMemoryMetricsCollector {
    fn increment_request_counter(&self, endpoint: &str) {
        *self.requests.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    fn increment_failure_counter(&self, endpoint: &str, reason: &str) {
        *self
            .failures
            .entry((endpoint.to_string(), reason.to_string()))
            .or_insert(0) += 1;
    }

    fn record_latency(&self, endpoint: &str, duration: Duration) {
        self.latencies
            .entry(endpoint.to_string())
            .or_default()
            .push(duration);
    }

    fn record_circuit_state(&self, endpoint: &str, state: u8) {
        self.circuit_states.insert(endpoint.to_string(), state);
    }
}
