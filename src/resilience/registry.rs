//! # Circuit Breaker Registry
//!
//! One breaker per logical endpoint, created lazily and shared by every caller
//! through an `Arc`. Endpoints named in configuration are pre-registered so
//! their state is reportable before the first request.

use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RegistryMetrics};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Create a registry with breakers already in place for `endpoints`
    pub fn from_config<I, S>(config: CircuitBreakerConfig, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new(config);
        for endpoint in endpoints {
            registry.get_or_create(&endpoint.into());
        }

        info!(
            endpoints = registry.breakers.len(),
            "Circuit breaker registry initialized"
        );
        registry
    }

    /// Get or create the breaker for an endpoint
    pub fn get_or_create(&self, endpoint: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(endpoint) {
            return Arc::clone(breaker.value());
        }

        // The entry API settles races between concurrent creators
        let breaker = self
            .breakers
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(endpoint, self.config)));
        Arc::clone(breaker.value())
    }

    pub fn get(&self, endpoint: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .get(endpoint)
            .map(|breaker| Arc::clone(breaker.value()))
    }

    /// State ordinal for an endpoint; 0 (closed) when it has no breaker yet
    pub fn state_value(&self, endpoint: &str) -> u8 {
        self.breakers
            .get(endpoint)
            .map_or(0, |breaker| breaker.state_value())
    }

    /// Registered endpoint names, sorted
    pub fn endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// `(endpoint, state)` for every registered breaker, sorted by endpoint
    pub fn snapshot(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<(String, CircuitState)> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn metrics(&self) -> RegistryMetrics {
        let circuit_breakers = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().metrics()))
            .collect();

        RegistryMetrics { circuit_breakers }
    }

    /// Return every breaker to a fresh closed state
    pub fn reset_all(&self) {
        warn!(count = self.breakers.len(), "Resetting all circuit breakers");
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
