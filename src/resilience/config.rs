//! # Resilience Configuration
//!
//! Runtime parameters for the rate limiter and circuit breakers. These are the
//! resolved, `Duration`-based forms; the file/environment representation lives in
//! [`crate::config`] and converts into these.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token bucket parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Bucket capacity and maximum burst size
    pub max_requests: u32,

    /// Time over which `max_requests` tokens fully replenish
    pub time_window: Duration,
}

impl RateLimiterConfig {
    pub fn new(max_requests: u32, time_window: Duration) -> Self {
        Self {
            max_requests,
            time_window,
        }
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        f64::from(self.max_requests) / self.time_window.as_secs_f64()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be greater than 0".to_string());
        }

        if self.time_window.is_zero() {
            return Err("time_window must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            time_window: Duration::from_secs(60),
        }
    }
}

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate (0.0-1.0] within the window that opens the circuit
    pub failure_threshold: f64,

    /// Time to wait in open state before probing recovery
    pub timeout: Duration,

    /// Requests required in the window before the failure rate is evaluated
    pub minimum_requests: u32,

    /// Consecutive half-open successes needed to close the circuit
    pub success_threshold: u32,

    /// Sliding window over which outcomes are retained
    pub window: Duration,

    /// Trial calls allowed in flight at once while half-open
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_minimum_requests(mut self, minimum_requests: u32) -> Self {
        self.minimum_requests = minimum_requests;
        self
    }

    pub fn with_success_threshold(mut self, success_threshold: u32) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_half_open_max_calls(mut self, half_open_max_calls: u32) -> Self {
        self.half_open_max_calls = half_open_max_calls;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(self.failure_threshold > 0.0 && self.failure_threshold <= 1.0) {
            return Err("failure_threshold must be within (0.0, 1.0]".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.minimum_requests == 0 {
            return Err("minimum_requests must be greater than 0".to_string());
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if self.window.is_zero() {
            return Err("window must be greater than 0".to_string());
        }

        if self.half_open_max_calls == 0 {
            return Err("half_open_max_calls must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            timeout: Duration::from_secs(30),
            minimum_requests: 10,
            success_threshold: 3,
            window: Duration::from_secs(300),
            half_open_max_calls: 3,
        }
    }
}
