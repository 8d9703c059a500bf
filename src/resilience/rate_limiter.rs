//! # Token Bucket Rate Limiter
//!
//! Bounds the outbound request rate. The bucket holds up to `max_requests`
//! tokens and refills continuously at `max_requests / time_window` tokens per
//! second; every admitted request consumes one token.
//!
//! The bucket is guarded by a synchronous mutex that is only held while the
//! ledger is read or updated. Waiting callers release it before sleeping, so
//! any number of tasks can queue on one limiter. No admission order is
//! guaranteed between waiters.

use crate::config::{ConfigResult, ConfigurationError};
use crate::resilience::RateLimiterConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const MIN_WAIT: Duration = Duration::from_millis(1);

/// Mutable ledger state
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, capacity: f64, refill_rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }
}

/// Point-in-time limiter statistics for external sampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterStats {
    pub capacity: u32,
    pub available_tokens: f64,
    /// Tokens handed out since construction
    pub total_acquired: u64,
    /// Acquisitions that had to suspend at least once
    pub total_waited: u64,
}

/// Async token bucket shared by every caller of one upstream API
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    refill_rate: f64,
    bucket: Mutex<Bucket>,
    total_acquired: AtomicU64,
    total_waited: AtomicU64,
}

impl RateLimiter {
    /// Create a full bucket, rejecting a config that fails
    /// [`RateLimiterConfig::validate`]
    pub fn new(config: RateLimiterConfig) -> ConfigResult<Self> {
        config.validate().map_err(|reason| {
            ConfigurationError::invalid_value(
                "rate_limiter",
                format!("{} per {:?}", config.max_requests, config.time_window),
                reason,
            )
        })?;

        info!(
            max_requests = config.max_requests,
            time_window_ms = config.time_window.as_millis() as u64,
            "Rate limiter initialized"
        );

        Ok(Self {
            config,
            refill_rate: config.refill_rate(),
            bucket: Mutex::new(Bucket {
                tokens: f64::from(config.max_requests),
                last_refill: Instant::now(),
            }),
            total_acquired: AtomicU64::new(0),
            total_waited: AtomicU64::new(0),
        })
    }

    /// Shorthand for `RateLimiter::new(RateLimiterConfig::new(..))`
    pub fn with_limits(max_requests: u32, time_window: Duration) -> ConfigResult<Self> {
        Self::new(RateLimiterConfig::new(max_requests, time_window))
    }

    fn capacity_f64(&self) -> f64 {
        f64::from(self.config.max_requests)
    }

    pub fn capacity(&self) -> u32 {
        self.config.max_requests
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Take one token, suspending until one is available.
    ///
    /// Never fails. Callers that need a bounded wait wrap this in
    /// `tokio::time::timeout`; cancelling the future never consumes a token.
    pub async fn acquire(&self) {
        let mut waited = false;

        loop {
            let wait = {
                let mut bucket = self.bucket.lock();
                bucket.refill(self.capacity_f64(), self.refill_rate, Instant::now());

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    self.total_acquired.fetch_add(1, Ordering::Relaxed);
                    if waited {
                        self.total_waited.fetch_add(1, Ordering::Relaxed);
                    }
                    return;
                }

                // Floor keeps float residue from producing zero-length sleeps
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_rate)
                    .max(MIN_WAIT)
            };

            debug!(
                wait_ms = wait.as_secs_f64() * 1000.0,
                "Rate limiter exhausted, waiting for refill"
            );
            waited = true;
            tokio::time::sleep(wait).await;
        }
    }

    /// Take one token if available without suspending
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock();
        bucket.refill(self.capacity_f64(), self.refill_rate, Instant::now());

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            self.total_acquired.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Restore the bucket to full capacity
    pub fn reset(&self) {
        let mut bucket = self.bucket.lock();
        bucket.tokens = self.capacity_f64();
        bucket.last_refill = Instant::now();
    }

    /// Currently available tokens, possibly fractional.
    ///
    /// Performs the same refill `acquire` would, so the value reflects time
    /// elapsed since the last call. The refill is idempotent with respect to
    /// admission: it never adds tokens that would not otherwise exist.
    pub fn available_tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock();
        bucket.refill(self.capacity_f64(), self.refill_rate, Instant::now());
        bucket.tokens
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            capacity: self.config.max_requests,
            available_tokens: self.available_tokens(),
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_waited: self.total_waited.load(Ordering::Relaxed),
        }
    }
}
