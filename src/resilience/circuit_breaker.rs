//! # Circuit Breaker Implementation
//!
//! Per-endpoint fast-fail admission control. Outcomes are kept in a sliding
//! time window; once enough requests have been seen and the failure rate
//! reaches the threshold the circuit opens, rejects calls for the cooldown,
//! then lets trial calls through until enough consecutive successes close it again.
//!
//! | State    | Transition out                                                  |
//! |----------|-----------------------------------------------------------------|
//! | Closed   | → Open when `failures / total >= failure_threshold` and `total >= minimum_requests` |
//! | Open     | → HalfOpen on the first `call` after `timeout` has elapsed      |
//! | HalfOpen | → Closed after `success_threshold` consecutive successes; → Open on any failure |
//!
//! While half-open at most `half_open_max_calls` trial calls run at once; further
//! calls are rejected as if the circuit were open.
//!
//! The opening condition is evaluated when a failure is recorded. Successes in
//! the closed state only update the window.
//!
//! [`CircuitBreaker::is_open`] is a pure observer: only [`CircuitBreaker::call`]
//! moves an open circuit to half-open once the cooldown is over.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Circuit breaker states, with the ordinals exposed to monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - calls are let through as trial calls
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, the operation was not invoked
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation ran and failed; the original error is carried unchanged
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// The wrapped operation's error, if the operation ran
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::OperationFailed(e) => Some(e),
            Self::CircuitOpen { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// Oldest first
    window: VecDeque<(Instant, Outcome)>,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    total_successes: u64,
    total_failures: u64,
    /// Trial calls admitted in the current half-open period and not yet finished
    trials_in_flight: u32,
    /// Bumped on every entry to half-open so stale trial permits are ignored
    half_open_generation: u64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            consecutive_successes: 0,
            opened_at: None,
            last_failure_at: None,
            total_successes: 0,
            total_failures: 0,
            trials_in_flight: 0,
            half_open_generation: 0,
        }
    }

    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some((recorded_at, _)) = self.window.front() {
            if now.saturating_duration_since(*recorded_at) > window {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// (total, failures) among entries still inside the window, without evicting
    fn counts(&self, now: Instant, window: Duration) -> (usize, usize) {
        self.window
            .iter()
            .filter(|(recorded_at, _)| now.saturating_duration_since(*recorded_at) <= window)
            .fold((0, 0), |(total, failures), (_, outcome)| {
                (total + 1, failures + usize::from(*outcome == Outcome::Failure))
            })
    }
}

/// Slot held by a half-open trial call; released when the call finishes or is dropped
struct TrialPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
}

impl Drop for TrialPermit<'_> {
    fn drop(&mut self) {
        let mut inner = self.breaker.inner.lock();
        if inner.state == CircuitState::HalfOpen && inner.half_open_generation == self.generation {
            inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
        }
    }
}

/// Circuit breaker guarding one logical endpoint
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Endpoint name for logging and metrics
    name: String,

    config: CircuitBreakerConfig,

    /// State, window and counters, serialized under one lock that is never
    /// held across an await
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            minimum_requests = config.minimum_requests,
            timeout_seconds = config.timeout.as_secs_f64(),
            success_threshold = config.success_threshold,
            window_seconds = config.window.as_secs_f64(),
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: Mutex::new(BreakerState::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// Fails fast with [`CircuitBreakerError::CircuitOpen`] while the circuit is
    /// open and cooling down; otherwise runs `operation`, records its outcome and
    /// hands back its result. The lock is released while the operation runs.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _permit = self.admit()?.map(|generation| TrialPermit {
            breaker: self,
            generation,
        });

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    /// Admission check; the only place Open → HalfOpen happens.
    /// Returns the half-open generation when the call is admitted as a trial call.
    fn admit<E>(&self) -> Result<Option<u64>, CircuitBreakerError<E>> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => return Ok(None),
            CircuitState::HalfOpen => {}
            CircuitState::Open => {
                let now = Instant::now();
                let cooled_down = match inner.opened_at {
                    Some(opened_at) => {
                        now.saturating_duration_since(opened_at) >= self.config.timeout
                    }
                    None => {
                        warn!(component = %self.name, "Circuit open but no timestamp recorded");
                        true
                    }
                };

                if !cooled_down {
                    debug!(component = %self.name, "Circuit open, rejecting call");
                    return Err(self.rejected());
                }

                self.transition(&mut inner, CircuitState::HalfOpen, now);
            }
        }

        if inner.trials_in_flight >= self.config.half_open_max_calls {
            debug!(
                component = %self.name,
                trials_in_flight = inner.trials_in_flight,
                "Half-open trial limit reached, rejecting call"
            );
            return Err(self.rejected());
        }

        inner.trials_in_flight += 1;
        Ok(Some(inner.half_open_generation))
    }

    fn rejected<E>(&self) -> CircuitBreakerError<E> {
        CircuitBreakerError::CircuitOpen {
            component: self.name.clone(),
        }
    }

    /// Record a successful outcome
    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.evict(now, self.config.window);
        inner.window.push_back((now, Outcome::Success));
        inner.total_successes += 1;

        match inner.state {
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                debug!(
                    component = %self.name,
                    consecutive_successes = inner.consecutive_successes,
                    success_threshold = self.config.success_threshold,
                    "Half-open trial call succeeded"
                );
                if inner.consecutive_successes >= self.config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed, now);
                }
            }
            CircuitState::Closed => {}
            CircuitState::Open => {
                // A call admitted before the circuit opened finished late
                debug!(component = %self.name, "Success recorded while circuit is open");
            }
        }
    }

    /// Record a failed outcome and open the circuit if warranted
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.evict(now, self.config.window);
        inner.window.push_back((now, Outcome::Failure));
        inner.total_failures += 1;
        inner.last_failure_at = Some(now);

        match inner.state {
            CircuitState::Closed => {
                let (total, failures) = inner.counts(now, self.config.window);
                let failure_rate = failures as f64 / total as f64;
                if total >= self.config.minimum_requests as usize
                    && failure_rate >= self.config.failure_threshold
                {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                // Any failure while probing reopens and restarts the cooldown
                self.transition(&mut inner, CircuitState::Open, now);
            }
            CircuitState::Open => {}
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.consecutive_successes = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(now);
                let (total, failures) = inner.counts(now, self.config.window);
                error!(
                    component = %self.name,
                    from = %from,
                    requests_in_window = total,
                    failures_in_window = failures,
                    timeout_seconds = self.config.timeout.as_secs_f64(),
                    "Circuit breaker opened (failing fast)"
                );
            }
            CircuitState::HalfOpen => {
                inner.half_open_generation += 1;
                inner.trials_in_flight = 0;
                info!(
                    component = %self.name,
                    success_threshold = self.config.success_threshold,
                    "Circuit breaker half-open (testing recovery)"
                );
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                info!(component = %self.name, from = %from, "Circuit breaker closed (recovered)");
            }
        }
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Whether the circuit is open. Never transitions, even after the cooldown.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// State ordinal for monitoring: 0 closed, 1 open, 2 half-open
    pub fn state_value(&self) -> u8 {
        self.state().as_u8()
    }

    /// Failure rate over the current window, 0.0 until `minimum_requests` is reached
    pub fn failure_rate(&self) -> f64 {
        let inner = self.inner.lock();
        let (total, failures) = inner.counts(Instant::now(), self.config.window);
        if total < self.config.minimum_requests as usize {
            0.0
        } else {
            failures as f64 / total as f64
        }
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let now = Instant::now();
        let inner = self.inner.lock();
        let (total, failures) = inner.counts(now, self.config.window);

        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: inner.state,
            requests_in_window: total,
            failures_in_window: failures,
            failure_rate: if total == 0 {
                0.0
            } else {
                failures as f64 / total as f64
            },
            consecutive_successes: inner.consecutive_successes,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            open_for: inner
                .opened_at
                .filter(|_| inner.state == CircuitState::Open)
                .map(|opened_at| now.saturating_duration_since(opened_at)),
            since_last_failure: inner
                .last_failure_at
                .map(|failed_at| now.saturating_duration_since(failed_at)),
        }
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Open, Instant::now());
    }

    /// Back to a fresh closed breaker with an empty window
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.half_open_generation;
        *inner = BreakerState::new();
        inner.half_open_generation = generation;
        info!(component = %self.name, "Circuit breaker reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new("test", CircuitBreakerConfig::default())
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.call(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.call(|| async { Ok::<(), &'static str>(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_closed() {
        let cb = breaker();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.state_value(), 0);
        assert!(!cb.is_open());
        assert!(succeed(&cb).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through_unchanged() {
        let cb = breaker();
        let err = fail(&cb).await.unwrap_err();
        assert!(!err.is_circuit_open());
        assert_eq!(err.into_operation_error(), Some("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_minimum_requests_with_half_failures() {
        let cb = breaker();
        for _ in 0..5 {
            succeed(&cb).await.unwrap();
        }
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        // 10th request, 5/10 failing
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.state_value(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_closed_below_threshold() {
        let cb = breaker();
        for _ in 0..6 {
            succeed(&cb).await.unwrap();
        }
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!((cb.failure_rate() - 0.4).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_closed_below_minimum_requests() {
        let cb = breaker();
        for _ in 0..9 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_rate(), 0.0);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_fast_without_invoking_operation() {
        let cb = breaker();
        cb.force_open();

        let invocations = AtomicUsize::new(0);
        let counter = &invocations;
        let result = cb
            .call(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>("should not execute")
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(cb.metrics().requests_in_window, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_open_does_not_transition_after_cooldown() {
        let cb = breaker();
        cb.force_open();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.is_open());
        assert_eq!(cb.state(), CircuitState::Open);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_success_threshold() {
        let cb = breaker();
        cb.force_open();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(succeed(&cb).await.unwrap_err().is_circuit_open());

        tokio::time::advance(Duration::from_secs(1)).await;
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().open_for, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_and_restarts_cooldown() {
        let cb = breaker();
        cb.force_open();
        tokio::time::advance(Duration::from_secs(30)).await;

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        let err = fail(&cb).await.unwrap_err();
        assert!(!err.is_circuit_open());
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.metrics().consecutive_successes, 0);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(succeed(&cb).await.unwrap_err().is_circuit_open());

        tokio::time::advance(Duration::from_secs(15)).await;
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.state_value(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_older_than_window_are_ignored() {
        let cb = breaker();
        for _ in 0..9 {
            let _ = fail(&cb).await;
        }

        tokio::time::advance(Duration::from_secs(301)).await;

        // Nine stale failures no longer count: only one request in the window
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().requests_in_window, 1);
        assert_eq!(cb.metrics().total_failures, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_six_failures_then_four_successes_sequencing() {
        let cb = breaker();
        for _ in 0..6 {
            let _ = fail(&cb).await;
            assert_eq!(cb.state(), CircuitState::Closed);
        }
        for _ in 0..4 {
            succeed(&cb).await.unwrap();
            assert_eq!(cb.state(), CircuitState::Closed);
        }

        // 6/10 failing but only a failure evaluates the condition
        assert!((cb.failure_rate() - 0.6).abs() < f64::EPSILON);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_window() {
        let cb = breaker();
        for _ in 0..10 {
            let _ = fail(&cb).await;
        }
        assert!(cb.is_open());

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().requests_in_window, 0);
        assert_eq!(cb.metrics().total_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_limits_concurrent_trials() {
        let cb = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::default().with_half_open_max_calls(2),
        );
        cb.force_open();
        tokio::time::advance(Duration::from_secs(30)).await;

        let slow_trial = || {
            cb.call(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<(), &'static str>(())
            })
        };
        let results = futures::future::join_all((0..4).map(|_| slow_trial())).await;

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(CircuitBreakerError::CircuitOpen { .. })))
            .count();
        assert_eq!(admitted, 2);
        assert_eq!(rejected, 2);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.metrics().consecutive_successes, 2);

        // Finished trial calls free their slots
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_trial_releases_its_slot() {
        let cb = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::default().with_half_open_max_calls(1),
        );
        cb.force_open();
        tokio::time::advance(Duration::from_secs(30)).await;

        let hung = cb.call(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), &'static str>(())
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), hung)
            .await
            .is_err());

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.metrics().consecutive_successes, 1);
    }

    #[test]
    fn test_state_ordinals() {
        assert_eq!(CircuitState::from(0), CircuitState::Closed);
        assert_eq!(CircuitState::from(1), CircuitState::Open);
        assert_eq!(CircuitState::from(2), CircuitState::HalfOpen);
        assert_eq!(CircuitState::from(9), CircuitState::Open);
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
    }
}
