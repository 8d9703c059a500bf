//! # PokéAPI Client
//!
//! HTTP access to the three harness endpoints. Every attempt takes a token from
//! the shared rate limiter, then runs inside the endpoint's circuit breaker so
//! the breaker sees each outcome. Retry policy lives here, above the breaker:
//!
//! - 429: wait `Retry-After` (capped at `max_retry_after`, or one backoff unit) plus jitter
//! - 5xx and network failures: wait `2^attempt` backoff units plus jitter
//! - any other 4xx, decode failures and open circuits: returned immediately

use crate::client::{Endpoint, MetricsCollector};
use crate::error::{HarnessError, Result};
use crate::models::{Ability, ApiModel, Pokemon, Type};
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry, RateLimiter};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Resolved client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
    pub retry_base_delay: Duration,
    pub max_jitter: Duration,
    /// `Retry-After` values above this are clamped to it
    pub max_retry_after: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        crate::config::ApiConfig::default().to_client_config()
    }
}

/// Why a single attempt did not produce a document
#[derive(Debug)]
enum AttemptError {
    RateLimited { retry_after: Option<Duration> },
    Failed(HarnessError),
}

pub struct PokeApiClient {
    http: Client,
    config: ApiClientConfig,
    rate_limiter: Option<Arc<RateLimiter>>,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl std::fmt::Debug for PokeApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PokeApiClient")
            .field("base_url", &self.config.base_url)
            .field("max_retries", &self.config.max_retries)
            .field("rate_limited", &self.rate_limiter.is_some())
            .field("endpoints", &self.circuit_breakers.endpoints())
            .finish()
    }
}

impl PokeApiClient {
    pub fn new(
        config: ApiClientConfig,
        rate_limiter: Option<Arc<RateLimiter>>,
        circuit_breakers: Arc<CircuitBreakerRegistry>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HarnessError::network(config.base_url.clone(), e))?;

        info!(
            base_url = %config.base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            max_retries = config.max_retries,
            rate_limited = rate_limiter.is_some(),
            "Created PokéAPI client"
        );

        Ok(Self {
            http,
            config,
            rate_limiter,
            circuit_breakers,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    pub fn circuit_breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.circuit_breakers
    }

    /// State ordinal of an endpoint's breaker; 0 when it has none
    pub fn circuit_breaker_state(&self, endpoint: &str) -> u8 {
        self.circuit_breakers.state_value(endpoint)
    }

    pub async fn get_pokemon(&self, id: u32) -> Result<Pokemon> {
        self.get_model(Endpoint::Pokemon, id).await
    }

    pub async fn get_type(&self, id: u32) -> Result<Type> {
        self.get_model(Endpoint::Type, id).await
    }

    pub async fn get_ability(&self, id: u32) -> Result<Ability> {
        self.get_model(Endpoint::Ability, id).await
    }

    async fn get_model<T: ApiModel>(&self, endpoint: Endpoint, id: u32) -> Result<T> {
        let document = self.get_json(endpoint, id).await?;
        Ok(T::from_document(document)?)
    }

    /// Fetch one resource as a raw JSON document, applying the retry policy
    pub async fn get_json(&self, endpoint: Endpoint, id: u32) -> Result<Value> {
        let url = endpoint.url(&self.config.base_url, id);
        let breaker = self.circuit_breakers.get_or_create(endpoint.as_str());
        let max_retries = self.config.max_retries;

        let mut attempt: u32 = 0;
        loop {
            let wait = match self.attempt(endpoint, &url, &breaker).await {
                Ok(document) => return Ok(document),
                Err(AttemptError::RateLimited { retry_after }) => {
                    if attempt >= max_retries {
                        error!(endpoint = %endpoint, attempts = attempt + 1, "Rate limit retries exhausted");
                        self.count_failure(endpoint, "rate_limit_exceeded");
                        return Err(HarnessError::http(
                            endpoint.as_str(),
                            StatusCode::TOO_MANY_REQUESTS.as_u16(),
                            "rate limit exceeded",
                        ));
                    }
                    let wait = retry_after
                        .map(|after| after.min(self.config.max_retry_after))
                        .unwrap_or(self.config.retry_base_delay)
                        + self.jitter();
                    warn!(
                        endpoint = %endpoint,
                        wait_ms = wait.as_millis() as u64,
                        retry = attempt + 1,
                        max_retries,
                        "Rate limited (429), waiting before retry"
                    );
                    wait
                }
                Err(AttemptError::Failed(err)) => {
                    if !err.is_retryable() || attempt >= max_retries {
                        return Err(err);
                    }
                    let wait = self.backoff(attempt);
                    warn!(
                        endpoint = %endpoint,
                        error = %err,
                        wait_ms = wait.as_millis() as u64,
                        retry = attempt + 1,
                        max_retries,
                        "Request failed, will retry"
                    );
                    wait
                }
            };

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// One rate-limited, breaker-guarded request
    async fn attempt(
        &self,
        endpoint: Endpoint,
        url: &str,
        breaker: &CircuitBreaker,
    ) -> std::result::Result<Value, AttemptError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let started = Instant::now();
        let result = breaker.call(move || self.send(endpoint, url)).await;
        let elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_circuit_state(endpoint.as_str(), breaker.state_value());
        }

        match result {
            Ok(document) => {
                if let Some(metrics) = &self.metrics {
                    metrics.increment_request_counter(endpoint.as_str());
                    metrics.record_latency(endpoint.as_str(), elapsed);
                }
                debug!(endpoint = %endpoint, url, elapsed_ms = elapsed.as_millis() as u64, "Request succeeded");
                Ok(document)
            }
            Err(CircuitBreakerError::CircuitOpen { .. }) => {
                self.count_failure(endpoint, "circuit_open");
                Err(AttemptError::Failed(HarnessError::CircuitOpen {
                    endpoint: endpoint.as_str().to_string(),
                }))
            }
            Err(CircuitBreakerError::OperationFailed(err)) => {
                let reason = match &err {
                    AttemptError::RateLimited { .. } => "http_429".to_string(),
                    AttemptError::Failed(HarnessError::Http { status, .. }) => format!("http_{status}"),
                    AttemptError::Failed(HarnessError::Json(_)) => "invalid_json".to_string(),
                    AttemptError::Failed(_) => "network_error".to_string(),
                };
                self.count_failure(endpoint, &reason);
                if let Some(metrics) = &self.metrics {
                    metrics.record_latency(endpoint.as_str(), elapsed);
                }
                Err(err)
            }
        }
    }

    async fn send(&self, endpoint: Endpoint, url: &str) -> std::result::Result<Value, AttemptError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Failed(HarnessError::network(endpoint.as_str(), e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            return Err(AttemptError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(endpoint = %endpoint, status = %status, error = %message, "HTTP error");
            return Err(AttemptError::Failed(HarnessError::http(
                endpoint.as_str(),
                status.as_u16(),
                message,
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Failed(HarnessError::network(endpoint.as_str(), e)))?;
        serde_json::from_slice(&body).map_err(|e| AttemptError::Failed(HarnessError::Json(e)))
    }

    fn count_failure(&self, endpoint: Endpoint, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.increment_failure_counter(endpoint.as_str(), reason);
        }
    }

    fn jitter(&self) -> Duration {
        self.config.max_jitter.mul_f64(fastrand::f64())
    }

    /// `2^attempt` base delays plus jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.config.retry_base_delay.saturating_mul(factor) + self.jitter()
    }
}

/// Delay-seconds form of `Retry-After`; HTTP dates are not supported
fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 0.5 "), Some(Duration::from_millis(500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("NaN"), None);
    }

    #[test]
    fn test_default_config() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "https://pokeapi.co/api/v2");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
        assert_eq!(config.max_retry_after, Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = ApiClientConfig {
            max_jitter: Duration::ZERO,
            ..ApiClientConfig::default()
        };
        let client =
            PokeApiClient::new(config, None, Arc::new(CircuitBreakerRegistry::default())).unwrap();

        assert_eq!(client.backoff(0), Duration::from_secs(1));
        assert_eq!(client.backoff(1), Duration::from_secs(2));
        assert_eq!(client.backoff(2), Duration::from_secs(4));
        assert_eq!(client.circuit_breaker_state("pokemon"), 0);
    }
}
