//! # Resilience Module
//!
//! Admission control for every outbound PokéAPI request: a shared token bucket
//! bounding the request rate, and one circuit breaker per logical endpoint that
//! fails fast while the endpoint is unhealthy.
//!
//! ## Architecture
//!
//! - **Rate Limiter**: token bucket refilled continuously, awaited before each request
//! - **Circuit Breakers**: sliding-window failure rate with closed, open and half-open states
//! - **Registry**: lazily created breakers keyed by endpoint name
//! - **Metrics**: serializable snapshots of breaker state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pokeapi_qa::resilience::{CircuitBreaker, CircuitBreakerConfig, RateLimiter};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = RateLimiter::with_limits(100, Duration::from_secs(60))?;
//! let breaker = CircuitBreaker::new("pokemon", CircuitBreakerConfig::default());
//!
//! limiter.acquire().await;
//! let body = breaker
//!     .call(|| async { Ok::<&str, std::io::Error>("{\"id\": 25}") })
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod metrics;
pub mod rate_limiter;
pub mod registry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::{CircuitBreakerConfig, RateLimiterConfig};
pub use metrics::{CircuitBreakerMetrics, RegistryMetrics};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use registry::CircuitBreakerRegistry;
