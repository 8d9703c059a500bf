#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, PokéAPI in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # PokéAPI QA Harness Core
//!
//! Resilient request admission and schema drift tracking for a QA harness that
//! exercises the public PokéAPI.
//!
//! ## Overview
//!
//! Every outbound request passes two independent gates: a shared token-bucket
//! [`resilience::RateLimiter`] and the endpoint's [`resilience::CircuitBreaker`].
//! Responses are decoded into strict-plus-extra [`models`], stored in
//! PostgreSQL, and their structural shape compared against the last recorded
//! shape to surface upstream API drift.
//!
//! ## Module Organization
//!
//! - [`resilience`] - Rate limiter, circuit breakers and their registry
//! - [`schema`] - Shape extraction and structural diffing
//! - [`models`] - Typed `/pokemon`, `/type` and `/ability` documents
//! - [`client`] - HTTP client with retry policy and metrics sink
//! - [`database`] - Response cache and schema history
//! - [`drift`] - Store-compare-record drift detection
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pokeapi_qa::client::PokeApiClient;
//! use pokeapi_qa::config::ConfigManager;
//! use pokeapi_qa::resilience::{CircuitBreakerRegistry, RateLimiter};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let limiter = Arc::new(RateLimiter::new(config.rate_limit.to_rate_limiter_config()?)?);
//! let breakers = Arc::new(CircuitBreakerRegistry::from_config(
//!     config.circuit_breaker.to_circuit_breaker_config()?,
//!     config.circuit_breaker.endpoints.iter().cloned(),
//! ));
//!
//! let client = PokeApiClient::new(config.api.to_client_config(), Some(limiter), breakers)?;
//! let pikachu = client.get_pokemon(25).await?;
//! println!("{} is {:?}", pikachu.name, pikachu.type_names());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod database;
pub mod drift;
pub mod error;
pub mod logging;
pub mod models;
pub mod resilience;
pub mod schema;

pub use error::{HarnessError, Result, TestOutcome};
