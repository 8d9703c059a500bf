//! # API Client
//!
//! Resilient HTTP access to PokéAPI plus the metrics sink it reports to.

pub mod api_client;
pub mod endpoints;
pub mod metrics;

pub use api_client::{ApiClientConfig, PokeApiClient};
pub use endpoints::Endpoint;
pub use metrics::{InMemoryMetricsCollector, MetricsCollector, TracingMetricsCollector};
