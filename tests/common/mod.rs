//! Shared fixtures for integration tests

#![allow(dead_code)]

use pokeapi_qa::client::{ApiClientConfig, InMemoryMetricsCollector, PokeApiClient};
use pokeapi_qa::resilience::{CircuitBreakerConfig, CircuitBreakerRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Client settings with millisecond-scale retry waits
pub fn fast_client_config(base_url: &str, max_retries: u32) -> ApiClientConfig {
    ApiClientConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        max_retries,
        user_agent: "pokeapi-qa-tests".to_string(),
        retry_base_delay: Duration::from_millis(1),
        max_jitter: Duration::ZERO,
        max_retry_after: Duration::from_millis(20),
    }
}

/// Build an unthrottled client that reports into a fresh in-memory collector
pub fn client_with_metrics(
    config: ApiClientConfig,
    breaker_config: CircuitBreakerConfig,
) -> (PokeApiClient, Arc<InMemoryMetricsCollector>) {
    let metrics = Arc::new(InMemoryMetricsCollector::new());
    let registry = Arc::new(CircuitBreakerRegistry::new(breaker_config));
    let client = PokeApiClient::new(config, None, registry)
        .expect("client should build")
        .with_metrics(metrics.clone());
    (client, metrics)
}

pub fn pikachu() -> Value {
    json!({
        "id": 25,
        "name": "pikachu",
        "base_experience": 112,
        "height": 4,
        "weight": 60,
        "is_default": true,
        "types": [
            {"slot": 1, "type": {"name": "electric", "url": "https://pokeapi.co/api/v2/type/13/"}}
        ],
        "abilities": [
            {"is_hidden": false, "slot": 1, "ability": {"name": "static", "url": "https://pokeapi.co/api/v2/ability/9/"}},
            {"is_hidden": true, "slot": 3, "ability": {"name": "lightning-rod", "url": "https://pokeapi.co/api/v2/ability/31/"}}
        ],
        "stats": [
            {"base_stat": 35, "effort": 0, "stat": {"name": "hp", "url": "https://pokeapi.co/api/v2/stat/1/"}},
            {"base_stat": 90, "effort": 2, "stat": {"name": "speed", "url": "https://pokeapi.co/api/v2/stat/6/"}}
        ],
        "sprites": {
            "front_default": "https://example.invalid/25.png",
            "back_default": null
        }
    })
}
