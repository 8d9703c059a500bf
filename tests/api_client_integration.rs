//! PokéAPI client behaviour against a mock HTTP server

mod common;

use common::{client_with_metrics, fast_client_config, init_test_logging, pikachu};
use pokeapi_qa::client::{Endpoint, MetricsCollector, PokeApiClient};
use pokeapi_qa::resilience::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState, RateLimiter};
use pokeapi_qa::{HarnessError, TestOutcome};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_pokemon_decodes_typed_model() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 3), CircuitBreakerConfig::default());

    let pokemon = client.get_pokemon(25).await.expect("pikachu should decode");

    assert_eq!(pokemon.name, "pikachu");
    assert_eq!(pokemon.type_names(), vec!["electric"]);
    assert_eq!(pokemon.base_stat("speed"), Some(90));
    assert_eq!(pokemon.extra.get("is_default"), Some(&json!(true)));

    assert_eq!(metrics.request_count("pokemon"), 1);
    assert_eq!(metrics.total_failures("pokemon"), 0);
    assert_eq!(metrics.latency_samples("pokemon"), 1);
    assert_eq!(metrics.circuit_state("pokemon"), Some(CircuitState::Closed.as_u8()));
}

#[tokio::test]
async fn test_too_many_requests_honours_retry_after_then_succeeds() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu()))
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 3), CircuitBreakerConfig::default());

    let document = client.get_json(Endpoint::Pokemon, 25).await.unwrap();

    assert_eq!(document["id"], json!(25));
    assert_eq!(metrics.failure_count("pokemon", "http_429"), 1);
    assert_eq!(metrics.request_count("pokemon"), 1);

    // The throttled attempt still counts against the breaker window
    let breaker = client.circuit_breakers().get("pokemon").unwrap();
    let snapshot = breaker.metrics();
    assert_eq!(snapshot.requests_in_window, 2);
    assert_eq!(snapshot.failures_in_window, 1);
}

#[tokio::test]
async fn test_oversized_retry_after_is_clamped() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1000000000"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu()))
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 3), CircuitBreakerConfig::default());

    let started = Instant::now();
    let document = tokio::time::timeout(Duration::from_secs(5), client.get_json(Endpoint::Pokemon, 25))
        .await
        .expect("Retry-After should be clamped to max_retry_after")
        .unwrap();

    assert_eq!(document["id"], json!(25));
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(metrics.failure_count("pokemon", "http_429"), 1);
}

#[tokio::test]
async fn test_too_many_requests_exhausts_retries() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ability/9"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 2), CircuitBreakerConfig::default());

    let err = client.get_json(Endpoint::Ability, 9).await.unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert_eq!(err.outcome(), TestOutcome::Failed);
    assert_eq!(metrics.failure_count("ability", "http_429"), 3);
    assert_eq!(metrics.failure_count("ability", "rate_limit_exceeded"), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried_with_backoff() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/type/13"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/type/13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 13,
            "name": "electric",
            "damage_relations": {"double_damage_to": [{"name": "water", "url": "u"}]},
            "pokemon": [],
            "moves": []
        })))
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 3), CircuitBreakerConfig::default());

    let started = Instant::now();
    let electric = client.get_type(13).await.unwrap();

    assert_eq!(electric.damage_relation("double_damage_to"), vec!["water"]);
    assert_eq!(metrics.failure_count("type", "http_503"), 2);
    assert_eq!(metrics.request_count("type"), 1);
    // 1ms then 2ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(3));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 2), CircuitBreakerConfig::default());

    let err = client.get_json(Endpoint::Pokemon, 1).await.unwrap_err();

    match err {
        HarnessError::Http { status, ref message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(metrics.failure_count("pokemon", "http_500"), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/99999"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 3), CircuitBreakerConfig::default());

    let err = client.get_pokemon(99999).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(!err.is_retryable());
    assert_eq!(metrics.failure_count("pokemon", "http_404"), 1);
}

#[tokio::test]
async fn test_invalid_json_is_not_retried() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ability/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, metrics) =
        client_with_metrics(fast_client_config(&server.uri(), 3), CircuitBreakerConfig::default());

    let err = client.get_json(Endpoint::Ability, 1).await.unwrap_err();

    assert!(matches!(err, HarnessError::Json(_)));
    assert_eq!(metrics.failure_count("ability", "invalid_json"), 1);
}

#[tokio::test]
async fn test_invalid_model_surfaces_validation_error() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/type/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 0,
            "name": "shadow",
            "damage_relations": {},
            "pokemon": [],
            "moves": []
        })))
        .mount(&server)
        .await;

    let (client, _) =
        client_with_metrics(fast_client_config(&server.uri(), 0), CircuitBreakerConfig::default());

    let err = client.get_type(0).await.unwrap_err();
    assert!(matches!(err, HarnessError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_open_circuit_blocks_without_touching_the_network() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/7"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let breaker_config = CircuitBreakerConfig::default()
        .with_minimum_requests(2)
        .with_timeout(Duration::from_secs(60));
    let (client, metrics) = client_with_metrics(fast_client_config(&server.uri(), 0), breaker_config);

    for _ in 0..2 {
        let err = client.get_json(Endpoint::Pokemon, 7).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
    assert_eq!(client.circuit_breaker_state("pokemon"), CircuitState::Open.as_u8());

    let err = client.get_json(Endpoint::Pokemon, 7).await.unwrap_err();

    assert!(err.is_circuit_open());
    assert_eq!(err.outcome(), TestOutcome::Blocked);
    assert_eq!(metrics.failure_count("pokemon", "circuit_open"), 1);
    assert_eq!(metrics.circuit_state("pokemon"), Some(CircuitState::Open.as_u8()));

    // Other endpoints keep their own breaker
    assert_eq!(client.circuit_breaker_state("type"), CircuitState::Closed.as_u8());
}

#[tokio::test]
async fn test_network_failure_is_retried() {
    init_test_logging();
    // Nothing listens on the reserved port
    let config = fast_client_config("http://127.0.0.1:9", 1);
    let (client, metrics) = client_with_metrics(config, CircuitBreakerConfig::default());

    let err = client.get_json(Endpoint::Pokemon, 1).await.unwrap_err();

    assert!(matches!(err, HarnessError::Network { .. }), "got {err:?}");
    assert_eq!(metrics.failure_count("pokemon", "network_error"), 2);
}

#[tokio::test]
async fn test_shared_rate_limiter_throttles_requests() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu()))
        .expect(4)
        .mount(&server)
        .await;

    let limiter = Arc::new(RateLimiter::with_limits(2, Duration::from_millis(200)).unwrap());
    let client = PokeApiClient::new(
        fast_client_config(&server.uri(), 0),
        Some(limiter.clone()),
        Arc::new(CircuitBreakerRegistry::default()),
    )
    .unwrap();

    let started = Instant::now();
    for id in 1..=4 {
        client.get_json(Endpoint::Pokemon, id).await.unwrap();
    }

    // Burst of two, then two refills at 100ms each
    assert!(started.elapsed() >= Duration::from_millis(190), "elapsed {:?}", started.elapsed());
    assert_eq!(limiter.stats().total_acquired, 4);
}

#[test]
fn test_metrics_collector_is_object_safe() {
    let collector: Arc<dyn MetricsCollector> = Arc::new(pokeapi_qa::client::TracingMetricsCollector);
    collector.increment_request_counter("pokemon");
    collector.increment_failure_counter("pokemon", "http_500");
    collector.record_latency("pokemon", Duration::from_millis(3));
    collector.record_circuit_state("pokemon", 0);
}
