//! # Drift Probe
//!
//! Fetches a set of PokéAPI resources through the resilient client, records
//! each response and reports schema drift per endpoint. Exits non-zero when
//! any request fails; blocked requests (open circuit) are reported separately.

use anyhow::Context;
use clap::Parser;
use pokeapi_qa::client::{Endpoint, PokeApiClient, TracingMetricsCollector};
use pokeapi_qa::config::ConfigManager;
use pokeapi_qa::database::{DatabaseConnection, ResponseRepository};
use pokeapi_qa::drift::{InMemorySchemaStore, SchemaDriftDetector, SchemaStore};
use pokeapi_qa::logging;
use pokeapi_qa::resilience::{CircuitBreakerRegistry, RateLimiter};
use pokeapi_qa::TestOutcome;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "drift-probe")]
#[command(about = "Fetch PokéAPI resources and report schema drift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (default: ./pokeapi-qa.toml if present)
    #[arg(short, long, env = "POKEAPI_QA_CONFIG")]
    config: Option<PathBuf>,

    /// Endpoints to probe
    #[arg(short, long, value_delimiter = ',', default_value = "pokemon,type,ability")]
    endpoints: Vec<Endpoint>,

    /// Resource ids to fetch from every endpoint
    #[arg(short, long, value_delimiter = ',', default_value = "1")]
    ids: Vec<u32>,

    /// Keep responses in memory instead of PostgreSQL
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Default)]
struct Summary {
    succeeded: usize,
    drifted: usize,
    blocked: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    let config = manager.config();
    logging::init_with_config(&config.telemetry);

    let limiter = Arc::new(RateLimiter::new(config.rate_limit.to_rate_limiter_config()?)?);
    let breakers = Arc::new(CircuitBreakerRegistry::from_config(
        config.circuit_breaker.to_circuit_breaker_config()?,
        config.circuit_breaker.endpoints.iter().cloned(),
    ));
    let client = PokeApiClient::new(config.api.to_client_config(), Some(limiter), breakers)?
        .with_metrics(Arc::new(TracingMetricsCollector));

    let store: Arc<dyn SchemaStore> = if cli.dry_run {
        info!("Dry run: keeping responses in memory");
        Arc::new(InMemorySchemaStore::new())
    } else {
        let connection = DatabaseConnection::connect(&config.database)
            .await
            .context("failed to connect to the response cache")?;
        connection.migrate().await?;
        Arc::new(ResponseRepository::new(connection.pool().clone()))
    };
    let detector = SchemaDriftDetector::new(store);

    let mut summary = Summary::default();
    for endpoint in &cli.endpoints {
        for &id in &cli.ids {
            probe(&client, &detector, *endpoint, id, &mut summary).await;
        }
    }

    info!(
        succeeded = summary.succeeded,
        drifted = summary.drifted,
        blocked = summary.blocked,
        failed = summary.failed,
        "Drift probe finished"
    );

    if summary.failed > 0 {
        process::exit(1);
    }
    Ok(())
}

async fn probe(
    client: &PokeApiClient,
    detector: &SchemaDriftDetector,
    endpoint: Endpoint,
    id: u32,
    summary: &mut Summary,
) {
    let state_before = client.circuit_breaker_state(endpoint.as_str());
    let started = Instant::now();
    let result = client.get_json(endpoint, id).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let state_after = client.circuit_breaker_state(endpoint.as_str());
    if state_before != state_after {
        logging::log_circuit_transition(endpoint.as_str(), state_before, state_after);
    }

    let document = match result {
        Ok(document) => {
            logging::log_api_request(endpoint.as_str(), i64::from(id), Some(200), elapsed_ms, "ok");
            document
        }
        Err(err) => {
            let outcome = match err.outcome() {
                TestOutcome::Blocked => {
                    summary.blocked += 1;
                    "blocked"
                }
                TestOutcome::Failed => {
                    summary.failed += 1;
                    "failed"
                }
            };
            logging::log_api_request(endpoint.as_str(), i64::from(id), err.status(), elapsed_ms, outcome);
            warn!(endpoint = %endpoint, id, error = %err, outcome, "Request did not complete");
            return;
        }
    };

    match detector.record(endpoint.as_str(), i64::from(id), &document).await {
        Ok(diff) => {
            summary.succeeded += 1;
            if diff.has_changes() {
                summary.drifted += 1;
                logging::log_schema_drift(
                    endpoint.as_str(),
                    diff.added().len(),
                    diff.removed().len(),
                    diff.modified().len(),
                );
            }
        }
        Err(err) => {
            summary.failed += 1;
            error!(endpoint = %endpoint, id, error = %err, "Failed to record response");
        }
    }
}
