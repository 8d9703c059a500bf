//! Configuration Loader
//!
//! Layers sources lowest to highest priority: serde defaults, an optional TOML
//! file, `POKEAPI_QA__SECTION__KEY` environment variables, then `DATABASE_URL`.

use super::error::{ConfigResult, ConfigurationError};
use super::HarnessConfig;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pokeapi-qa.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "POKEAPI_QA";

/// Loaded, validated configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: HarnessConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` when given. An explicit path must exist.
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Arc<ConfigManager>> {
        let config = Self::build(path, None, env::var("DATABASE_URL").ok())?;
        Ok(Self::finish(config, path))
    }

    /// Load with an explicit environment map instead of the process environment.
    /// This is useful for testing without modifying global environment variables.
    pub fn load_with_env(
        path: Option<&Path>,
        vars: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let database_url = vars.get("DATABASE_URL").cloned();
        let config = Self::build(path, Some(vars), database_url)?;
        Ok(Self::finish(config, path))
    }

    fn build(
        path: Option<&Path>,
        vars: Option<HashMap<String, String>>,
        database_url: Option<String>,
    ) -> ConfigResult<HarnessConfig> {
        let mut builder = ::config::Config::builder();

        builder = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigurationError::file_not_found(path));
                }
                debug!(path = %path.display(), "Loading configuration file");
                builder.add_source(::config::File::from(path).required(true))
            }
            None => builder.add_source(::config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let environment = ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(vars);

        let mut config: HarnessConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if let Some(url) = database_url.filter(|url| !url.is_empty()) {
            config.database.url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    fn finish(config: HarnessConfig, path: Option<&Path>) -> Arc<ConfigManager> {
        let environment = detect_environment();

        info!(
            environment = %environment,
            base_url = %config.api.base_url,
            max_requests = config.rate_limit.max_requests,
            endpoints = ?config.circuit_breaker.endpoints,
            "Configuration loaded successfully"
        );

        Arc::new(ConfigManager {
            config,
            environment,
            source_file: path.map(Path::to_path_buf),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

/// Deployment environment from `POKEAPI_QA_ENV` or `APP_ENV`, defaulting to `development`
pub fn detect_environment() -> String {
    env::var("POKEAPI_QA_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}
