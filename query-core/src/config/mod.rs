use crate::chunk::DEFAULT_ADDRESS_CHUNK_SIZE;
use crate::error::ConfigError;
use crate::paging::{DEFAULT_MAX_PAGES_PER_CHUNK, DEFAULT_MAX_PAGE_SIZE};
use crate::retry::RetryPolicy;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `QUERY_CORE__CHUNK_SIZE=25`.
pub const ENV_PREFIX: &str = "QUERY_CORE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub chunk_size: usize,
    pub max_page_size: usize,
    pub max_pages_per_chunk: usize,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_ADDRESS_CHUNK_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_pages_per_chunk: DEFAULT_MAX_PAGES_PER_CHUNK,
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub period_secs: u64,
    pub duration_secs: u64,
    /// Delay between a successful create and the first probe.
    pub initial_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            period_secs: 5,
            duration_secs: 4 * 60,
            initial_delay_secs: 2,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.period_secs),
            Duration::from_secs(self.duration_secs),
        )
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
    pub file_level: String,
    pub console_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "query-core".to_string(),
            file_level: "warn".to_string(),
            console_level: "error".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads `path` (any format the `config` crate recognises by extension),
    /// applies `QUERY_CORE__*` environment overrides, then validates.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| ConfigError::Load {
                path: path.to_string(),
                msg: e.to_string(),
            })?;

        let config: Self = settings.try_deserialize().map_err(|e| ConfigError::Load {
            path: path.to_string(),
            msg: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than zero"));
        }
        if self.max_page_size == 0 {
            return Err(invalid("max_page_size", "must be greater than zero"));
        }
        if self.max_pages_per_chunk == 0 {
            return Err(invalid("max_pages_per_chunk", "must be greater than zero"));
        }
        if self.retry.period_secs == 0 {
            return Err(invalid("retry.period_secs", "must be greater than zero"));
        }
        if self.retry.duration_secs < self.retry.period_secs {
            return Err(invalid(
                "retry.duration_secs",
                "must be at least one retry period",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
