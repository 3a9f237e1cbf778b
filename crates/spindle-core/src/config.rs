//! Pool configuration.
//!
//! Layers, lowest precedence first: `Default`, JSON file, environment.
//! Command-line flags are applied on top by the binary.
//!
//! Environment variables:
//! - `SPINDLE_WORKERS`: worker count
//! - `SPINDLE_SHUTDOWN_TIMEOUT_MS`: shutdown deadline in milliseconds

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PoolError};

pub const ENV_WORKERS: &str = "SPINDLE_WORKERS";
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "SPINDLE_SHUTDOWN_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub worker_count: usize,
    pub shutdown_timeout_ms: u64,
}

impl PoolConfig {
    pub const DEFAULT_WORKER_COUNT: usize = 1;
    pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

    /// Read a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Override fields from `lookup` (environment-shaped key/value source).
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_WORKERS) {
            self.worker_count = parse_env(ENV_WORKERS, value)?;
        }
        if let Some(value) = lookup(ENV_SHUTDOWN_TIMEOUT_MS) {
            self.shutdown_timeout_ms = parse_env(ENV_SHUTDOWN_TIMEOUT_MS, value)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.worker_count == 0 {
            return Err(PoolError::InvalidConfiguration(
                "worker_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: Self::DEFAULT_WORKER_COUNT,
            shutdown_timeout_ms: Self::DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
