//! Host configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::platform;
use crate::services::storage::GLOBAL_DOMAIN;
use crate::types::errors::ConfigError;

pub const ENV_DATA_DIR: &str = "ACHROMA_DATA_DIR";
pub const ENV_DOMAIN: &str = "ACHROMA_DOMAIN";
pub const ENV_LOG: &str = "ACHROMA_LOG";
pub const ENV_COMMIT_DELAY_MS: &str = "ACHROMA_COMMIT_DELAY_MS";

pub const DATABASE_FILE: &str = "achroma.db";
const DEFAULT_COMMIT_DELAY_MS: u64 = 200;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub data_dir: PathBuf,
    /// Hostname whose settings record the host serves.
    pub domain: String,
    pub log_filter: String,
    /// Quiet period for coalesced commits and legend refreshes.
    pub commit_delay: Duration,
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = non_empty(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(platform::get_data_dir);
        let domain = non_empty(ENV_DOMAIN)
            .map(|d| d.trim().to_lowercase())
            .unwrap_or_else(|| GLOBAL_DOMAIN.to_string());
        let log_filter = non_empty(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let commit_delay_ms = match non_empty(ENV_COMMIT_DELAY_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue(ENV_COMMIT_DELAY_MS.to_string(), raw))?,
            None => DEFAULT_COMMIT_DELAY_MS,
        };

        Ok(Self {
            data_dir,
            domain,
            log_filter,
            commit_delay: Duration::from_millis(commit_delay_ms),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}
