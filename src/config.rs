//! Runtime configuration read from `REGISTER_*` environment variables.

use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

use crate::clock::{offset_from_hours, DEFAULT_UTC_OFFSET_HOURS};
use crate::credentials;
use crate::cursor::CURSOR_FILE;
use crate::error::ConfigError;
use crate::ledger::LEDGER_FILE;

const VAR_DATA_DIR: &str = "REGISTER_DATA_DIR";
const VAR_LOG_DIR: &str = "REGISTER_LOG_DIR";
const VAR_REMOTE_URL: &str = "REGISTER_REMOTE_URL";
const VAR_REMOTE_API_KEY: &str = "REGISTER_REMOTE_API_KEY";
const VAR_SYNC_INTERVAL: &str = "REGISTER_SYNC_INTERVAL_SECS";
const VAR_CLEAN_INTERVAL: &str = "REGISTER_CLEAN_INTERVAL_SECS";
const VAR_UTC_OFFSET: &str = "REGISTER_UTC_OFFSET_HOURS";
const VAR_LARGE_AMOUNT: &str = "REGISTER_LARGE_AMOUNT";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DEFAULT_CLEAN_INTERVAL_SECS: u64 = 3600;
const DEFAULT_LARGE_AMOUNT: f64 = 500_000.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Remote shift store base URL. Sync is disabled when unset.
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    pub sync_interval: Duration,
    pub clean_interval: Duration,
    pub utc_offset: FixedOffset,
    /// Amounts at or above this need an explicit confirmation in the console.
    pub large_amount: f64,
}

impl Config {
    /// Load from the process environment, falling back to the OS credential
    /// store for the remote API key.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|var| std::env::var(var).ok())?;
        if config.remote_url.is_some() && config.remote_api_key.is_none() {
            config.remote_api_key = credentials::remote_api_key();
        }
        Ok(config)
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = get(VAR_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_dir = get(VAR_LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));

        let sync_secs = parse_positive(VAR_SYNC_INTERVAL, get(VAR_SYNC_INTERVAL))?
            .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);
        let clean_secs = parse_positive(VAR_CLEAN_INTERVAL, get(VAR_CLEAN_INTERVAL))?
            .unwrap_or(DEFAULT_CLEAN_INTERVAL_SECS);

        let offset_hours = match get(VAR_UTC_OFFSET) {
            Some(raw) => raw.parse::<i32>().map_err(|_| ConfigError::Invalid {
                var: VAR_UTC_OFFSET,
                value: raw.clone(),
            })?,
            None => DEFAULT_UTC_OFFSET_HOURS,
        };
        let utc_offset = offset_from_hours(offset_hours).ok_or(ConfigError::Invalid {
            var: VAR_UTC_OFFSET,
            value: offset_hours.to_string(),
        })?;

        let large_amount = match get(VAR_LARGE_AMOUNT) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => v,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: VAR_LARGE_AMOUNT,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_LARGE_AMOUNT,
        };

        Ok(Self {
            data_dir,
            log_dir,
            remote_url: get(VAR_REMOTE_URL),
            remote_api_key: get(VAR_REMOTE_API_KEY),
            sync_interval: Duration::from_secs(sync_secs),
            clean_interval: Duration::from_secs(clean_secs),
            utc_offset,
            large_amount,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.data_dir.join(CURSOR_FILE)
    }

    /// The remote URL, or an error naming the variable to set.
    pub fn require_remote_url(&self) -> Result<&str, ConfigError> {
        self.remote_url
            .as_deref()
            .ok_or(ConfigError::Missing(VAR_REMOTE_URL))
    }
}

fn parse_positive(var: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(v) if v > 0 => Ok(Some(v)),
            _ => Err(ConfigError::Invalid { var, value: raw }),
        },
    }
}
