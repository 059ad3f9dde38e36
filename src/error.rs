//! Error types shared across the register, the stores and the synchronizer.

use thiserror::Error;

use crate::model::DayId;

/// Failure reading or writing a shift store (local file or remote backend).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Pass-level failure of a sync or cleanup pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("ledger store: {0}")]
    Ledger(#[source] StoreError),

    #[error("sync cursor: {0}")]
    Cursor(#[source] StoreError),

    #[error("no days could be synced ({} attempted)", attempted.len())]
    AllDaysFailed { attempted: Vec<DayId> },
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid date {0:?}, expected dd-mm-YYYY")]
    InvalidDate(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no data found")]
    NoData,
}
