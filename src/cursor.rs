//! Sync cursor: id of the most recent bill known to be durably replicated.
//!
//! Persisted on its own in `last_bill_id.json` as `{"last_id": "..."}`, with
//! `"no_id"` meaning nothing has synced yet. Only the synchronizer writes it.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const CURSOR_FILE: &str = "last_bill_id.json";

/// Sentinel stored when no bill has ever synced.
pub const NO_ID: &str = "no_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CursorRecord {
    last_id: String,
}

#[derive(Debug, Clone)]
pub struct CursorFile {
    path: PathBuf,
}

impl CursorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cursor. A missing file is created holding the sentinel; an
    /// empty file reads as the sentinel.
    pub async fn load(&self) -> Result<String, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.store(NO_ID).await?;
                return Ok(NO_ID.to_string());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(NO_ID.to_string());
        }
        let record: CursorRecord = serde_json::from_str(&raw)?;
        Ok(record.last_id)
    }

    pub async fn store(&self, last_id: &str) -> Result<(), StoreError> {
        let body = serde_json::to_vec(&CursorRecord {
            last_id: last_id.to_string(),
        })?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }
}
