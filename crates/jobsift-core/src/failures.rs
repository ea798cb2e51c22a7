//! JSONL ledger of rows that fell back to record-only output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jobsift_types::InputRecord;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::StoreError;

/// One fallen-back row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub ts: DateTime<Utc>,
    /// 1-based row number within the run.
    pub position: usize,
    pub error: String,
    pub last_reply: Option<String>,
    pub record: InputRecord,
}

impl FailureEntry {
    pub fn new(
        position: usize,
        error: impl Into<String>,
        last_reply: Option<String>,
        record: InputRecord,
    ) -> Self {
        Self {
            ts: Utc::now(),
            position,
            error: error.into(),
            last_reply,
            record,
        }
    }
}

/// Append-only failure ledger.
#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: PathBuf,
}

impl FailureLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry followed by a newline, then sync.
    pub async fn append(&self, entry: &FailureEntry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::io(parent))?;
        }

        let mut line = serde_json::to_string(entry).map_err(StoreError::json(&self.path))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(StoreError::io(&self.path))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(StoreError::io(&self.path))?;
        file.flush().await.map_err(StoreError::io(&self.path))?;
        file.sync_data().await.map_err(StoreError::io(&self.path))?;
        Ok(())
    }

    /// Read every entry. Invalid lines are skipped with a warning.
    pub async fn load(&self) -> Result<Vec<FailureEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(StoreError::io(&self.path))?;

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<FailureEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping invalid ledger line");
                }
            }
        }
        Ok(entries)
    }
}
