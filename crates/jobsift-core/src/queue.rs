//! Work queue and its on-disk checkpoint.
//!
//! The checkpoint is the input CSV itself: after every processed row the
//! remaining rows are written to `<path>.tmp`, synced, and renamed over
//! `<path>`. A crash at any point leaves either the old or the new file in
//! place, never a truncated one.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use jobsift_types::InputRecord;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Rows not yet confirmed processed, plus the source column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkQueue {
    header: Vec<String>,
    rows: Vec<InputRecord>,
}

impl WorkQueue {
    pub fn new(header: Vec<String>, rows: Vec<InputRecord>) -> Self {
        Self { header, rows }
    }

    /// Column order of the source file.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&InputRecord> {
        self.rows.get(index)
    }

    /// Remove the row at `index`, shifting later rows down.
    pub fn remove_at(&mut self, index: usize) -> Option<InputRecord> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputRecord> {
        self.rows.iter()
    }
}

/// Loads and atomically rewrites the queue file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp file used by [`persist`](Self::persist).
    pub fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the queue. Short rows are padded, surplus cells dropped.
    ///
    /// A leftover `.tmp` from an interrupted persist is ignored.
    pub fn load(&self) -> Result<WorkQueue, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(StoreError::csv(&self.path))?;

        let header: Vec<String> = reader
            .headers()
            .map_err(StoreError::csv(&self.path))?
            .iter()
            .map(str::to_owned)
            .collect();
        if header.iter().all(|h| h.trim().is_empty()) {
            return Err(StoreError::MissingHeader {
                path: self.path.clone(),
            });
        }

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let cells = result.map_err(StoreError::csv(&self.path))?;
            let (record, dropped) = InputRecord::from_row(&header, cells.iter());
            if dropped > 0 {
                warn!(row = index + 1, dropped, "row has more cells than header, extra cells dropped");
            }
            rows.push(record);
        }

        debug!(path = %self.path.display(), rows = rows.len(), "queue loaded");
        Ok(WorkQueue { header, rows })
    }

    /// Replace the queue file with `queue`: write temp, sync, rename.
    pub fn persist(&self, queue: &WorkQueue) -> Result<(), StoreError> {
        let tmp = self.tmp_path();
        let file = File::create(&tmp).map_err(StoreError::io(&tmp))?;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        writer
            .write_record(queue.header())
            .map_err(StoreError::csv(&tmp))?;
        for row in queue.iter() {
            writer
                .write_record(row.cells_for(queue.header()))
                .map_err(StoreError::csv(&tmp))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(&tmp)(e.into_error()))?;
        file.sync_all().map_err(StoreError::io(&tmp))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(StoreError::io(&self.path))?;
        debug!(path = %self.path.display(), rows = queue.len(), "checkpoint written");
        Ok(())
    }
}
