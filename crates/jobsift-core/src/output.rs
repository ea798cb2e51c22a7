//! Append-only output CSV.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use jobsift_types::{OutputField, OutputRecord};
use tracing::debug;

use crate::error::StoreError;

/// The output file, opened once per run in append mode.
///
/// The header is written only when the file is new or empty. Every
/// [`append`](OutputLog::append) is flushed and synced before it returns.
pub struct OutputLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl OutputLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let has_data = std::fs::metadata(&path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(StoreError::io(&path))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        let mut log = Self { path, writer };
        if !has_data {
            log.write_row(OutputField::header())?;
            debug!(path = %log.path.display(), "output header written");
        }
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and make it durable.
    pub fn append(&mut self, row: &OutputRecord) -> Result<(), StoreError> {
        self.write_row(OutputField::ALL.map(|f| row.get(f)))
    }

    fn write_row(&mut self, cells: [&str; 7]) -> Result<(), StoreError> {
        self.writer
            .write_record(cells)
            .map_err(StoreError::csv(&self.path))?;
        self.writer.flush().map_err(StoreError::io(&self.path))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(StoreError::io(&self.path))
    }
}

/// Data rows in an existing output file, header excluded. A missing file
/// counts as zero.
pub fn count_rows(path: &Path) -> Result<usize, StoreError> {
    if !path.exists() {
        return Ok(0);
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(StoreError::csv(path))?;
    let mut count = 0;
    for record in reader.records() {
        record.map_err(StoreError::csv(path))?;
        count += 1;
    }
    Ok(count)
}
