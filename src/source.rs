use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::csv_reader;
use crate::data::{is_missing, Dataset};

/// Most rows collected from a remote source
pub const REMOTE_ROW_CAP: usize = 100_000;

/// Where the rows come from
pub trait DataSource {
    /// Human readable origin, used in logs
    fn describe(&self) -> String;

    fn is_remote(&self) -> bool {
        false
    }

    /// Collect at most `limit` rows (all rows when `None`)
    fn fetch(&self, limit: Option<usize>) -> Result<Dataset>;
}

/// Collect rows from a source and drop rows whose date cell is missing.
///
/// Remote sources are capped at [`REMOTE_ROW_CAP`] rows.
pub fn ingest(source: &dyn DataSource, date_column: &str) -> Result<Dataset> {
    let limit = source.is_remote().then_some(REMOTE_ROW_CAP);
    let mut data = source
        .fetch(limit)
        .with_context(|| format!("Failed to read data from {}", source.describe()))?;

    if let Some(max) = limit {
        data.rows.truncate(max);
    }

    let before = data.row_count();
    if let Some(idx) = data.column_index(date_column) {
        data.rows
            .retain(|row| row.get(idx).is_some_and(|cell| !is_missing(cell)));
    }
    let dropped = before - data.row_count();
    if dropped > 0 {
        debug!(dropped, column = date_column, "dropped rows with missing date");
    }

    info!(rows = data.row_count(), columns = data.headers.len(), source = %source.describe(), "collected data");
    Ok(data)
}

/// CSV file on disk
pub struct CsvFileSource {
    pub path: PathBuf,
}

impl DataSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, limit: Option<usize>) -> Result<Dataset> {
        Ok(Dataset::from_csv(csv_reader::read_csv_from_path(&self.path, limit)?))
    }
}

/// CSV from any reader, consumed on first fetch (stdin in the CLI)
pub struct CsvReaderSource<R> {
    name: String,
    reader: RefCell<Option<R>>,
}

impl<R: Read> CsvReaderSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader: RefCell::new(Some(reader)),
        }
    }
}

impl<R: Read> DataSource for CsvReaderSource<R> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn fetch(&self, limit: Option<usize>) -> Result<Dataset> {
        let reader = self
            .reader
            .borrow_mut()
            .take()
            .ok_or_else(|| anyhow::anyhow!("{} was already consumed", self.name))?;
        Ok(Dataset::from_csv(csv_reader::read_csv(reader, limit)?))
    }
}

/// JSON array of objects on disk
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl DataSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, limit: Option<usize>) -> Result<Dataset> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read '{}'", self.path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON in '{}'", self.path.display()))?;
        let mut data = Dataset::from_json(&value)?;
        if let Some(max) = limit {
            data.rows.truncate(max);
        }
        Ok(data)
    }
}
