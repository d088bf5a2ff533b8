use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Raw CSV content: header row plus string records
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read CSV data from a file on disk
pub fn read_csv_from_path(path: &Path, limit: Option<usize>) -> Result<CsvData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    read_csv(file, limit)
}

/// Read CSV records from any reader, stopping after `limit` data rows
pub fn read_csv<R: Read>(reader: R, limit: Option<usize>) -> Result<CsvData> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("CSV input has no header row");
    }

    let mut rows = Vec::new();
    for (row_idx, record) in csv_reader.records().enumerate() {
        if limit.is_some_and(|max| rows.len() >= max) {
            break;
        }
        let record = record.with_context(|| format!("Failed to parse CSV row {}", row_idx + 1))?;

        // Short rows are padded so every row lines up with the headers
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    if rows.is_empty() {
        anyhow::bail!("CSV input must contain at least one data row");
    }

    Ok(CsvData { headers, rows })
}
