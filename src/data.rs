use anyhow::{anyhow, Result};
use serde_json::Value;

/// Row-oriented table of raw cell text, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Create a Dataset from parsed CSV content
    pub fn from_csv(csv: crate::csv_reader::CsvData) -> Self {
        Self {
            headers: csv.headers,
            rows: csv.rows,
        }
    }

    /// Create a Dataset from a JSON array of objects.
    ///
    /// Columns follow the order keys first appear in the input; an object
    /// lacking a key gets an empty cell for it.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;
        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        let objects = array
            .iter()
            .map(|item| item.as_object().ok_or_else(|| anyhow!("Items in array must be objects")))
            .collect::<Result<Vec<_>>>()?;

        let mut headers: Vec<String> = Vec::new();
        for obj in &objects {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|obj| {
                headers
                    .iter()
                    .map(|header| json_cell(header, obj.get(header)))
                    .collect::<Result<Vec<String>>>()
            })
            .collect::<Result<Vec<Vec<String>>>>()?;

        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column, matched case-insensitively like the CSV headers
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Iterate one column's trimmed cells; `None` for missing cells
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows.iter().map(move |row| {
            row.get(index)
                .map(|cell| cell.trim())
                .filter(|cell| !is_missing(cell))
        })
    }
}

/// Whether a raw cell counts as a missing value
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty()
        || ["na", "n/a", "null", "nan", "none"]
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

fn json_cell(header: &str, value: Option<&Value>) -> Result<String> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) | None => Ok(String::new()),
        Some(_) => Err(anyhow!("Unsupported value type for field '{}'", header)),
    }
}
