use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::data::Dataset;
use crate::time::parse_timestamp;

/// Storage type of a column as seen by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Logical,
    Numeric,
    Factor,
    Character,
    Other(String),
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Logical => write!(f, "logical"),
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Factor => write!(f, "factor"),
            ColumnType::Character => write!(f, "character"),
            ColumnType::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub column_type: ColumnType,
    pub missing_fraction: f64,
    pub distinct_count: usize,
}

/// Produces one metadata record per column, in column order
pub trait ColumnProfiler {
    fn profile(&self, data: &Dataset) -> Vec<ColumnMetadata>;
}

/// Infers column types from cell text; declared types win over inference.
#[derive(Debug, Clone, Default)]
pub struct InferringProfiler {
    declared: HashMap<String, ColumnType>,
}

impl InferringProfiler {
    pub fn new(declared: HashMap<String, ColumnType>) -> Self {
        Self { declared }
    }

    fn declared_type(&self, column: &str) -> Option<&ColumnType> {
        self.declared
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, column_type)| column_type)
    }
}

impl ColumnProfiler for InferringProfiler {
    fn profile(&self, data: &Dataset) -> Vec<ColumnMetadata> {
        data.headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let present: Vec<&str> = data.column_values(idx).flatten().collect();
                let missing = data.row_count() - present.len();
                let missing_fraction = if data.row_count() == 0 {
                    1.0
                } else {
                    missing as f64 / data.row_count() as f64
                };
                let distinct_count = present.iter().map(|v| v.trim()).collect::<HashSet<_>>().len();

                let column_type = match self.declared_type(name) {
                    Some(declared) => declared.clone(),
                    None => infer_column_type(&present),
                };

                ColumnMetadata {
                    name: name.clone(),
                    column_type,
                    missing_fraction,
                    distinct_count,
                }
            })
            .collect()
    }
}

/// Narrowest type that accepts every present value
pub fn infer_column_type(values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Logical;
    }

    let all = |pred: fn(&str) -> bool| values.iter().all(|v| pred(v.trim()));

    if all(|v| parse_logical(v).is_some()) {
        ColumnType::Logical
    } else if all(|v| v.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if all(|v| v.parse::<f64>().is_ok()) {
        ColumnType::Numeric
    } else if all(|v| parse_timestamp(v).is_some()) {
        ColumnType::Other("date".to_string())
    } else {
        ColumnType::Character
    }
}

pub fn parse_logical(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" => Some(true),
        "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset(headers: Vec<&str>, rows: Vec<Vec<&str>>) -> Dataset {
        Dataset::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_infer_column_type_order() {
        assert_eq!(infer_column_type(&["true", "FALSE"]), ColumnType::Logical);
        assert_eq!(infer_column_type(&["1", "2", "-3"]), ColumnType::Integer);
        assert_eq!(infer_column_type(&["1", "2.5"]), ColumnType::Numeric);
        assert_eq!(
            infer_column_type(&["2020-01-01", "2021-06-30"]),
            ColumnType::Other("date".to_string())
        );
        assert_eq!(infer_column_type(&["red", "blue"]), ColumnType::Character);
    }

    #[test]
    fn test_profile_missing_and_distinct() {
        let data = make_dataset(
            vec!["date", "score", "empty"],
            vec![
                vec!["2020-01-01", "1.5", ""],
                vec!["2020-01-02", "", "NA"],
                vec!["2020-01-03", "1.5", ""],
                vec!["2020-01-04", "2.5", ""],
            ],
        );
        let meta = InferringProfiler::default().profile(&data);
        assert_eq!(meta.len(), 3);

        assert_eq!(meta[1].name, "score");
        assert_eq!(meta[1].column_type, ColumnType::Numeric);
        assert_eq!(meta[1].missing_fraction, 0.25);
        assert_eq!(meta[1].distinct_count, 2);

        assert_eq!(meta[2].missing_fraction, 1.0);
        assert_eq!(meta[2].distinct_count, 0);
    }

    #[test]
    fn test_declared_type_overrides_inference() {
        let data = make_dataset(vec!["grade"], vec![vec!["1"], vec!["2"], vec!["3"]]);
        let mut declared = HashMap::new();
        declared.insert("Grade".to_string(), ColumnType::Factor);
        let meta = InferringProfiler::new(declared).profile(&data);
        assert_eq!(meta[0].column_type, ColumnType::Factor);
    }

    #[test]
    fn test_column_type_deserialize() {
        let parsed: ColumnType = serde_json::from_str("\"factor\"").unwrap();
        assert_eq!(parsed, ColumnType::Factor);
    }
}
