use std::fmt;
use thiserror::Error;

use crate::profile::ColumnType;

/// Conditions that abort an analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid date column '{column}': {reason}")]
    InvalidDateColumn { column: String, reason: String },

    #[error("failed to display page {page}")]
    Display {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to export chart for '{column}'")]
    Export {
        column: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AnalysisError {
    pub fn invalid_date(column: &str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidDateColumn {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-column anomalies. Recorded on the report, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    AllMissingColumn { column: String },
    UnsupportedColumnType { column: String, column_type: ColumnType },
    HighCardinalityCategorical { column: String, distinct: usize, cap: usize },
}

impl Warning {
    /// Name of the column the warning is about
    pub fn column(&self) -> &str {
        match self {
            Warning::AllMissingColumn { column }
            | Warning::UnsupportedColumnType { column, .. }
            | Warning::HighCardinalityCategorical { column, .. } => column,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::AllMissingColumn { column } => {
                write!(f, "column '{}' is completely missing, cannot visualize", column)
            }
            Warning::UnsupportedColumnType { column, column_type } => {
                write!(f, "column '{}' has unsupported type '{}', skipping", column, column_type)
            }
            Warning::HighCardinalityCategorical { column, distinct, cap } => write!(
                f,
                "column '{}' has {} categories, showing the top {} and grouping the rest as Others",
                column, distinct, cap
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_messages_name_column() {
        let warnings = vec![
            Warning::AllMissingColumn { column: "empty".to_string() },
            Warning::UnsupportedColumnType {
                column: "when".to_string(),
                column_type: ColumnType::Other("date".to_string()),
            },
            Warning::HighCardinalityCategorical {
                column: "city".to_string(),
                distinct: 15,
                cap: 10,
            },
        ];
        for warning in &warnings {
            assert!(warning.to_string().contains(warning.column()));
        }
        assert!(warnings[0].to_string().contains("completely missing"));
        assert!(warnings[1].to_string().contains("date"));
        assert!(warnings[2].to_string().contains("10"));
    }

    #[test]
    fn test_invalid_date_display() {
        let err = AnalysisError::invalid_date("ts", "column not found");
        assert_eq!(err.to_string(), "invalid date column 'ts': column not found");
    }
}
