use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::classify::DEFAULT_CATEGORICAL_THRESHOLD;
use crate::profile::ColumnType;
use crate::time::TimeUnitSetting;
use crate::RenderOptions;

/// Settings for one analysis run
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub date_column: String,
    #[serde(default)]
    pub time_unit: TimeUnitSetting,
    #[serde(default = "default_threshold")]
    pub categorical_threshold: usize,
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    /// Declared column types, overriding inference
    #[serde(default)]
    pub column_types: HashMap<String, ColumnType>,
    #[serde(default)]
    pub render: RenderOptions,
}

fn default_threshold() -> usize { DEFAULT_CATEGORICAL_THRESHOLD }

impl AnalysisConfig {
    pub fn new(date_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            time_unit: TimeUnitSetting::Auto,
            categorical_threshold: DEFAULT_CATEGORICAL_THRESHOLD,
            output_directory: None,
            column_types: HashMap::new(),
            render: RenderOptions::default(),
        }
    }

    /// Load a JSON config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config '{}'", path.display()))
    }
}
