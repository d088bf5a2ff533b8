// Library exports for autotrend

pub mod csv_reader;
pub mod data;
pub mod source;
pub mod profile;
pub mod time;

// Analysis pipeline
pub mod classify;
pub mod collapse;
pub mod chart;
pub mod page;
pub mod analysis;

// Output collaborators
pub mod graph;
pub mod export;

pub mod config;
pub mod error;
pub mod logging;

pub use analysis::{AnalysisReport, Analyzer};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Warning};

use serde::Deserialize;

/// Pixel size of exported charts and rendered pages
#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}
