use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analysis::{ChartExporter, PageDisplay};
use crate::chart::ChartSpec;
use crate::graph::{render_chart_png, render_page_png};
use crate::page::Page;
use crate::RenderOptions;

/// Writes each chart as a PNG file
pub struct PngExporter {
    options: RenderOptions,
}

impl PngExporter {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl ChartExporter for PngExporter {
    fn export(&mut self, chart: &ChartSpec, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        }

        let png = render_chart_png(chart, &self.options)?;
        std::fs::write(path, png).with_context(|| format!("Failed to write '{}'", path.display()))?;

        info!(column = %chart.variable, path = %path.display(), "exported chart");
        Ok(())
    }
}

/// Displays pages by rendering them to `page_001.png`, `page_002.png`, ...
pub struct PngPageDisplay {
    dir: PathBuf,
    options: RenderOptions,
    written: Vec<PathBuf>,
}

impl PngPageDisplay {
    pub fn new(dir: impl Into<PathBuf>, options: RenderOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

pub fn page_file_name(index: usize) -> String {
    format!("page_{:03}.png", index + 1)
}

impl PageDisplay for PngPageDisplay {
    fn show(&mut self, page: &Page, index: usize, total: usize) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create page directory '{}'", self.dir.display()))?;

        let path = self.dir.join(page_file_name(index));
        let png = render_page_png(page, &self.options)?;
        std::fs::write(&path, png).with_context(|| format!("Failed to write '{}'", path.display()))?;

        debug!(page = index + 1, total, path = %path.display(), "rendered page");
        self.written.push(path);
        Ok(())
    }
}
