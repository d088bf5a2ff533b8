use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::chart::{build_composition, build_distribution, ChartSpec};
use crate::classify::{classify_column, Decision, SkipReason};
use crate::collapse::{collapse_categories, TOP_K};
use crate::config::AnalysisConfig;
use crate::data::Dataset;
use crate::error::{AnalysisError, Warning};
use crate::export::PngExporter;
use crate::page::{export_requests, paginate, Page, PageLayout};
use crate::profile::{ColumnProfiler, InferringProfiler};
use crate::time::{bucket_axis, bucketize, normalize_time_axis, resolve_time_unit, Bucket, TimeUnit};

// =============================================================================
// Collaborators
// =============================================================================

/// Receives finished pages, one at a time and in order
pub trait PageDisplay {
    fn show(&mut self, page: &Page, index: usize, total: usize) -> anyhow::Result<()>;
}

/// Writes one chart to a target path
pub trait ChartExporter {
    fn export(&mut self, chart: &ChartSpec, path: &Path) -> anyhow::Result<()>;
}

pub trait ProgressReporter {
    fn column_started(&mut self, index: usize, total: usize, column: &str);

    fn finished(&mut self, _charts: usize) {}
}

impl<T: PageDisplay + ?Sized> PageDisplay for &mut T {
    fn show(&mut self, page: &Page, index: usize, total: usize) -> anyhow::Result<()> {
        (**self).show(page, index, total)
    }
}

impl<T: ChartExporter + ?Sized> ChartExporter for &mut T {
    fn export(&mut self, chart: &ChartSpec, path: &Path) -> anyhow::Result<()> {
        (**self).export(chart, path)
    }
}

impl<T: ProgressReporter + ?Sized> ProgressReporter for &mut T {
    fn column_started(&mut self, index: usize, total: usize, column: &str) {
        (**self).column_started(index, total, column)
    }

    fn finished(&mut self, charts: usize) {
        (**self).finished(charts)
    }
}

/// Progress as debug-level log events
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn column_started(&mut self, index: usize, total: usize, column: &str) {
        debug!("[{}/{}] analysing '{}'", index + 1, total, column);
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn column_started(&mut self, _index: usize, _total: usize, _column: &str) {}
}

/// Prints each page's grid as text
pub struct TextDisplay<W> {
    out: W,
}

impl<W: Write> TextDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PageDisplay for TextDisplay<W> {
    fn show(&mut self, page: &Page, index: usize, total: usize) -> anyhow::Result<()> {
        match page.layout {
            PageLayout::Single => {
                writeln!(self.out, "Page {}/{} (full size)", index + 1, total)?;
                for placed in &page.charts {
                    writeln!(self.out, "  {} [{}]", placed.chart.variable, placed.chart.kind().as_str())?;
                }
            }
            PageLayout::Grid { rows, cols } => {
                writeln!(self.out, "Page {}/{} ({}x{} grid)", index + 1, total, rows, cols)?;
                for row in 0..rows {
                    let cells: Vec<String> = (0..cols)
                        .map(|col| {
                            page.charts
                                .iter()
                                .find(|p| p.cell.row == row && p.cell.col == col)
                                .map(|p| format!("{} [{}]", p.chart.variable, p.chart.kind().as_str()))
                                .unwrap_or_else(|| "-".to_string())
                        })
                        .collect();
                    writeln!(self.out, "  {}", cells.join(" | "))?;
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Orchestration
// =============================================================================

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub time_unit: TimeUnit,
    pub charts: Vec<ChartSpec>,
    pub pages: Vec<Page>,
    /// In column order
    pub warnings: Vec<Warning>,
    pub exported: Vec<PathBuf>,
}

impl AnalysisReport {
    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }
}

/// Charts and warnings gathered while walking the columns
#[derive(Debug, Default)]
struct Accumulator {
    charts: Vec<ChartSpec>,
    warnings: Vec<Warning>,
}

impl Accumulator {
    fn warn(&mut self, warning: Warning) {
        warn!(column = warning.column(), "{}", warning);
        self.warnings.push(warning);
    }
}

/// Shared time axis for every column of one run
struct TimeAxis {
    unit: TimeUnit,
    row_buckets: Vec<Bucket>,
    axis: Vec<Bucket>,
}

pub struct Analyzer<'a> {
    config: AnalysisConfig,
    profiler: Box<dyn ColumnProfiler + 'a>,
    display: Option<Box<dyn PageDisplay + 'a>>,
    exporter: Box<dyn ChartExporter + 'a>,
    progress: Box<dyn ProgressReporter + 'a>,
}

impl<'a> Analyzer<'a> {
    /// Analyzer with type inference, PNG export and log-based progress
    pub fn new(config: AnalysisConfig) -> Self {
        let profiler = InferringProfiler::new(config.column_types.clone());
        let exporter = PngExporter::new(config.render.clone());
        Self {
            config,
            profiler: Box::new(profiler),
            display: None,
            exporter: Box::new(exporter),
            progress: Box::new(TracingProgress),
        }
    }

    pub fn with_profiler(mut self, profiler: impl ColumnProfiler + 'a) -> Self {
        self.profiler = Box::new(profiler);
        self
    }

    pub fn with_display(mut self, display: impl PageDisplay + 'a) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    /// Used only when the config names an output directory
    pub fn with_exporter(mut self, exporter: impl ChartExporter + 'a) -> Self {
        self.exporter = Box::new(exporter);
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressReporter + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Run the whole pipeline over a dataset whose date column has no missing cells.
    ///
    /// Column problems become warnings; an unusable date column or a failing collaborator aborts the run.
    pub fn analyze(&mut self, data: &Dataset) -> Result<AnalysisReport, AnalysisError> {
        let date_column = self.config.date_column.clone();

        // 1. Time axis
        let time_axis = match self.build_time_axis(data) {
            Ok(axis) => axis,
            Err(err) => {
                warn!("{}; no charts generated", err);
                return Err(err);
            }
        };
        info!(
            rows = data.row_count(),
            unit = %time_axis.unit,
            buckets = time_axis.axis.len(),
            "time axis ready"
        );

        // 2. One decision per column, in column order
        let metadata = self.profiler.profile(data);
        let total = metadata.len();
        let mut acc = Accumulator::default();

        for (idx, meta) in metadata.iter().enumerate() {
            self.progress.column_started(idx, total, &meta.name);

            let decision = classify_column(meta, &date_column, self.config.categorical_threshold);
            let strategy = match decision {
                Decision::Skip(SkipReason::AllMissing) => {
                    acc.warn(Warning::AllMissingColumn { column: meta.name.clone() });
                    continue;
                }
                Decision::Skip(SkipReason::DateColumn) => continue,
                Decision::Skip(SkipReason::UnsupportedType(column_type)) => {
                    acc.warn(Warning::UnsupportedColumnType {
                        column: meta.name.clone(),
                        column_type,
                    });
                    continue;
                }
                strategy => strategy,
            };

            let Some(col_idx) = data.column_index(&meta.name) else {
                debug!(column = %meta.name, "profiled column not present in data");
                continue;
            };
            let values: Vec<Option<&str>> = data.column_values(col_idx).collect();

            let chart = if strategy == Decision::Distribution {
                build_distribution(&meta.name, time_axis.unit, &time_axis.axis, &time_axis.row_buckets, &values)
            } else {
                let collapsed = collapse_categories(&time_axis.row_buckets, &values, TOP_K);
                if collapsed.is_collapsed() {
                    acc.warn(Warning::HighCardinalityCategorical {
                        column: meta.name.clone(),
                        distinct: collapsed.distinct,
                        cap: TOP_K,
                    });
                }
                build_composition(&meta.name, time_axis.unit, &time_axis.axis, collapsed)
            };
            debug!(column = %meta.name, kind = chart.kind().as_str(), "chart built");
            acc.charts.push(chart);
        }

        // 3. Pages
        let pages = paginate(&acc.charts);
        if let Some(display) = self.display.as_mut() {
            for (idx, page) in pages.iter().enumerate() {
                display
                    .show(page, idx, pages.len())
                    .map_err(|source| AnalysisError::Display { page: idx + 1, source })?;
            }
        }

        // 4. Exports
        let mut exported = Vec::new();
        if let Some(dir) = &self.config.output_directory {
            for request in export_requests(&acc.charts, dir) {
                let chart = &acc.charts[request.chart_index];
                self.exporter
                    .export(chart, &request.path)
                    .map_err(|source| AnalysisError::Export {
                        column: chart.variable.clone(),
                        source,
                    })?;
                exported.push(request.path);
            }
        }

        self.progress.finished(acc.charts.len());
        info!(
            charts = acc.charts.len(),
            pages = pages.len(),
            warnings = acc.warnings.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            time_unit: time_axis.unit,
            charts: acc.charts,
            pages,
            warnings: acc.warnings,
            exported,
        })
    }

    fn build_time_axis(&self, data: &Dataset) -> Result<TimeAxis, AnalysisError> {
        let times = normalize_time_axis(data, &self.config.date_column)?;
        let unit = resolve_time_unit(self.config.time_unit, &times);
        let row_buckets = bucketize(&times, unit);
        let axis = bucket_axis(&row_buckets);
        Ok(TimeAxis { unit, row_buckets, axis })
    }
}
