use std::path::{Path, PathBuf};

use crate::chart::ChartSpec;

pub const GRID_ROWS: usize = 2;
pub const GRID_COLS: usize = 2;
pub const CHARTS_PER_PAGE: usize = GRID_ROWS * GRID_COLS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// The only chart of the run, drawn full size
    Single,
    Grid { rows: usize, cols: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    /// Column-major placement: fill the first column top to bottom, then the next
    pub fn for_slot(slot: usize) -> Self {
        GridCell {
            row: slot % GRID_ROWS,
            col: slot / GRID_ROWS,
        }
    }

    /// Index into a row-major split of the page area
    pub fn area_index(&self) -> usize {
        self.row * GRID_COLS + self.col
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedChart {
    pub cell: GridCell,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub layout: PageLayout,
    pub charts: Vec<PlacedChart>,
}

impl Page {
    pub fn variables(&self) -> Vec<&str> {
        self.charts.iter().map(|p| p.chart.variable.as_str()).collect()
    }
}

/// Group charts into 2x2 pages, preserving their order
pub fn paginate(charts: &[ChartSpec]) -> Vec<Page> {
    if charts.len() == 1 {
        return vec![Page {
            layout: PageLayout::Single,
            charts: vec![PlacedChart {
                cell: GridCell { row: 0, col: 0 },
                chart: charts[0].clone(),
            }],
        }];
    }

    charts
        .chunks(CHARTS_PER_PAGE)
        .map(|chunk| Page {
            layout: PageLayout::Grid { rows: GRID_ROWS, cols: GRID_COLS },
            charts: chunk
                .iter()
                .enumerate()
                .map(|(slot, chart)| PlacedChart {
                    cell: GridCell::for_slot(slot),
                    chart: chart.clone(),
                })
                .collect(),
        })
        .collect()
}

/// One export target per chart
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub chart_index: usize,
    pub path: PathBuf,
}

pub fn export_requests(charts: &[ChartSpec], output_dir: &Path) -> Vec<ExportRequest> {
    charts
        .iter()
        .enumerate()
        .map(|(chart_index, chart)| ExportRequest {
            chart_index,
            path: output_dir.join(export_file_name(&chart.variable)),
        })
        .collect()
}

/// Lower-cased column name with every non-alphanumeric character replaced by `_`
pub fn export_file_name(column: &str) -> String {
    let stem: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}.png", stem)
}
