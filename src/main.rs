use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;

use autotrend::analysis::{Analyzer, TextDisplay, TracingProgress};
use autotrend::config::AnalysisConfig;
use autotrend::export::PngPageDisplay;
use autotrend::logging;
use autotrend::source::{ingest, CsvFileSource, CsvReaderSource, DataSource, JsonFileSource};
use autotrend::time::TimeUnitSetting;

#[derive(Parser, Debug)]
#[command(name = "autotrend")]
#[command(about = "Chart how every column of a dataset evolves over time", long_about = None)]
struct Args {
    /// Column holding the timestamps
    #[arg(short, long)]
    date_column: Option<String>,

    /// Input file, or '-' for stdin (default)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Treat the input file as a JSON array of objects
    #[arg(long)]
    json: bool,

    /// Bucket size: auto, second, minute, hour, month or year
    #[arg(short, long)]
    time_unit: Option<TimeUnitSetting>,

    /// Numeric columns with at most this many distinct values are treated as categorical
    #[arg(long)]
    threshold: Option<usize>,

    /// Write one PNG per chart into this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Render each page as a PNG into this directory instead of printing it
    #[arg(long)]
    pages_dir: Option<PathBuf>,

    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Log debug events to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match (&args.config, &args.date_column) {
        (Some(path), _) => AnalysisConfig::from_path(path)?,
        (None, Some(column)) => AnalysisConfig::new(column.clone()),
        (None, None) => anyhow::bail!("--date-column is required when no --config is given"),
    };

    if let Some(column) = &args.date_column {
        config.date_column = column.clone();
    }
    if let Some(unit) = args.time_unit {
        config.time_unit = unit;
    }
    if let Some(threshold) = args.threshold {
        config.categorical_threshold = threshold;
    }
    if let Some(dir) = &args.output_dir {
        config.output_directory = Some(dir.clone());
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    Ok(config)
}

fn open_source(args: &Args) -> Box<dyn DataSource> {
    match &args.input {
        Some(path) if path.as_os_str() != "-" => {
            if args.json {
                Box::new(JsonFileSource { path: path.clone() })
            } else {
                Box::new(CsvFileSource { path: path.clone() })
            }
        }
        _ => Box::new(CsvReaderSource::new("stdin", io::stdin())),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    let config = build_config(&args)?;
    let source = open_source(&args);
    let data = ingest(source.as_ref(), &config.date_column)
        .context("Failed to collect input data")?;

    let analyzer = Analyzer::new(config.clone()).with_progress(TracingProgress);

    let report = match &args.pages_dir {
        Some(dir) => analyzer
            .with_display(PngPageDisplay::new(dir.clone(), config.render.clone()))
            .analyze(&data)?,
        None => analyzer
            .with_display(TextDisplay::new(io::stdout()))
            .analyze(&data)?,
    };

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    for path in &report.exported {
        println!("exported {}", path.display());
    }
    println!(
        "{} chart(s) generated at {} resolution",
        report.chart_count(),
        report.time_unit
    );

    Ok(())
}
