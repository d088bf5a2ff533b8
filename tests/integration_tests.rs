use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use autotrend::analysis::{Analyzer, NoProgress, TextDisplay};
use autotrend::chart::{ChartData, ChartKind};
use autotrend::source::{ingest, CsvFileSource};
use autotrend::time::TimeUnit;
use autotrend::{AnalysisConfig, AnalysisError, Warning};

/// Helper function to run autotrend with arguments and CSV on stdin
fn run_autotrend(args: &[&str], csv_content: &str) -> Result<String, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_autotrend"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    // Write CSV to stdin
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(csv_content.as_bytes())
            .map_err(|e| format!("Failed to write to stdin: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn load(path: &str, date_column: &str) -> autotrend::data::Dataset {
    let source = CsvFileSource { path: path.into() };
    ingest(&source, date_column).expect("Failed to load fixture")
}

#[test]
fn test_cli_decade_of_monthly_rows() {
    let csv = fs::read_to_string("test/monthly_sales.csv").expect("Failed to read test CSV");
    let result = run_autotrend(&["--date-column", "date"], &csv);
    assert!(result.is_ok(), "Failed: {:?}", result.err());

    let stdout = result.unwrap();
    assert!(stdout.contains("Page 1/1 (2x2 grid)"), "stdout: {}", stdout);
    assert!(stdout.contains("revenue [distribution]"));
    assert!(stdout.contains("region [composition]"));
    assert!(stdout.contains("warning: column 'notes'"));
    assert!(stdout.contains("2 chart(s) generated at year resolution"));
}

#[test]
fn test_cli_invalid_date_column_fails() {
    let csv = fs::read_to_string("test/bad_dates.csv").expect("Failed to read test CSV");
    let result = run_autotrend(&["--date-column", "date"], &csv);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("invalid date column 'date'"));
}

#[test]
fn test_cli_requires_date_column() {
    let result = run_autotrend(&[], "date,v\n2020-01-01,1\n");
    assert!(result.is_err());
}

#[test]
fn test_cli_fixed_time_unit() {
    let csv = fs::read_to_string("test/monthly_sales.csv").expect("Failed to read test CSV");
    let result = run_autotrend(&["--date-column", "date", "--time-unit", "month"], &csv);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(result.unwrap().contains("at month resolution"));
}

#[test]
fn test_cli_exports_png_per_chart() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("charts");
    let csv = fs::read_to_string("test/monthly_sales.csv").expect("Failed to read test CSV");

    let result = run_autotrend(
        &["--date-column", "date", "--output-dir", out.to_str().unwrap()],
        &csv,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());

    for name in ["revenue.png", "region.png"] {
        let bytes = fs::read(out.join(name)).expect("Missing exported chart");
        assert!(is_valid_png(&bytes), "{} is not a valid PNG", name);
    }
    assert!(!out.join("notes.png").exists());
    assert!(!out.join("date.png").exists());
}

#[test]
fn test_decade_report() {
    let data = load("test/monthly_sales.csv", "date");
    let report = Analyzer::new(AnalysisConfig::new("date"))
        .with_progress(NoProgress)
        .analyze(&data)
        .unwrap();

    assert_eq!(report.time_unit, TimeUnit::Year);
    assert_eq!(report.chart_count(), 2);
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.warnings, vec![Warning::AllMissingColumn { column: "notes".to_string() }]);

    let revenue = &report.charts[0];
    assert_eq!(revenue.kind(), ChartKind::Distribution);
    assert_eq!(revenue.buckets.len(), 10);
    let ChartData::Distribution(dist) = &revenue.data else {
        panic!("Expected distribution");
    };
    // The spike in 2014 is kept as an outlier, not dropped
    let outliers: Vec<f64> = dist
        .summaries
        .iter()
        .filter_map(|s| s.stats.as_ref())
        .flat_map(|s| s.outliers.iter().copied())
        .collect();
    assert!(outliers.iter().any(|&v| v > 5000.0));
    assert!(dist.display_range.1 < 6000.0);
}

#[test]
fn test_high_cardinality_collapsed() {
    let data = load("test/cities.csv", "timestamp");
    let report = Analyzer::new(AnalysisConfig::new("timestamp"))
        .with_progress(NoProgress)
        .analyze(&data)
        .unwrap();

    assert_eq!(report.time_unit, TimeUnit::Minute);
    assert_eq!(report.chart_count(), 2);
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        Warning::HighCardinalityCategorical { column, distinct: 15, .. } if column == "city"
    )));

    let ChartData::Composition(city) = &report.charts[0].data else {
        panic!("Expected composition");
    };
    assert_eq!(city.categories.len(), 11);
    assert_eq!(city.others.as_deref(), Some("Others"));
    for bucket in &report.charts[0].buckets {
        let total: f64 = city.shares_in(*bucket).map(|row| row.share).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    // two distinct values stay categorical at the default threshold
    assert_eq!(report.charts[1].variable, "visits");
    assert_eq!(report.charts[1].kind(), ChartKind::Composition);
}

#[test]
fn test_invalid_dates_produce_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let data = load("test/bad_dates.csv", "date");
    let mut config = AnalysisConfig::new("date");
    config.output_directory = Some(dir.path().join("out"));
    let mut display = TextDisplay::new(Vec::new());

    let result = Analyzer::new(config)
        .with_display(&mut display)
        .with_progress(NoProgress)
        .analyze(&data);

    assert!(matches!(result, Err(AnalysisError::InvalidDateColumn { .. })));
    assert!(display.into_inner().is_empty());
    assert!(!Path::new(&dir.path().join("out")).exists());
}
