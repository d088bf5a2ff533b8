use std::collections::HashMap;
use tracing::debug;

use crate::collapse::CollapsedCounts;
use crate::time::{Bucket, TimeUnit};

/// Fraction of the whisker range added on each side of a distribution axis
const DISPLAY_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Distribution,
    Composition,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Distribution => "distribution",
            ChartKind::Composition => "composition",
        }
    }
}

/// One chart per analysed column; immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub variable: String,
    pub time_unit: TimeUnit,
    /// Shared x-axis, chronological
    pub buckets: Vec<Bucket>,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Distribution(DistributionData),
    Composition(CompositionData),
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self.data {
            ChartData::Distribution(_) => ChartKind::Distribution,
            ChartData::Composition(_) => ChartKind::Composition,
        }
    }

    pub fn title(&self) -> String {
        format!("{} by {}", self.variable, self.time_unit)
    }

    pub fn bucket_labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label(self.time_unit)).collect()
    }
}

// =============================================================================
// Distribution
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionData {
    /// Non-outlier range over the whole column
    pub whisker_range: (f64, f64),
    /// Whisker range widened by the display margin; fixed across buckets
    pub display_range: (f64, f64),
    /// One entry per axis bucket, in axis order
    pub summaries: Vec<BucketSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketSummary {
    pub bucket: Bucket,
    pub count: usize,
    /// `None` when the bucket holds no values for this column
    pub stats: Option<BoxStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    /// Values outside the column's whisker range; kept, drawn flagged
    pub outliers: Vec<f64>,
}

/// Box-plot summary of a continuous column per bucket
pub fn build_distribution(
    variable: &str,
    unit: TimeUnit,
    axis: &[Bucket],
    row_buckets: &[Bucket],
    values: &[Option<&str>],
) -> ChartSpec {
    // 1. Parse numbers; unparseable cells count as missing
    let mut by_bucket: HashMap<Bucket, Vec<f64>> = HashMap::new();
    let mut all_values = Vec::new();
    let mut unparseable = 0usize;
    for (bucket, value) in row_buckets.iter().zip(values) {
        let Some(raw) = value else { continue };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => {
                by_bucket.entry(*bucket).or_default().push(v);
                all_values.push(v);
            }
            _ => unparseable += 1,
        }
    }
    if unparseable > 0 {
        debug!(column = variable, unparseable, "treating non-numeric cells as missing");
    }

    // 2. Column-wide whiskers fix the display range for every bucket
    all_values.sort_by(f64::total_cmp);
    let whisker_range = whisker_bounds(&all_values).unwrap_or((0.0, 1.0));
    let display_range = pad_range(whisker_range);

    // 3. Per-bucket boxes
    let summaries = axis
        .iter()
        .map(|bucket| {
            let mut ys = by_bucket.remove(bucket).unwrap_or_default();
            ys.sort_by(f64::total_cmp);
            BucketSummary {
                bucket: *bucket,
                count: ys.len(),
                stats: box_stats(&ys, whisker_range),
            }
        })
        .collect();

    ChartSpec {
        variable: variable.to_string(),
        time_unit: unit,
        buckets: axis.to_vec(),
        data: ChartData::Distribution(DistributionData {
            whisker_range,
            display_range,
            summaries,
        }),
    }
}

/// Lowest and highest values within 1.5 IQR of the quartiles
fn whisker_bounds(sorted: &[f64]) -> Option<(f64, f64)> {
    let (first, last) = (*sorted.first()?, *sorted.last()?);
    let q1 = percentile(sorted, 0.25);
    let q3 = percentile(sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower = sorted.iter().copied().find(|&v| v >= lower_fence).unwrap_or(first);
    let upper = sorted.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(last);
    Some((lower, upper))
}

fn box_stats(sorted: &[f64], column_whiskers: (f64, f64)) -> Option<BoxStats> {
    let (lower_whisker, upper_whisker) = whisker_bounds(sorted)?;
    let outliers = sorted
        .iter()
        .copied()
        .filter(|&v| v < column_whiskers.0 || v > column_whiskers.1)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1: percentile(sorted, 0.25),
        median: percentile(sorted, 0.5),
        q3: percentile(sorted, 0.75),
        upper_whisker,
        outliers,
    })
}

fn pad_range((min, max): (f64, f64)) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * DISPLAY_MARGIN;
        (min - padding, max + padding)
    }
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

// =============================================================================
// Composition
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionData {
    /// Legend order: by global frequency, synthetic Others last
    pub categories: Vec<String>,
    pub shares: Vec<ShareRow>,
    /// Distinct values seen before top-K collapsing
    pub distinct: usize,
    /// Synthetic category holding the collapsed tail, if any
    pub others: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRow {
    pub bucket: Bucket,
    pub category: String,
    pub count: usize,
    /// Percent of the bucket total
    pub share: f64,
}

impl CompositionData {
    pub fn shares_in(&self, bucket: Bucket) -> impl Iterator<Item = &ShareRow> {
        self.shares.iter().filter(move |row| row.bucket == bucket)
    }
}

/// Normalized stacked composition from collapsed counts
pub fn build_composition(variable: &str, unit: TimeUnit, axis: &[Bucket], collapsed: CollapsedCounts) -> ChartSpec {
    let mut totals: HashMap<Bucket, usize> = HashMap::new();
    for row in &collapsed.counts {
        *totals.entry(row.bucket).or_default() += row.count;
    }

    let shares = collapsed
        .counts
        .into_iter()
        .map(|row| {
            let total = totals[&row.bucket] as f64;
            ShareRow {
                share: row.count as f64 / total * 100.0,
                bucket: row.bucket,
                category: row.category,
                count: row.count,
            }
        })
        .collect();

    ChartSpec {
        variable: variable.to_string(),
        time_unit: unit,
        buckets: axis.to_vec(),
        data: ChartData::Composition(CompositionData {
            categories: collapsed.categories,
            shares,
            distinct: collapsed.distinct,
            others: collapsed.others_label,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::{collapse_categories, TOP_K};
    use crate::time::parse_timestamp;

    fn bucket(s: &str) -> Bucket {
        Bucket(parse_timestamp(s).unwrap())
    }

    fn distribution(spec: &ChartSpec) -> &DistributionData {
        match &spec.data {
            ChartData::Distribution(d) => d,
            _ => panic!("Expected distribution"),
        }
    }

    fn composition(spec: &ChartSpec) -> &CompositionData {
        match &spec.data {
            ChartData::Composition(c) => c,
            _ => panic!("Expected composition"),
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.5), 2.5);
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 1.0), 4.0);
        assert_eq!(percentile(&[7.0], 0.25), 7.0);
    }

    #[test]
    fn test_whiskers_exclude_outlier() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let (lo, hi) = whisker_bounds(&data).unwrap();
        assert_eq!(lo, 1.0);
        assert_eq!(hi, 5.0);
    }

    #[test]
    fn test_distribution_display_range_and_outliers() {
        let b1 = bucket("2020-01-01");
        let b2 = bucket("2021-01-01");
        let row_buckets = vec![b1, b1, b1, b2, b2, b2];
        let values = vec![Some("1"), Some("2"), Some("3"), Some("4"), Some("5"), Some("100")];

        let spec = build_distribution("x", TimeUnit::Year, &[b1, b2], &row_buckets, &values);
        assert_eq!(spec.kind(), ChartKind::Distribution);
        let data = distribution(&spec);

        assert_eq!(data.whisker_range, (1.0, 5.0));
        let (lo, hi) = data.display_range;
        assert!((lo - 0.6).abs() < 1e-9);
        assert!((hi - 5.4).abs() < 1e-9);

        let second = data.summaries[1].stats.as_ref().unwrap();
        assert_eq!(second.outliers, vec![100.0]);
        assert_eq!(data.summaries[1].count, 3);
    }

    #[test]
    fn test_distribution_empty_bucket_is_blank() {
        let b1 = bucket("2020-01-01");
        let b2 = bucket("2020-02-01");
        let spec = build_distribution("x", TimeUnit::Month, &[b1, b2], &[b1, b2], &[Some("1.5"), None]);
        let data = distribution(&spec);
        assert!(data.summaries[0].stats.is_some());
        assert_eq!(data.summaries[1].count, 0);
        assert!(data.summaries[1].stats.is_none());
        // single distinct value pads by one unit
        assert_eq!(data.display_range, (0.5, 2.5));
    }

    #[test]
    fn test_distribution_ignores_unparseable() {
        let b1 = bucket("2020-01-01");
        let spec = build_distribution("x", TimeUnit::Month, &[b1], &[b1, b1], &[Some("abc"), Some("2")]);
        assert_eq!(distribution(&spec).summaries[0].count, 1);
    }

    #[test]
    fn test_composition_shares_sum_to_100() {
        let b1 = bucket("2020-01-01");
        let b2 = bucket("2020-02-01");
        let b3 = bucket("2020-03-01");
        let row_buckets = vec![b1, b1, b1, b2];
        let values = vec![Some("a"), Some("b"), Some("b"), Some("a")];
        let collapsed = collapse_categories(&row_buckets, &values, TOP_K);

        let spec = build_composition("cat", TimeUnit::Month, &[b1, b2, b3], collapsed);
        assert_eq!(spec.kind(), ChartKind::Composition);
        let data = composition(&spec);

        let total_b1: f64 = data.shares_in(b1).map(|r| r.share).sum();
        assert!((total_b1 - 100.0).abs() < 1e-9);
        let b_share = data.shares_in(b1).find(|r| r.category == "b").unwrap();
        assert!((b_share.share - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(data.shares_in(b2).count(), 1);
        assert_eq!(data.shares_in(b3).count(), 0);
        assert_eq!(spec.bucket_labels(), vec!["2020-01", "2020-02", "2020-03"]);
    }
}
