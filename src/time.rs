use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::Dataset;
use crate::error::AnalysisError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Bucket granularity of the shared time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    /// strftime pattern used for bucket labels on the x-axis
    pub fn label_format(&self) -> &'static str {
        match self {
            TimeUnit::Second => "%Y-%m-%d %H:%M:%S",
            TimeUnit::Minute => "%Y-%m-%d %H:%M",
            TimeUnit::Hour => "%Y-%m-%d %H:00",
            TimeUnit::Month => "%Y-%m",
            TimeUnit::Year => "%Y",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" => Ok(TimeUnit::Second),
            "minute" | "minutes" => Ok(TimeUnit::Minute),
            "hour" | "hours" => Ok(TimeUnit::Hour),
            "month" | "months" => Ok(TimeUnit::Month),
            "year" | "years" => Ok(TimeUnit::Year),
            other => Err(format!(
                "unknown time unit '{}' (expected auto, second, minute, hour, month or year)",
                other
            )),
        }
    }
}

/// Caller-facing time unit choice: a fixed unit or inference from the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeUnitSetting {
    #[default]
    Auto,
    Fixed(TimeUnit),
}

impl FromStr for TimeUnitSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(TimeUnitSetting::Auto)
        } else {
            s.parse().map(TimeUnitSetting::Fixed)
        }
    }
}

impl TryFrom<String> for TimeUnitSetting {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeUnitSetting> for String {
    fn from(setting: TimeUnitSetting) -> Self {
        match setting {
            TimeUnitSetting::Auto => "auto".to_string(),
            TimeUnitSetting::Fixed(unit) => unit.as_str().to_string(),
        }
    }
}

/// A floored timestamp used as the x-axis grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket(pub NaiveDateTime);

impl Bucket {
    pub fn start(&self) -> NaiveDateTime {
        self.0
    }

    pub fn label(&self, unit: TimeUnit) -> String {
        self.0.format(unit.label_format()).to_string()
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Parse one cell as a UTC-normalized timestamp
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    const DATETIME_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    // Year-month ("2020-07") and bare four digit years
    if value.len() == 7 && value.as_bytes()[4] == b'-' {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        let year = value.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0);
    }

    None
}

/// Convert the date column into one timestamp per row.
///
/// Fails when the column is absent, when there are no rows left, or when any
/// cell cannot be read as a date or timestamp.
pub fn normalize_time_axis(data: &Dataset, date_column: &str) -> Result<Vec<NaiveDateTime>, AnalysisError> {
    let idx = data
        .column_index(date_column)
        .ok_or_else(|| AnalysisError::invalid_date(date_column, "column not found"))?;

    if data.row_count() == 0 {
        return Err(AnalysisError::invalid_date(date_column, "column has no non-missing values"));
    }

    data.column_values(idx)
        .enumerate()
        .map(|(row_idx, cell)| {
            let cell = cell.ok_or_else(|| {
                AnalysisError::invalid_date(date_column, format!("missing value at row {}", row_idx + 1))
            })?;
            parse_timestamp(cell).ok_or_else(|| {
                AnalysisError::invalid_date(
                    date_column,
                    format!("'{}' at row {} is not a recognizable date or timestamp", cell, row_idx + 1),
                )
            })
        })
        .collect()
}

// =============================================================================
// Unit inference and bucketing
// =============================================================================

/// Pick the unit for a span; first matching threshold wins
pub fn unit_for_span(span_seconds: i64) -> TimeUnit {
    if span_seconds > 2 * SECONDS_PER_YEAR {
        TimeUnit::Year
    } else if span_seconds > 35 * SECONDS_PER_DAY {
        TimeUnit::Month
    } else if span_seconds > 6 * SECONDS_PER_HOUR {
        TimeUnit::Hour
    } else if span_seconds > 10 * SECONDS_PER_MINUTE {
        TimeUnit::Minute
    } else {
        TimeUnit::Second
    }
}

/// Infer the unit from the full span of the time axis
pub fn infer_time_unit(values: &[NaiveDateTime]) -> TimeUnit {
    let min = values.iter().min();
    let max = values.iter().max();
    match (min, max) {
        (Some(min), Some(max)) => unit_for_span((*max - *min).num_seconds()),
        _ => TimeUnit::Second,
    }
}

pub fn resolve_time_unit(setting: TimeUnitSetting, values: &[NaiveDateTime]) -> TimeUnit {
    match setting {
        TimeUnitSetting::Fixed(unit) => unit,
        TimeUnitSetting::Auto => infer_time_unit(values),
    }
}

/// Truncate a timestamp to the start of its unit period
pub fn floor_to_unit(value: NaiveDateTime, unit: TimeUnit) -> NaiveDateTime {
    let date = value.date();
    let floored = match unit {
        TimeUnit::Second => value.with_nanosecond(0),
        TimeUnit::Minute => date.and_hms_opt(value.hour(), value.minute(), 0),
        TimeUnit::Hour => date.and_hms_opt(value.hour(), 0, 0),
        TimeUnit::Month => date.with_day(1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        TimeUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
    };
    // Every unit start exists in the proleptic calendar
    floored.unwrap_or(value)
}

pub fn bucketize(values: &[NaiveDateTime], unit: TimeUnit) -> Vec<Bucket> {
    values.iter().map(|&v| Bucket(floor_to_unit(v, unit))).collect()
}

/// Distinct buckets in chronological order
pub fn bucket_axis(buckets: &[Bucket]) -> Vec<Bucket> {
    let mut axis = buckets.to_vec();
    axis.sort();
    axis.dedup();
    axis
}
