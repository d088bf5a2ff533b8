use crate::profile::{ColumnMetadata, ColumnType};

/// Default distinct-count threshold separating continuous from categorical numerics
pub const DEFAULT_CATEGORICAL_THRESHOLD: usize = 2;

/// Why a column produced no chart
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    AllMissing,
    DateColumn,
    UnsupportedType(ColumnType),
}

/// Visualization decision for one column
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Skip(SkipReason),
    /// Box-plot summary per bucket
    Distribution,
    /// Stacked share of each category per bucket
    Composition,
}

/// Decide how (or whether) to chart a column.
///
/// Rules are applied in order; the first match wins:
/// 1. entirely missing columns are skipped
/// 2. the date column itself is skipped
/// 3. types other than integer/logical/numeric/factor/character are skipped
/// 4. numeric or integer columns with more than `threshold` distinct values get a distribution
/// 5. everything else is treated as categorical
pub fn classify_column(meta: &ColumnMetadata, date_column: &str, threshold: usize) -> Decision {
    if meta.missing_fraction >= 1.0 {
        return Decision::Skip(SkipReason::AllMissing);
    }

    if meta.name.eq_ignore_ascii_case(date_column) {
        return Decision::Skip(SkipReason::DateColumn);
    }

    match &meta.column_type {
        ColumnType::Numeric | ColumnType::Integer if meta.distinct_count > threshold => {
            Decision::Distribution
        }
        ColumnType::Numeric
        | ColumnType::Integer
        | ColumnType::Logical
        | ColumnType::Factor
        | ColumnType::Character => Decision::Composition,
        other => Decision::Skip(SkipReason::UnsupportedType(other.clone())),
    }
}
