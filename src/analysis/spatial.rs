/// Stacking in space: one spatial-mean series across stations, reshaped
/// into one column per year.
///
/// A zero reading is treated as "no reading", same as a missing value, so
/// the mean for a timestamp only counts stations that actually reported.

use crate::analysis::grouping::group_by_year;
use crate::analysis::leap_day::drop_leap_days;
use crate::analysis::nan_mean;
use crate::model::{AnalysisError, Result, StackedYearTable, TimeSeriesTable};

/// Column name of the spatial-mean series.
pub const SPATIAL_MEAN_COLUMN: &str = "spatial_mean";

/// Row label format for the year-stacked table.
pub const OFFSET_LABEL_FORMAT: &str = "%m/%d %H:%M:%S";

/// Output of `stack_in_space`.
#[derive(Debug, Clone)]
pub struct SpatialStack {
    /// Station mean per timestamp, February 29 removed.
    pub spatial_mean: TimeSeriesTable,
    /// The same values with one column per year.
    pub by_year: StackedYearTable,
}

/// Mean over stations of a single row, skipping missing and zero readings.
/// `NaN` when no station reported.
pub fn station_mean(row: &[f64]) -> f64 {
    nan_mean(row.iter().copied().filter(|v| !v.is_nan() && *v != 0.0))
}

/// Collapses all station columns of `table` into one mean series and lines
/// the years up side by side.
///
/// The earliest year fixes the row count and the `"MM/DD HH:MM:SS"` labels.
/// Any year with a different row count is rejected with
/// `AnalysisError::YearLengthMismatch`; rows are never dropped or padded
/// to make years fit.
pub fn stack_in_space(table: &TimeSeriesTable) -> Result<SpatialStack> {
    let table = drop_leap_days(table);
    if table.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "stack_in_space needs at least one row outside February 29",
        ));
    }

    let means: Vec<f64> = (0..table.len()).map(|r| station_mean(&table.row(r))).collect();
    let spatial_mean = TimeSeriesTable::from_series(table.index().to_vec(), SPATIAL_MEAN_COLUMN, means)?;

    let buckets = group_by_year(&spatial_mean);

    let (_, canonical) = buckets
        .iter()
        .next()
        .ok_or(AnalysisError::EmptyInput("stack_in_space produced no year buckets"))?;
    let labels: Vec<String> = canonical
        .index()
        .iter()
        .map(|ts| ts.format(OFFSET_LABEL_FORMAT).to_string())
        .collect();

    let mut years = Vec::with_capacity(buckets.len());
    let mut columns = Vec::with_capacity(buckets.len());
    for (&year, bucket) in &buckets {
        if bucket.len() != labels.len() {
            return Err(AnalysisError::YearLengthMismatch {
                year,
                expected: labels.len(),
                found: bucket.len(),
            });
        }
        years.push(year);
        columns.push(bucket.column_at(0).to_vec());
    }

    let by_year = StackedYearTable::new(labels, years, columns)?;

    Ok(SpatialStack {
        spatial_mean,
        by_year,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
