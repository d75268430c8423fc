/// Core data types for the seismic stacking pipeline.
///
/// This module defines the shared domain model imported by all other modules:
/// the timestamp-indexed station table, the calendar alignment key, the
/// year-stacked table and its summary statistics, and the error type.
/// It performs no I/O.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Calendar alignment
// ---------------------------------------------------------------------------

/// Cross-year alignment key: two readings from different years line up
/// when their (month, day, hour, minute) match. Year and second are dropped.
///
/// Ordering is chronological within a year because fields compare in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarPosition {
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl CalendarPosition {
    /// Anchor year for the seasonal profile index. It is a leap year, so a
    /// real February 29 keeps its own slot instead of colliding with a
    /// neighbouring day.
    pub const PLACEHOLDER_YEAR: i32 = 2000;

    pub fn of(ts: &NaiveDateTime) -> Self {
        CalendarPosition {
            month: ts.month(),
            day: ts.day(),
            hour: ts.hour(),
            minute: ts.minute(),
        }
    }

    /// Timestamp of this position in the placeholder year, seconds zeroed.
    ///
    /// Always `Some` for positions derived from a real timestamp.
    pub fn placeholder_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(Self::PLACEHOLDER_YEAR, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, 0))
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == 2 && self.day == 29
    }
}

// ---------------------------------------------------------------------------
// Timestamp-indexed station table
// ---------------------------------------------------------------------------

/// Readings from one or more stations on a shared, non-decreasing
/// timestamp index. A missing reading is stored as `NaN`.
///
/// Values are stored column-major: `data[c][r]` is station `c` at row `r`.
/// Every pipeline stage borrows a table and returns new ones; nothing
/// mutates a table after construction.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<String>,
    data: Vec<Vec<f64>>,
}

impl TimeSeriesTable {
    /// Builds a table, checking that each column has one value per
    /// timestamp and that timestamps never go backwards.
    pub fn new(
        index: Vec<NaiveDateTime>,
        columns: Vec<String>,
        data: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(AnalysisError::ColumnLengthMismatch {
                column: "<header>".to_string(),
                expected: columns.len(),
                found: data.len(),
            });
        }
        for (name, values) in columns.iter().zip(&data) {
            if values.len() != index.len() {
                return Err(AnalysisError::ColumnLengthMismatch {
                    column: name.clone(),
                    expected: index.len(),
                    found: values.len(),
                });
            }
        }
        if let Some(position) = index.windows(2).position(|w| w[1] < w[0]) {
            return Err(AnalysisError::UnorderedIndex {
                position: position + 1,
            });
        }
        Ok(TimeSeriesTable {
            index,
            columns,
            data,
        })
    }

    /// Single-column convenience constructor.
    pub fn from_series(
        index: Vec<NaiveDateTime>,
        name: &str,
        values: Vec<f64>,
    ) -> Result<Self> {
        Self::new(index, vec![name.to_string()], vec![values])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of station columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_position(name).map(|i| self.data[i].as_slice())
    }

    /// Column by position. Panics if `position >= width()`.
    pub fn column_at(&self, position: usize) -> &[f64] {
        &self.data[position]
    }

    pub fn value(&self, row: usize, column: usize) -> f64 {
        self.data[column][row]
    }

    /// All station values for one row, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.iter().map(|col| col[row]).collect()
    }

    /// Same index and column names, new values. Used by stages that are
    /// shape-preserving (residuals, filtering, masking).
    pub fn with_data(&self, data: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(self.index.clone(), self.columns.clone(), data)
    }

    /// Rows whose timestamp satisfies `keep`, in original order.
    pub fn filter_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(&NaiveDateTime) -> bool,
    {
        let rows: Vec<usize> = (0..self.len()).filter(|&r| keep(&self.index[r])).collect();
        self.take_rows(&rows)
    }

    /// Rows with `start <= timestamp < end`.
    pub fn window(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.filter_rows(|ts| *ts >= start && *ts < end)
    }

    // `rows` must be ascending so the ordering invariant carries over.
    pub(crate) fn take_rows(&self, rows: &[usize]) -> Self {
        TimeSeriesTable {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self.columns.clone(),
            data: self
                .data
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
        }
    }

    /// Structural equality that compares floats by bit pattern, so `NaN`
    /// placeholders count as equal to themselves.
    pub fn bitwise_eq(&self, other: &TimeSeriesTable) -> bool {
        self.index == other.index
            && self.columns == other.columns
            && self.data.len() == other.data.len()
            && self.data.iter().zip(&other.data).all(|(a, b)| {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            })
    }
}

// ---------------------------------------------------------------------------
// Year-stacked table
// ---------------------------------------------------------------------------

/// One column per year, rows aligned by intra-year offset.
///
/// Row labels are `"MM/DD HH:MM:SS"` strings taken from the canonical year.
/// All columns have exactly `labels.len()` values.
#[derive(Debug, Clone)]
pub struct StackedYearTable {
    labels: Vec<String>,
    years: Vec<i32>,
    data: Vec<Vec<f64>>,
}

impl StackedYearTable {
    pub fn new(labels: Vec<String>, years: Vec<i32>, data: Vec<Vec<f64>>) -> Result<Self> {
        if years.len() != data.len() {
            return Err(AnalysisError::ColumnLengthMismatch {
                column: "<years>".to_string(),
                expected: years.len(),
                found: data.len(),
            });
        }
        for (&year, values) in years.iter().zip(&data) {
            if values.len() != labels.len() {
                return Err(AnalysisError::YearLengthMismatch {
                    year,
                    expected: labels.len(),
                    found: values.len(),
                });
            }
        }
        Ok(StackedYearTable {
            labels,
            years,
            data,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn year(&self, year: i32) -> Option<&[f64]> {
        self.years
            .iter()
            .position(|&y| y == year)
            .map(|i| self.data[i].as_slice())
    }

    /// `(year, values)` pairs in column order.
    pub fn iter_years(&self) -> impl Iterator<Item = (i32, &[f64])> + '_ {
        self.years
            .iter()
            .copied()
            .zip(self.data.iter().map(Vec::as_slice))
    }
}

// ---------------------------------------------------------------------------
// Yearly summary statistics
// ---------------------------------------------------------------------------

/// Row keys of a `YearlyParam` table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Max,
    Min,
    Mean,
    Median,
}

impl Stat {
    pub const ALL: [Stat; 4] = [Stat::Max, Stat::Min, Stat::Mean, Stat::Median];

    pub fn label(&self) -> &'static str {
        match self {
            Stat::Max => "max",
            Stat::Min => "min",
            Stat::Mean => "mean",
            Stat::Median => "median",
        }
    }
}

/// Max, min, mean and median of each year column. `NaN` marks a column
/// with no numeric data.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyParam {
    pub years: Vec<i32>,
    pub max: Vec<f64>,
    pub min: Vec<f64>,
    pub mean: Vec<f64>,
    pub median: Vec<f64>,
}

impl YearlyParam {
    pub fn row(&self, stat: Stat) -> &[f64] {
        match stat {
            Stat::Max => &self.max,
            Stat::Min => &self.min,
            Stat::Mean => &self.mean,
            Stat::Median => &self.median,
        }
    }

    pub fn get(&self, stat: Stat, year: i32) -> Option<f64> {
        let col = self.years.iter().position(|&y| y == year)?;
        Some(self.row(stat)[col])
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by ingestion, the analysis stages, and export.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// The input table has no column literally named `time`.
    #[error("no column named \"time\" in {}", .path.display())]
    MissingTimeColumn { path: PathBuf },

    #[error("invalid timestamp {value:?} on line {line}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("non-numeric value {value:?} in column '{column}' on line {line}")]
    NonNumericValue {
        column: String,
        line: usize,
        value: String,
    },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column index {index} out of range ({available} data columns)")]
    ColumnIndexOutOfRange { index: usize, available: usize },

    #[error("invalid column selector: {0}")]
    InvalidColumnSelector(String),

    #[error("invalid grouping {0:?}: use 'year', 'month', or 'day'")]
    InvalidGrouping(String),

    #[error("timestamps out of order at row {position}")]
    UnorderedIndex { position: usize },

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A year bucket does not have the canonical number of rows.
    #[error("year {year} has {found} rows, expected {expected}")]
    YearLengthMismatch {
        year: i32,
        expected: usize,
        found: usize,
    },

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("negative values in '{0}'; peak masking needs non-negative readings")]
    NegativeValues(String),

    #[error("invalid filter configuration: {0}")]
    InvalidFilter(String),
}

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_calendar_position_drops_year_and_seconds() {
        let a = NaiveDate::from_ymd_opt(2005, 7, 14)
            .unwrap()
            .and_hms_opt(3, 20, 41)
            .unwrap();
        let b = ts(2011, 7, 14, 3, 20);
        assert_eq!(CalendarPosition::of(&a), CalendarPosition::of(&b));
    }

    #[test]
    fn test_calendar_position_orders_chronologically() {
        let jan = CalendarPosition::of(&ts(2009, 1, 31, 23, 50));
        let feb = CalendarPosition::of(&ts(2001, 2, 1, 0, 0));
        assert!(jan < feb);
    }

    #[test]
    fn test_leap_day_has_placeholder_slot() {
        let pos = CalendarPosition::of(&ts(2004, 2, 29, 12, 10));
        assert!(pos.is_leap_day());
        assert_eq!(pos.placeholder_timestamp(), Some(ts(2000, 2, 29, 12, 10)));
    }

    #[test]
    fn test_table_rejects_short_column() {
        let index = vec![ts(2004, 1, 1, 0, 0), ts(2004, 1, 1, 0, 10)];
        let result = TimeSeriesTable::new(index, vec!["SEP".into()], vec![vec![1.0]]);
        assert!(matches!(
            result,
            Err(AnalysisError::ColumnLengthMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_table_rejects_backwards_index() {
        let index = vec![ts(2004, 1, 1, 0, 10), ts(2004, 1, 1, 0, 0)];
        let result = TimeSeriesTable::from_series(index, "SEP", vec![1.0, 2.0]);
        assert!(matches!(result, Err(AnalysisError::UnorderedIndex { position: 1 })));
    }

    #[test]
    fn test_bitwise_eq_treats_nan_as_equal() {
        let index = vec![ts(2004, 1, 1, 0, 0)];
        let a = TimeSeriesTable::from_series(index.clone(), "SEP", vec![f64::NAN]).unwrap();
        let b = TimeSeriesTable::from_series(index, "SEP", vec![f64::NAN]).unwrap();
        assert!(a.bitwise_eq(&b));
    }

    #[test]
    fn test_window_is_half_open() {
        let index = vec![ts(2004, 1, 1, 0, 0), ts(2004, 1, 2, 0, 0), ts(2004, 1, 3, 0, 0)];
        let table = TimeSeriesTable::from_series(index, "SEP", vec![1.0, 2.0, 3.0]).unwrap();
        let w = table.window(ts(2004, 1, 1, 0, 0), ts(2004, 1, 3, 0, 0));
        assert_eq!(w.column("SEP").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_stacked_year_table_rejects_ragged_years() {
        let result = StackedYearTable::new(
            vec!["01/01 00:00:00".into(), "01/02 00:00:00".into()],
            vec![2004, 2005],
            vec![vec![1.0, 2.0], vec![3.0]],
        );
        assert!(matches!(
            result,
            Err(AnalysisError::YearLengthMismatch { year: 2005, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_stat_labels_in_output_order() {
        let labels: Vec<_> = Stat::ALL.iter().map(Stat::label).collect();
        assert_eq!(labels, ["max", "min", "mean", "median"]);
    }
}
