/// Calendar-period partitioning of a timestamp-indexed table.
///
/// Splits a table into per-year, per-month, or per-day sub-tables. Every
/// row lands in exactly one bucket and rows keep their relative order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::model::{AnalysisError, TimeSeriesTable};

/// Grouping granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Year,
    Month,
    Day,
}

impl FromStr for Period {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(Period::Year),
            "month" => Ok(Period::Month),
            "day" => Ok(Period::Day),
            other => Err(AnalysisError::InvalidGrouping(other.to_string())),
        }
    }
}

/// Bucket key. Years are plain integers; months and days are calendar
/// periods at that resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Year(i32),
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl PeriodKey {
    /// Year the period belongs to.
    pub fn year(&self) -> i32 {
        match self {
            PeriodKey::Year(y) => *y,
            PeriodKey::Month { year, .. } => *year,
            PeriodKey::Day(d) => d.year(),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Year(y) => write!(f, "{}", y),
            PeriodKey::Month { year, month } => write!(f, "{}-{:02}", year, month),
            PeriodKey::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Partitions `table` by `period`, keyed in chronological order.
///
/// The returned sub-tables are owned copies; `table` is left untouched.
pub fn group_by_period(table: &TimeSeriesTable, period: Period) -> BTreeMap<PeriodKey, TimeSeriesTable> {
    let mut rows_by_key: BTreeMap<PeriodKey, Vec<usize>> = BTreeMap::new();
    for (row, ts) in table.index().iter().enumerate() {
        let key = match period {
            Period::Year => PeriodKey::Year(ts.year()),
            Period::Month => PeriodKey::Month {
                year: ts.year(),
                month: ts.month(),
            },
            Period::Day => PeriodKey::Day(ts.date()),
        };
        rows_by_key.entry(key).or_default().push(row);
    }

    rows_by_key
        .into_iter()
        .map(|(key, rows)| (key, table.take_rows(&rows)))
        .collect()
}

/// Year-keyed convenience wrapper over `group_by_period`.
pub fn group_by_year(table: &TimeSeriesTable) -> BTreeMap<i32, TimeSeriesTable> {
    group_by_period(table, Period::Year)
        .into_iter()
        .map(|(key, bucket)| (key.year(), bucket))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};

    fn ten_minute_index(start: NaiveDateTime, end: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut index = Vec::new();
        let mut t = start;
        while t <= end {
            index.push(t);
            t += Duration::minutes(10);
        }
        index
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_group_by_year_keys_and_counts() {
        let index = ten_minute_index(midnight(2001, 1, 1), midnight(2004, 1, 5));
        let values: Vec<f64> = (0..index.len()).map(|i| i as f64).collect();
        let table = TimeSeriesTable::from_series(index.clone(), "SEP", values).unwrap();

        let buckets = group_by_year(&table);

        assert_eq!(buckets.keys().copied().collect::<Vec<_>>(), vec![2001, 2002, 2003, 2004]);
        for (year, bucket) in &buckets {
            let expected = index.iter().filter(|t| t.year() == *year).count();
            assert_eq!(bucket.len(), expected, "row count for {}", year);
        }
        // 2004 runs from Jan 1 00:00 through Jan 5 00:00 inclusive.
        assert_eq!(buckets[&2004].len(), 4 * 144 + 1);
    }

    #[test]
    fn test_buckets_preserve_row_order() {
        let index = ten_minute_index(midnight(2003, 12, 31), midnight(2004, 1, 1) + Duration::hours(1));
        let values: Vec<f64> = (0..index.len()).map(|i| i as f64).collect();
        let table = TimeSeriesTable::from_series(index, "SEP", values).unwrap();

        let buckets = group_by_year(&table);
        let b2004 = buckets[&2004].column("SEP").unwrap();
        assert!(b2004.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(b2004[0], 144.0);
    }

    #[test]
    fn test_group_by_month_and_day_keys() {
        let index = vec![midnight(2004, 1, 31), midnight(2004, 2, 1), midnight(2004, 2, 1) + Duration::hours(6)];
        let table = TimeSeriesTable::from_series(index, "SEP", vec![1.0, 2.0, 3.0]).unwrap();

        let months = group_by_period(&table, Period::Month);
        let keys: Vec<String> = months.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2004-01", "2004-02"]);

        let days = group_by_period(&table, Period::Day);
        let feb1 = PeriodKey::Day(NaiveDate::from_ymd_opt(2004, 2, 1).unwrap());
        assert_eq!(days[&feb1].len(), 2);
    }

    #[test]
    fn test_invalid_grouping_is_rejected() {
        let err = "week".parse::<Period>().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidGrouping(ref g) if g == "week"));
        assert_eq!("year".parse::<Period>().unwrap(), Period::Year);
    }

    #[test]
    fn test_source_table_untouched() {
        let index = vec![midnight(2004, 1, 1), midnight(2005, 1, 1)];
        let table = TimeSeriesTable::from_series(index, "SEP", vec![1.0, f64::NAN]).unwrap();
        let before = table.clone();
        let _ = group_by_period(&table, Period::Year);
        assert!(table.bitwise_eq(&before));
    }
}
