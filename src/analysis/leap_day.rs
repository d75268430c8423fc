/// February 29 removal, so every year has the same number of samples.

use chrono::NaiveDateTime;

use crate::model::{CalendarPosition, TimeSeriesTable};

pub fn is_leap_day(ts: &NaiveDateTime) -> bool {
    CalendarPosition::of(ts).is_leap_day()
}

/// Copy of `table` without its February 29 rows.
pub fn drop_leap_days(table: &TimeSeriesTable) -> TimeSeriesTable {
    table.filter_rows(|ts| !is_leap_day(ts))
}
