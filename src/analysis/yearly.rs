/// Per-year summary statistics of a year-stacked table.

use crate::analysis::{nan_mean, nan_median};
use crate::model::{StackedYearTable, YearlyParam};

/// Max, min, mean and median of each year column, skipping `NaN`.
///
/// Columns keep the input order. A column without any numeric value
/// yields `NaN` for all four statistics.
pub fn yearly_params(stack: &StackedYearTable) -> YearlyParam {
    let mut param = YearlyParam {
        years: Vec::with_capacity(stack.years().len()),
        max: Vec::new(),
        min: Vec::new(),
        mean: Vec::new(),
        median: Vec::new(),
    };

    for (year, values) in stack.iter_years() {
        let present = values.iter().copied().filter(|v| !v.is_nan());
        let (max, min) = present.fold((f64::NAN, f64::NAN), |(hi, lo), v| {
            (if hi.is_nan() || v > hi { v } else { hi }, if lo.is_nan() || v < lo { v } else { lo })
        });

        param.years.push(year);
        param.max.push(max);
        param.min.push(min);
        param.mean.push(nan_mean(values.iter().copied()));
        param.median.push(nan_median(values));
    }

    param
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stat;

    fn stack(columns: Vec<Vec<f64>>) -> StackedYearTable {
        let rows = columns[0].len();
        let labels = (0..rows).map(|h| format!("01/01 {:02}:00:00", h)).collect();
        let years = (0..columns.len() as i32).map(|i| 2001 + i).collect();
        StackedYearTable::new(labels, years, columns).unwrap()
    }

    #[test]
    fn test_known_columns() {
        let table = stack(vec![
            vec![10.0, 20.0, 30.0, 40.0],
            vec![15.0, 25.0, 35.0, 45.0],
            vec![5.0, 15.0, 25.0, 35.0],
        ]);

        let result = yearly_params(&table);

        assert_eq!(result.years, vec![2001, 2002, 2003]);
        assert_eq!(result.max, vec![40.0, 45.0, 35.0]);
        assert_eq!(result.min, vec![10.0, 15.0, 5.0]);
        assert_eq!(result.mean, vec![25.0, 30.0, 20.0]);
        assert_eq!(result.median, vec![25.0, 30.0, 20.0]);
    }

    #[test]
    fn test_unsorted_column_median_and_mean() {
        let table = stack(vec![vec![30.0, 30.0, 40.0, 50.0], vec![30.0, 45.0, 20.0, 30.0]]);
        let result = yearly_params(&table);
        assert_eq!(result.get(Stat::Mean, 2001), Some(37.5));
        assert_eq!(result.get(Stat::Mean, 2002), Some(31.25));
        assert_eq!(result.get(Stat::Median, 2002), Some(30.0));
        assert_eq!(result.get(Stat::Max, 2002), Some(45.0));
        assert_eq!(result.get(Stat::Min, 2002), Some(20.0));
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let table = stack(vec![vec![f64::NAN, 2.0, 8.0]]);
        let result = yearly_params(&table);
        assert_eq!(result.max, vec![8.0]);
        assert_eq!(result.min, vec![2.0]);
        assert_eq!(result.mean, vec![5.0]);
        assert_eq!(result.median, vec![5.0]);
    }

    #[test]
    fn test_all_missing_column_is_nan_not_error() {
        let table = stack(vec![vec![1.0, 2.0], vec![f64::NAN, f64::NAN]]);
        let result = yearly_params(&table);
        for stat in Stat::ALL {
            assert!(result.get(stat, 2002).unwrap().is_nan(), "{} should be NaN", stat.label());
            assert!(!result.get(stat, 2001).unwrap().is_nan());
        }
    }
}
