/// Stacking in time: seasonal profile and deseasonalized residual.
///
/// All years are superimposed on one nominal calendar by their
/// `CalendarPosition`. The per-position mean is the seasonal profile, and
/// subtracting it from every original reading gives the residual.
///
/// # February 29
/// The profile index is anchored on `CalendarPosition::PLACEHOLDER_YEAR`
/// (2000), which is a leap year. A real February 29 reading therefore keeps
/// its own profile row, averaged over leap years only, and its residual is
/// taken against that row.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::analysis::nan_mean;
use crate::model::{AnalysisError, CalendarPosition, Result, TimeSeriesTable};

/// Column name of the station-mean residual series.
pub const RESIDUAL_MEAN_COLUMN: &str = "residual_mean";

/// Output of `stack_in_time`.
#[derive(Debug, Clone)]
pub struct SeasonalDecomposition {
    /// One row per observed calendar position, indexed on the placeholder
    /// year, in calendar order. Same columns as the input.
    pub profile: TimeSeriesTable,
    /// Input minus seasonal value; same shape and row order as the input.
    pub residual: TimeSeriesTable,
    slots: HashMap<CalendarPosition, usize>,
}

impl SeasonalDecomposition {
    /// Seasonal value that was subtracted from a reading taken at `ts`
    /// in column `column`. `None` if that calendar position was never
    /// observed or the column does not exist.
    pub fn seasonal_value(&self, ts: &NaiveDateTime, column: usize) -> Option<f64> {
        if column >= self.profile.width() {
            return None;
        }
        let row = *self.slots.get(&CalendarPosition::of(ts))?;
        Some(self.profile.value(row, column))
    }

    /// Residual averaged across stations at each timestamp.
    ///
    /// Only `NaN` is skipped. Zero and negative residuals are ordinary
    /// values here, unlike the raw readings in `spatial::station_mean`.
    pub fn residual_mean(&self) -> Result<TimeSeriesTable> {
        let means = (0..self.residual.len()).map(|r| nan_mean(self.residual.row(r))).collect();
        TimeSeriesTable::from_series(self.residual.index().to_vec(), RESIDUAL_MEAN_COLUMN, means)
    }
}

/// Splits `table` into its seasonal profile and deseasonalized residual.
///
/// Means skip `NaN`; a position with no numeric reading in a column has a
/// `NaN` profile value, and the residuals at that position are `NaN` too.
pub fn stack_in_time(table: &TimeSeriesTable) -> Result<SeasonalDecomposition> {
    if table.is_empty() {
        return Err(AnalysisError::EmptyInput("stack_in_time needs at least one row"));
    }

    let positions: Vec<CalendarPosition> = table.index().iter().map(CalendarPosition::of).collect();

    let mut ordered = positions.clone();
    ordered.sort_unstable();
    ordered.dedup();

    let slots: HashMap<CalendarPosition, usize> =
        ordered.iter().enumerate().map(|(i, p)| (*p, i)).collect();
    let row_slot: Vec<usize> = positions.iter().map(|p| slots[p]).collect();

    let mut profile_data = Vec::with_capacity(table.width());
    let mut residual_data = Vec::with_capacity(table.width());

    for c in 0..table.width() {
        let values = table.column_at(c);

        let mut members: Vec<Vec<f64>> = vec![Vec::new(); ordered.len()];
        for (&v, &slot) in values.iter().zip(&row_slot) {
            members[slot].push(v);
        }
        let means: Vec<f64> = members.into_iter().map(nan_mean).collect();

        let residual: Vec<f64> = values
            .iter()
            .zip(&row_slot)
            .map(|(&v, &slot)| v - means[slot])
            .collect();

        profile_data.push(means);
        residual_data.push(residual);
    }

    let profile_index = ordered
        .iter()
        .map(|p| {
            p.placeholder_timestamp()
                .ok_or_else(|| AnalysisError::InvalidTimestamp {
                    line: 0,
                    value: format!("{:02}-{:02} {:02}:{:02}", p.month, p.day, p.hour, p.minute),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let profile = TimeSeriesTable::new(profile_index, table.columns().to_vec(), profile_data)?;
    let residual = table.with_data(residual_data)?;

    Ok(SeasonalDecomposition {
        profile,
        residual,
        slots,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
