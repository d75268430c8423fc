/// Lava-dome extrusion measurements and their correlation with a seismic
/// parameter.
///
/// Extrusion volumes come from photogrammetry on irregular photography
/// dates. Each measurement describes the interval since the previous
/// photograph, so the seismic signal is averaged over the same interval
/// before comparing.

use chrono::{NaiveDate, NaiveDateTime};

use crate::analysis::nan_mean;
use crate::model::TimeSeriesTable;

/// One photogrammetry measurement of the growing lava dome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrusionRecord {
    pub date: NaiveDate,
    /// Total volume change since the start of the eruption.
    pub total_volume_change: f64,
    pub volume_change_rate: f64,
    pub extruded_volume: f64,
    pub extrusion_rate: f64,
}

/// Measurements ordered by photography date.
#[derive(Debug, Clone, Default)]
pub struct ExtrusionSeries {
    records: Vec<ExtrusionRecord>,
}

impl ExtrusionSeries {
    /// Sorts `records` by date.
    pub fn new(mut records: Vec<ExtrusionRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        ExtrusionSeries { records }
    }

    pub fn records(&self) -> &[ExtrusionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Change of total volume between consecutive photography dates, keyed
    /// by the later date.
    pub fn volume_deltas(&self) -> Vec<(NaiveDate, f64)> {
        self.records
            .windows(2)
            .map(|w| (w[1].date, w[1].total_volume_change - w[0].total_volume_change))
            .collect()
    }

    /// Pearson correlation between the mean of `column` over each
    /// photography interval `[previous date, date)` and the extrusion rate
    /// reported for that interval.
    ///
    /// Intervals with no numeric reading, or a `NaN` rate, are skipped.
    /// Returns `None` for an unknown column, fewer than two usable
    /// intervals, or zero variance on either side.
    pub fn correlate_with(&self, table: &TimeSeriesTable, column: &str) -> Option<f64> {
        let position = table.column_position(column)?;

        let mut pairs = Vec::new();
        for w in self.records.windows(2) {
            let interval = table.window(midnight(w[0].date), midnight(w[1].date));
            let mean = nan_mean(interval.column_at(position).iter().copied());
            if !mean.is_nan() && !w[1].extrusion_rate.is_nan() {
                pairs.push((mean, w[1].extrusion_rate));
            }
        }

        pearson(&pairs)
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}
