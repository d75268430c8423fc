/// Stacking and aggregation stages of the seismic pipeline.
///
/// Every function here borrows its input and returns fresh tables; none of
/// them perform I/O.
///
/// Submodules:
/// - `grouping`: partitions a table by year, month, or day.
/// - `seasonal`: stack-in-time: seasonal profile and deseasonalized residual.
/// - `leap_day`: drops February 29 rows.
/// - `spatial`: stack-in-space: station mean reshaped to one column per year.
/// - `yearly`: max/min/mean/median per year column.
/// - `filter`: Butterworth low-pass design and causal filtering.
/// - `normalize`: min-max scaling to [0, 1].
/// - `masking`: best-effort removal of a transient spike.
/// - `extrusion`: correlation of seismic signal with lava extrusion rate.

pub mod extrusion;
pub mod filter;
pub mod grouping;
pub mod leap_day;
pub mod masking;
pub mod normalize;
pub mod seasonal;
pub mod spatial;
pub mod yearly;

/// Arithmetic mean of the non-NaN values, `NaN` when there are none.
pub(crate) fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

/// Median of the non-NaN values, `NaN` when there are none.
pub(crate) fn nan_median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
