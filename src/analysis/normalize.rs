/// Min-max scaling of a numeric sequence onto [0, 1].

use crate::model::{AnalysisError, Result};

/// `(x - min) / (max - min)` for every value.
///
/// `NaN` entries are ignored when finding the extremes and stay `NaN`.
/// A constant sequence has zero range and comes back as all `NaN`.
pub fn normalize(values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput("normalize needs at least one value"));
    }
    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    Ok(values.iter().map(|&v| (v - min) / range).collect())
}
