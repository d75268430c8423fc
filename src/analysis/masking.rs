/// Best-effort masking of a transient spike (e.g. an eruption or
/// instrument glitch) before stacking.
///
/// Masking is advisory: if a column has no qualifying peak it is returned
/// unmasked and a warning is logged. Negative readings and an unusable
/// config are errors.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::analysis::nan_median;
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, Result, TimeSeriesTable};

/// Peak-masking settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub enabled: bool,
    /// Extra samples masked on each side of the peak's bases.
    pub margin: usize,
    /// Required prominence as a multiple of the trailing median.
    pub prominence_factor: f64,
    /// Length of the trailing median window, in days.
    pub window_days: i64,
}

impl Default for MaskConfig {
    fn default() -> Self {
        MaskConfig {
            enabled: false,
            margin: 500,
            prominence_factor: 100.0,
            window_days: 10,
        }
    }
}

impl MaskConfig {
    /// Rejects a window that is not a positive, representable number of
    /// days and a prominence factor that is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        self.trailing_window()?;
        if !self.prominence_factor.is_finite() || self.prominence_factor < 0.0 {
            return Err(AnalysisError::Config(format!(
                "masking.prominence_factor must be finite and non-negative, got {}",
                self.prominence_factor
            )));
        }
        Ok(())
    }

    fn trailing_window(&self) -> Result<Duration> {
        if self.window_days < 1 {
            return Err(AnalysisError::Config(format!(
                "masking.window_days must be at least 1, got {}",
                self.window_days
            )));
        }
        Duration::try_days(self.window_days).ok_or_else(|| {
            AnalysisError::Config(format!(
                "masking.window_days is out of range: {}",
                self.window_days
            ))
        })
    }
}

/// The peak that was masked and the bases that bound it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakRegion {
    pub peak: usize,
    pub left_base: usize,
    pub right_base: usize,
    pub prominence: f64,
}

#[derive(Debug, Clone)]
pub struct MaskResult {
    pub values: Vec<f64>,
    /// `None` when no peak qualified and `values` is the input unchanged.
    pub region: Option<PeakRegion>,
}

/// Masks the single most prominent spike of one series.
///
/// The highest local maximum is kept only when its prominence reaches
/// `prominence_factor` times the median of the trailing `window_days`
/// ending at the peak. When kept, every value above the lowest point
/// between its bases becomes `NaN`, and so does the base-to-base span
/// widened by `margin` samples on each side.
pub fn mask_series(
    index: &[NaiveDateTime],
    values: &[f64],
    name: &str,
    config: &MaskConfig,
) -> Result<MaskResult> {
    config.validate()?;
    if values.iter().any(|&v| v < 0.0) {
        return Err(AnalysisError::NegativeValues(name.to_string()));
    }

    let unmasked = || MaskResult {
        values: values.to_vec(),
        region: None,
    };

    let Some(peak) = highest_local_maximum(values) else {
        return Ok(unmasked());
    };
    let (prominence, left_base, right_base) = prominence(values, peak);

    // A window reaching past the earliest representable time covers
    // everything before the peak.
    let window_start = index[peak].checked_sub_signed(config.trailing_window()?);
    let trailing: Vec<f64> = (0..=peak)
        .rev()
        .take_while(|&j| window_start.is_none_or(|start| index[j] > start))
        .map(|j| values[j])
        .collect();
    let threshold = config.prominence_factor * nan_median(&trailing);
    if !(prominence >= threshold) {
        return Ok(unmasked());
    }

    let floor = values[left_base..right_base]
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::INFINITY, f64::min);

    let mut masked: Vec<f64> = values
        .iter()
        .map(|&v| if v > floor { f64::NAN } else { v })
        .collect();
    let start = left_base.saturating_sub(config.margin);
    let end = (right_base + config.margin).min(masked.len());
    for v in &mut masked[start..end] {
        *v = f64::NAN;
    }

    Ok(MaskResult {
        values: masked,
        region: Some(PeakRegion {
            peak,
            left_base,
            right_base,
            prominence,
        }),
    })
}

/// Applies `mask_series` to every column. Columns without a qualifying
/// peak pass through unchanged with a logged warning.
pub fn mask_table(table: &TimeSeriesTable, config: &MaskConfig) -> Result<TimeSeriesTable> {
    let mut data = Vec::with_capacity(table.width());
    for (c, name) in table.columns().iter().enumerate() {
        let result = mask_series(table.index(), table.column_at(c), name, config)?;
        match result.region {
            Some(region) => logging::debug(
                Stage::Mask,
                Some(name),
                &format!(
                    "masked peak at row {} (bases {}..{}, prominence {:.3})",
                    region.peak, region.left_base, region.right_base, region.prominence
                ),
            ),
            None => logging::warn(Stage::Mask, Some(name), "no maskable peak; left unmasked"),
        }
        data.push(result.values);
    }
    table.with_data(data)
}

/// Index of the highest strict local maximum. Flat tops count once, at
/// their midpoint; the earliest wins a tie.
fn highest_local_maximum(x: &[f64]) -> Option<usize> {
    let n = x.len();
    let mut best: Option<usize> = None;
    let mut i = 1;
    while i + 1 < n {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead + 1 < n && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let mid = (i + ahead - 1) / 2;
                if best.is_none_or(|b| x[mid] > x[b]) {
                    best = Some(mid);
                }
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    best
}

/// Topographic prominence of `peak` with its left and right bases.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let height = x[peak];

    let mut left_min = height;
    let mut left_base = peak;
    let mut i = peak;
    loop {
        if !(x[i] <= height) {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    let mut right_base = peak;
    for (j, &v) in x.iter().enumerate().skip(peak) {
        if !(v <= height) {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = j;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
