/// Butterworth low-pass filtering of station signals.
///
/// The design follows the classic digital IIR recipe: analog Butterworth
/// prototype poles, frequency pre-warping, bilinear transform, and expansion
/// of the resulting zeros/poles into transfer-function coefficients `b`/`a`.
/// Filtering is causal and single-pass (direct form II transposed, zero
/// initial state), so the output lags the input; it is not zero-phase.
///
/// A `NaN` input sample propagates into every later output sample of that
/// column, because it enters the filter state.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::model::{AnalysisError, Result, TimeSeriesTable};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Filter constants, fixed by the operator rather than derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub order: usize,
    /// Samples per unit time.
    pub sample_rate: f64,
    /// Cutoff in the same unit as `sample_rate`; must be below Nyquist.
    pub cutoff: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            order: 5,
            sample_rate: 30.0,
            cutoff: 0.025,
        }
    }
}

// ---------------------------------------------------------------------------
// Design
// ---------------------------------------------------------------------------

/// Transfer function `H(z) = B(z) / A(z)` of a digital Butterworth low-pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthLowPass {
    b: Vec<f64>,
    a: Vec<f64>,
    sample_rate: f64,
}

impl ButterworthLowPass {
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::design(config.order, config.cutoff, config.sample_rate)
    }

    /// Designs an `order`-pole low-pass with -3 dB point at `cutoff`.
    pub fn design(order: usize, cutoff: f64, sample_rate: f64) -> Result<Self> {
        if order == 0 {
            return Err(AnalysisError::InvalidFilter("order must be at least 1".to_string()));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(AnalysisError::InvalidFilter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        let nyquist = sample_rate / 2.0;
        if !(cutoff.is_finite() && cutoff > 0.0 && cutoff < nyquist) {
            return Err(AnalysisError::InvalidFilter(format!(
                "cutoff must lie in (0, {}), got {}",
                nyquist, cutoff
            )));
        }

        // Cutoff as a fraction of Nyquist, pre-warped for a bilinear
        // transform at a design rate of 2.
        let wn = cutoff / nyquist;
        let design_rate = 2.0;
        let warped = 2.0 * design_rate * (PI * wn / design_rate).tan();

        // Analog prototype: poles evenly spaced on the left unit half-circle.
        let n = order as f64;
        let analog_poles: Vec<Complex64> = (0..order)
            .map(|k| {
                let m = 2.0 * k as f64 - n + 1.0;
                -Complex64::from_polar(1.0, PI * m / (2.0 * n)) * warped
            })
            .collect();
        let analog_gain = warped.powi(order as i32);

        // Bilinear transform; all zeros land on z = -1.
        let fs2 = Complex64::new(2.0 * design_rate, 0.0);
        let digital_poles: Vec<Complex64> = analog_poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
        let denom = analog_poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
        let gain = analog_gain * (Complex64::new(1.0, 0.0) / denom).re;

        let zeros = vec![Complex64::new(-1.0, 0.0); order];
        let b = poly(&zeros).iter().map(|c| gain * c.re).collect();
        let a = poly(&digital_poles).iter().map(|c| c.re).collect();

        Ok(ButterworthLowPass { b, a, sample_rate })
    }

    /// Numerator coefficients.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Denominator coefficients, `a[0] == 1`.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Runs the filter over `input` once, front to back.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let m = self.a.len() - 1;
        let mut state = vec![0.0; m];
        let mut output = Vec::with_capacity(input.len());

        for &x in input {
            let y = self.b[0] * x + state[0];
            for i in 0..m {
                let carry = if i + 1 < m { state[i + 1] } else { 0.0 };
                state[i] = self.b[i + 1] * x + carry - self.a[i + 1] * y;
            }
            output.push(y);
        }

        output
    }

    /// Magnitude `|H|` at `frequency` (same unit as the sample rate).
    pub fn gain_at(&self, frequency: f64) -> f64 {
        let omega = 2.0 * PI * frequency / self.sample_rate;
        let z_inv = Complex64::from_polar(1.0, -omega);
        (evaluate(&self.b, z_inv) / evaluate(&self.a, z_inv)).norm()
    }

    /// `(frequency, |H|)` at `points` evenly spaced frequencies in
    /// `[0, sample_rate / 2)`. Diagnostic only.
    pub fn frequency_response(&self, points: usize) -> Vec<(f64, f64)> {
        let nyquist = self.sample_rate / 2.0;
        (0..points)
            .map(|k| {
                let f = nyquist * k as f64 / points as f64;
                (f, self.gain_at(f))
            })
            .collect()
    }
}

/// Monic polynomial coefficients (highest power first) with the given roots.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= root * c;
        }
        coeffs = next;
    }
    coeffs
}

/// `sum(coeffs[i] * z_inv^i)`.
fn evaluate(coeffs: &[f64], z_inv: Complex64) -> Complex64 {
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z_inv + c)
}

// ---------------------------------------------------------------------------
// Table filtering
// ---------------------------------------------------------------------------

/// Low-passes every column of `table` independently. Index, column order
/// and shape are preserved; `table` is not modified.
pub fn filter_table(table: &TimeSeriesTable, config: &FilterConfig) -> Result<TimeSeriesTable> {
    let filter = ButterworthLowPass::from_config(config)?;
    let data = (0..table.width())
        .map(|c| filter.apply(table.column_at(c)))
        .collect();
    table.with_data(data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
