//! # α Tuning
//!
//! $$
//! \bar E(\alpha)=\frac{E(\widehat m_\alpha)-\min_{\alpha'}E(\widehat m_{\alpha'})}{\max_{\alpha'}E(\widehat m_{\alpha'})-\min_{\alpha'}E(\widehat m_{\alpha'})}
//! $$
//!
//! Independent calibrations over a grid of mixing parameters.

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::quant::calibration::AlphaDsCalibrator;
use crate::quant::calibration::CalibrationConfig;
use crate::quant::quotes::QuoteTable;
use crate::quant::round_to;

/// Optimal error of one α.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuningPoint {
  pub alpha: f64,
  pub error: f64,
}

/// `0.0, 0.1, ..., 1.0`.
pub fn default_alpha_grid() -> Vec<f64> {
  (0..=10).map(|i| round_to(i as f64 * 0.1, 1)).collect()
}

/// Calibrate once per α. Points come back in the order of `alphas`; the first failure aborts the sweep.
pub fn tune(
  closes: &[f64],
  calls: &QuoteTable,
  puts: &QuoteTable,
  alphas: &[f64],
  base: &CalibrationConfig,
) -> Result<Vec<TuningPoint>> {
  info!(points = alphas.len(), "tuning alpha");
  alphas
    .par_iter()
    .map(|&alpha| -> Result<TuningPoint> {
      let config = CalibrationConfig {
        alpha,
        ..base.clone()
      };
      let res = AlphaDsCalibrator::new(config).calibrate(closes, calls, puts)?;
      Ok(TuningPoint {
        alpha,
        error: res.error,
      })
    })
    .collect()
}

/// Min-max normalization; all zeros when the errors do not spread.
pub fn normalize_errors(errors: &[f64]) -> Vec<f64> {
  let lo = errors.iter().cloned().fold(f64::INFINITY, f64::min);
  let hi = errors.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let span = hi - lo;
  if !(span > 0.0) {
    return vec![0.0; errors.len()];
  }
  errors.iter().map(|e| (e - lo) / span).collect()
}

/// Point with the smallest error.
pub fn best_alpha(points: &[TuningPoint]) -> Option<TuningPoint> {
  points
    .iter()
    .copied()
    .min_by(|a, b| a.error.total_cmp(&b.error))
}
