//! # Price Lattice
//!
//! $$
//! s_k = \operatorname{round}_1\!\Big(S_{\min} + \big(k+\tfrac12\big)\frac{S_{\max}-S_{\min}}{n}\Big),\quad k=0,\dots,n-1
//! $$
//!
//! Discretization of the historical price range into `n` equal-width bins with one
//! representative future value per bin.

use tracing::debug;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::powerset::MAX_STATES;
use crate::quant::round_to;

/// Representative future values of the underlying, one per state.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceLattice {
  /// Rounded historical minimum.
  pub s1_min: f64,
  /// Rounded historical maximum.
  pub s1_max: f64,
  /// Bin width.
  pub step: f64,
  /// The `n + 1` bin boundaries.
  pub boundaries: Vec<f64>,
  values: Vec<f64>,
}

impl PriceLattice {
  /// Build the lattice for `n` states from a series of closing prices.
  pub fn from_closes(closes: &[f64], n: usize) -> Result<Self> {
    if n == 0 || n > MAX_STATES {
      return Err(CalibrationError::input(format!(
        "state count must be within 1..={MAX_STATES}, got {n}"
      )));
    }
    if closes.is_empty() {
      return Err(CalibrationError::input("price series is empty"));
    }
    if let Some(bad) = closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
      return Err(CalibrationError::input(format!(
        "price series contains a non-positive or non-finite value: {bad}"
      )));
    }

    let lo = closes.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let s1_min = round_to(lo, 0);
    let s1_max = round_to(hi, 0);

    if s1_max == s1_min {
      return Err(CalibrationError::DegenerateRange { value: s1_min });
    }

    let step = (s1_max - s1_min) / n as f64;
    let boundaries: Vec<f64> = (0..=n).map(|k| s1_min + k as f64 * step).collect();
    let values = boundaries
      .windows(2)
      .map(|w| round_to((w[0] + w[1]) / 2.0, 1))
      .collect::<Vec<_>>();

    if values.windows(2).any(|w| w[0] >= w[1]) {
      return Err(CalibrationError::input(format!(
        "price range [{s1_min}, {s1_max}] is too narrow for {n} distinct states"
      )));
    }

    debug!(s1_min, s1_max, step, ?values, "price lattice built");

    Ok(Self {
      s1_min,
      s1_max,
      step,
      boundaries,
      values,
    })
  }

  /// Representative values, strictly increasing.
  pub fn values(&self) -> &[f64] {
    &self.values
  }

  /// Number of states.
  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl std::ops::Index<usize> for PriceLattice {
  type Output = f64;

  fn index(&self, idx: usize) -> &f64 {
    &self.values[idx]
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn test_two_states() {
    let closes = [100.2, 130.0, 199.7, 150.0];
    let lattice = PriceLattice::from_closes(&closes, 2).unwrap();
    assert_eq!(lattice.s1_min, 100.0);
    assert_eq!(lattice.s1_max, 200.0);
    assert_eq!(lattice.boundaries, vec![100.0, 150.0, 200.0]);
    assert_eq!(lattice.values(), &[125.0, 175.0]);
  }

  #[test]
  fn test_single_state_is_midpoint() {
    let closes = [101.4, 180.6];
    let lattice = PriceLattice::from_closes(&closes, 1).unwrap();
    assert_eq!(lattice.len(), 1);
    assert_abs_diff_eq!(lattice[0], (101.0 + 181.0) / 2.0);
  }

  #[test]
  fn test_strictly_increasing() {
    let closes = [88.4, 93.1, 120.9, 141.3, 101.0];
    let lattice = PriceLattice::from_closes(&closes, 7).unwrap();
    assert_eq!(lattice.len(), 7);
    assert!(lattice.values().windows(2).all(|w| w[0] < w[1]));
  }

  #[test]
  fn test_midpoints_round_from_exact_value() {
    let lattice = PriceLattice::from_closes(&[100.0, 107.0], 10).unwrap();
    assert_eq!(
      lattice.values(),
      &[100.3, 101.1, 101.8, 102.4, 103.2, 103.8, 104.6, 105.2, 105.9, 106.7]
    );
  }

  #[test]
  fn test_degenerate_range() {
    let closes = [150.0, 150.0, 150.0];
    let err = PriceLattice::from_closes(&closes, 3).unwrap_err();
    assert!(matches!(err, CalibrationError::DegenerateRange { value } if value == 150.0));
  }

  #[test]
  fn test_rounding_collapses_range() {
    let closes = [150.1, 149.8];
    assert!(matches!(
      PriceLattice::from_closes(&closes, 2),
      Err(CalibrationError::DegenerateRange { .. })
    ));
  }

  #[test]
  fn test_invalid_inputs() {
    assert!(matches!(
      PriceLattice::from_closes(&[], 2),
      Err(CalibrationError::InputData(_))
    ));
    assert!(matches!(
      PriceLattice::from_closes(&[1.0, 2.0], 0),
      Err(CalibrationError::InputData(_))
    ));
    assert!(matches!(
      PriceLattice::from_closes(&[1.0, -2.0], 2),
      Err(CalibrationError::InputData(_))
    ));
  }
}
