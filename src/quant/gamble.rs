//! # α-Gambles
//!
//! $$
//! G_{ij} = \operatorname{round}_6\!\Big(\alpha\min_{k\in B_j} g_i(s_k) + (1-\alpha)\max_{k\in B_j} g_i(s_k)\Big)
//! $$
//!
//! Coefficient matrix of one quote table: row `i` is the quote, column `j` the
//! subset with index `j` in [`SubsetIndex`].

use nalgebra::DMatrix;
use nalgebra::DVector;
use rayon::prelude::*;
use tracing::debug;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::lattice::PriceLattice;
use crate::quant::payoff::payoff_bounds;
use crate::quant::powerset::SubsetIndex;
use crate::quant::quotes::QuoteTable;
use crate::quant::round_to;
use crate::quant::OptionType;

/// Coefficients of the α-mixed payoff bounds for every (quote, subset) pair.
#[derive(Clone, Debug)]
pub struct GambleMatrix {
  pub option_type: OptionType,
  pub coefficients: DMatrix<f64>,
}

impl GambleMatrix {
  pub fn build(
    alpha: f64,
    index: &SubsetIndex,
    lattice: &PriceLattice,
    table: &QuoteTable,
  ) -> Result<Self> {
    check_alpha(alpha)?;
    if lattice.len() != index.states() {
      return Err(CalibrationError::input(format!(
        "lattice has {} states but the subset index was built for {}",
        lattice.len(),
        index.states()
      )));
    }

    let option_type = table.option_type;
    let rows: Vec<Vec<f64>> = table
      .quotes()
      .par_iter()
      .map(|quote| {
        index
          .iter()
          .map(|(_, subset)| {
            let (lo, hi) = payoff_bounds(option_type, subset, quote.strike, lattice);
            alpha_gamble(alpha, lo, hi)
          })
          .collect()
      })
      .collect();

    let coefficients =
      DMatrix::from_row_iterator(rows.len(), index.len(), rows.into_iter().flatten());
    debug!(
      %option_type,
      rows = coefficients.nrows(),
      cols = coefficients.ncols(),
      "gamble matrix built"
    );

    Ok(Self {
      option_type,
      coefficients,
    })
  }

  pub fn nrows(&self) -> usize {
    self.coefficients.nrows()
  }

  pub fn ncols(&self) -> usize {
    self.coefficients.ncols()
  }

  pub fn get(&self, row: usize, subset: usize) -> f64 {
    self.coefficients[(row, subset)]
  }

  /// Undiscounted model values `G m` for a weight vector `m`.
  pub fn apply(&self, weights: &DVector<f64>) -> DVector<f64> {
    &self.coefficients * weights
  }
}

/// α-mixture of a worst-case and a best-case payoff, rounded to 6 decimals.
pub fn alpha_gamble(alpha: f64, lo: f64, hi: f64) -> f64 {
  round_to(alpha * lo + (1.0 - alpha) * hi, 6)
}

pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
  if (0.0..=1.0).contains(&alpha) {
    Ok(())
  } else {
    Err(CalibrationError::input(format!(
      "mixing parameter must lie in [0, 1], got {alpha}"
    )))
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::quant::quotes::OptionQuote;

  fn setup() -> (SubsetIndex, PriceLattice) {
    (
      SubsetIndex::new(2).unwrap(),
      PriceLattice::from_closes(&[100.0, 200.0], 2).unwrap(),
    )
  }

  #[test]
  fn test_call_gambles() {
    let (index, lattice) = setup();
    let calls = QuoteTable::new(
      OptionType::Call,
      vec![OptionQuote::new(130.0, 20.0, 22.0), OptionQuote::new(180.0, 0.5, 1.0)],
    )
    .unwrap();
    let g = GambleMatrix::build(0.7, &index, &lattice, &calls).unwrap();

    assert_eq!((g.nrows(), g.ncols()), (2, 3));
    assert_eq!(g.get(0, 0), 0.0);
    assert_eq!(g.get(0, 1), 45.0);
    // {0, 1}: 0.7 * 0 + 0.3 * 45
    assert_abs_diff_eq!(g.get(0, 2), 13.5, epsilon = 1e-12);
    assert!((0..3).all(|j| g.get(1, j) == 0.0));
  }

  #[test]
  fn test_put_gambles() {
    let (index, lattice) = setup();
    let puts = QuoteTable::new(OptionType::Put, vec![OptionQuote::new(150.0, 20.0, 22.0)]).unwrap();
    let g = GambleMatrix::build(0.25, &index, &lattice, &puts).unwrap();

    assert_eq!(g.get(0, 0), 25.0);
    assert_eq!(g.get(0, 1), 0.0);
    assert_abs_diff_eq!(g.get(0, 2), 18.75, epsilon = 1e-12);
  }

  #[test]
  fn test_extreme_alphas_pick_bounds() {
    let (index, lattice) = setup();
    let calls = QuoteTable::new(OptionType::Call, vec![OptionQuote::new(130.0, 1.0, 2.0)]).unwrap();
    let pessimistic = GambleMatrix::build(1.0, &index, &lattice, &calls).unwrap();
    let optimistic = GambleMatrix::build(0.0, &index, &lattice, &calls).unwrap();
    assert_eq!(pessimistic.get(0, 2), 0.0);
    assert_eq!(optimistic.get(0, 2), 45.0);
  }

  #[test]
  fn test_rounding_to_six_decimals() {
    assert_eq!(alpha_gamble(1.0 / 3.0, 0.0, 1.0), 0.666667);
  }

  #[test]
  fn test_rejects_bad_alpha_and_shape() {
    let (index, lattice) = setup();
    let calls = QuoteTable::new(OptionType::Call, vec![OptionQuote::new(130.0, 1.0, 2.0)]).unwrap();
    assert!(GambleMatrix::build(1.5, &index, &lattice, &calls).is_err());

    let wide = SubsetIndex::new(3).unwrap();
    assert!(GambleMatrix::build(0.5, &wide, &lattice, &calls).is_err());
  }

  #[test]
  fn test_apply() {
    let (index, lattice) = setup();
    let calls = QuoteTable::new(OptionType::Call, vec![OptionQuote::new(130.0, 1.0, 2.0)]).unwrap();
    let g = GambleMatrix::build(0.0, &index, &lattice, &calls).unwrap();
    let m = DVector::from_vec(vec![0.2, 0.3, 0.5]);
    assert_abs_diff_eq!(g.apply(&m)[0], 0.3 * 45.0 + 0.5 * 45.0, epsilon = 1e-12);
  }
}
