//! # Loss
//!
//! $$
//! L=\frac1n\sum_{i=1}^n \ell(p_i^{mkt},p_i^{model})
//! $$
//!
//! Empty inputs score zero.

fn mean(values: impl Iterator<Item = f64>, len: usize) -> f64 {
  if len == 0 {
    0.0
  } else {
    values.sum::<f64>() / len as f64
  }
}

/// Mean Absolute Error: MAE = (1/N) Σ|market_i - model_i|
pub fn mae(market: &[f64], model: &[f64]) -> f64 {
  mean(
    market.iter().zip(model).map(|(m, d)| (m - d).abs()),
    market.len(),
  )
}

/// Mean Squared Error: MSE = (1/N) Σ(market_i - model_i)²
pub fn mse(market: &[f64], model: &[f64]) -> f64 {
  mean(
    market.iter().zip(model).map(|(m, d)| (m - d).powi(2)),
    market.len(),
  )
}

/// Root Mean Squared Error: RMSE = √MSE
pub fn rmse(market: &[f64], model: &[f64]) -> f64 {
  mse(market, model).sqrt()
}

/// Mean Absolute Percentage Error (in %). Quotes with a zero market price are skipped in the sum.
pub fn mape(market: &[f64], model: &[f64]) -> f64 {
  let pct = market.iter().zip(model).map(|(m, d)| {
    if m.abs() < f64::EPSILON {
      0.0
    } else {
      (m - d).abs() / m.abs()
    }
  });
  mean(pct, market.len()) * 100.0
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn test_losses() {
    let market = [2.0, 4.0];
    let model = [1.0, 5.0];
    assert_abs_diff_eq!(mae(&market, &model), 1.0);
    assert_abs_diff_eq!(mse(&market, &model), 1.0);
    assert_abs_diff_eq!(rmse(&market, &model), 1.0);
    assert_abs_diff_eq!(mape(&market, &model), 37.5);
  }

  #[test]
  fn test_empty_is_zero() {
    assert_eq!(mse(&[], &[]), 0.0);
    assert_eq!(mape(&[], &[]), 0.0);
  }
}
