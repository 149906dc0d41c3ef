use std::fmt::Display;

pub mod calibration;
pub mod gamble;
pub mod lattice;
pub mod loss;
pub mod mobius;
pub mod payoff;
pub mod powerset;
pub mod quotes;
pub mod rates;
pub mod tuning;

/// Option type.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum OptionType {
  #[default]
  Call,
  Put,
}

impl Display for OptionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      OptionType::Call => write!(f, "call"),
      OptionType::Put => write!(f, "put"),
    }
  }
}

/// Round the exact value of `x` to `digits` decimals, ties to even.
pub(crate) fn round_to(x: f64, digits: i32) -> f64 {
  let scale = 10f64.powi(digits);
  let y = x * scale;
  // exact residual of the product, decides when y landed on a half
  let err = x.mul_add(scale, -y);
  let floor = y.floor();
  let frac = y - floor;
  let up = frac > 0.5 || (frac == 0.5 && (err > 0.0 || (err == 0.0 && floor % 2.0 != 0.0)));
  if up {
    (floor + 1.0) / scale
  } else {
    floor / scale
  }
}

/// Fit quality of the model prices against the market α-mixed prices.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct CalibrationLossScore {
  /// Mean Absolute Error
  pub mae: f64,
  /// Mean Squared Error
  pub mse: f64,
  /// Root Mean Squared Error
  pub rmse: f64,
  /// Mean Absolute Percentage Error (in %)
  pub mape: f64,
}

impl CalibrationLossScore {
  pub fn new(market: &[f64], model: &[f64]) -> Self {
    Self {
      mae: loss::mae(market, model),
      mse: loss::mse(market, model),
      rmse: loss::rmse(market, model),
      mape: loss::mape(market, model),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_to_uses_exact_value() {
    // 0.35 is stored just below the half
    assert_eq!(round_to(0.35, 1), 0.3);
    assert_eq!(round_to(2.675, 2), 2.67);
    assert_eq!(round_to(1.0000005, 6), 1.000001);
  }

  #[test]
  fn test_round_to_ties_to_even() {
    assert_eq!(round_to(0.25, 1), 0.2);
    assert_eq!(round_to(95.25, 1), 95.2);
    assert_eq!(round_to(107.75, 1), 107.8);
    assert_eq!(round_to(2.5, 0), 2.0);
    assert_eq!(round_to(3.5, 0), 4.0);
    assert_eq!(round_to(-1.5, 0), -2.0);
  }
}
