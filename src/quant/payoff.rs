//! # Payoff Bounds
//!
//! $$
//! \underline{g}(B)=\min_{i\in B}g(s_i),\qquad \overline{g}(B)=\max_{i\in B}g(s_i)
//! $$
//!
//! Worst- and best-case European payoffs over a set of lattice states.

use crate::quant::lattice::PriceLattice;
use crate::quant::OptionType;

/// Payoff of a European option at expiry value `s`.
pub fn payoff(option_type: OptionType, s: f64, strike: f64) -> f64 {
  match option_type {
    OptionType::Call => (s - strike).max(0.0),
    OptionType::Put => (strike - s).max(0.0),
  }
}

/// Smallest payoff over the states in `subset`. `subset` must be non-empty.
pub fn min_payoff(
  option_type: OptionType,
  subset: &[usize],
  strike: f64,
  lattice: &PriceLattice,
) -> f64 {
  subset
    .iter()
    .map(|&i| payoff(option_type, lattice[i], strike))
    .fold(f64::INFINITY, f64::min)
}

/// Largest payoff over the states in `subset`.
pub fn max_payoff(
  option_type: OptionType,
  subset: &[usize],
  strike: f64,
  lattice: &PriceLattice,
) -> f64 {
  subset
    .iter()
    .map(|&i| payoff(option_type, lattice[i], strike))
    .fold(0.0, f64::max)
}

/// Both bounds in one scan.
pub fn payoff_bounds(
  option_type: OptionType,
  subset: &[usize],
  strike: f64,
  lattice: &PriceLattice,
) -> (f64, f64) {
  subset
    .iter()
    .map(|&i| payoff(option_type, lattice[i], strike))
    .fold((f64::INFINITY, 0.0), |(lo, hi), p| (lo.min(p), hi.max(p)))
}
