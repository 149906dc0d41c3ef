//! # Möbius Inverse
//!
//! $$
//! \operatorname{Bel}(A)=\sum_{B\subseteq A}m(B),\qquad
//! \operatorname{Pl}(A)=\sum_{B\cap A\neq\emptyset}m(B)
//! $$
//!
//! Calibrated mass assignment over the non-empty subsets of the state space and
//! the belief function, plausibility function and α-DS mixture prices it induces.

use std::collections::BTreeMap;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::gamble::check_alpha;
use crate::quant::powerset::SubsetIndex;

/// Tolerance on the total mass.
pub const MASS_TOLERANCE: f64 = 1e-6;

/// Non-negative masses on the subsets of a [`SubsetIndex`], summing to one.
#[derive(Clone, Debug)]
pub struct MobiusInverse {
  index: SubsetIndex,
  masses: Vec<f64>,
  masks: Vec<u32>,
}

fn mask(subset: &[usize]) -> u32 {
  subset.iter().fold(0, |acc, &i| acc | (1 << i))
}

impl MobiusInverse {
  pub fn new(index: SubsetIndex, masses: Vec<f64>) -> Result<Self> {
    if masses.len() != index.len() {
      return Err(CalibrationError::input(format!(
        "expected {} masses, got {}",
        index.len(),
        masses.len()
      )));
    }
    if masses.iter().any(|m| !m.is_finite() || *m < 0.0) {
      return Err(CalibrationError::input("masses must be finite and non-negative"));
    }
    let total: f64 = masses.iter().sum();
    if (total - 1.0).abs() > MASS_TOLERANCE {
      return Err(CalibrationError::input(format!(
        "masses must sum to 1, got {total}"
      )));
    }

    let masks = index.iter().map(|(_, s)| mask(s)).collect();
    Ok(Self {
      index,
      masses,
      masks,
    })
  }

  pub fn index(&self) -> &SubsetIndex {
    &self.index
  }

  /// Masses in subset-index order.
  pub fn masses(&self) -> &[f64] {
    &self.masses
  }

  pub fn mass(&self, idx: usize) -> f64 {
    self.masses[idx]
  }

  /// Mass of a subset given by its elements, zero for the empty set.
  pub fn mass_of(&self, subset: &[usize]) -> f64 {
    self.index.index_of(subset).map_or(0.0, |j| self.masses[j])
  }

  pub fn to_map(&self) -> BTreeMap<usize, f64> {
    self.masses.iter().copied().enumerate().collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&[usize], f64)> {
    self.index.iter().map(|(j, s)| (s, self.masses[j]))
  }

  /// Total mass of the subsets contained in `event`.
  pub fn belief(&self, event: &[usize]) -> Result<f64> {
    let a = self.event_mask(event)?;
    Ok(
      self
        .masks
        .iter()
        .zip(&self.masses)
        .filter(|(b, _)| **b & !a == 0)
        .map(|(_, m)| m)
        .sum(),
    )
  }

  /// Total mass of the subsets meeting `event`.
  pub fn plausibility(&self, event: &[usize]) -> Result<f64> {
    let a = self.event_mask(event)?;
    Ok(
      self
        .masks
        .iter()
        .zip(&self.masses)
        .filter(|(b, _)| **b & a != 0)
        .map(|(_, m)| m)
        .sum(),
    )
  }

  fn event_mask(&self, event: &[usize]) -> Result<u32> {
    let n = self.index.states();
    match event.iter().find(|&&i| i >= n) {
      Some(bad) => Err(CalibrationError::input(format!(
        "state {bad} is outside 0..{n}"
      ))),
      None => Ok(mask(event)),
    }
  }

  /// Discounted α-DS mixture price of a gamble given by its value in each state.
  pub fn alpha_ds_price(&self, gamble: &[f64], alpha: f64, discount: f64) -> Result<f64> {
    check_alpha(alpha)?;
    if gamble.len() != self.index.states() {
      return Err(CalibrationError::input(format!(
        "gamble has {} values for {} states",
        gamble.len(),
        self.index.states()
      )));
    }
    if !(discount.is_finite() && discount > 0.0) {
      return Err(CalibrationError::input(format!(
        "discount factor must be positive, got {discount}"
      )));
    }

    let value: f64 = self
      .iter()
      .map(|(subset, m)| {
        let (lo, hi) = subset
          .iter()
          .map(|&i| gamble[i])
          .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g| {
            (lo.min(g), hi.max(g))
          });
        m * (alpha * lo + (1.0 - alpha) * hi)
      })
      .sum();

    Ok(value / discount)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn sample() -> MobiusInverse {
    // {0}, {1}, {2}, {0,1}, {0,2}, {1,2}, {0,1,2}
    let index = SubsetIndex::new(3).unwrap();
    MobiusInverse::new(index, vec![0.1, 0.2, 0.1, 0.3, 0.0, 0.1, 0.2]).unwrap()
  }

  #[test]
  fn test_belief_and_plausibility() {
    let m = sample();
    assert_abs_diff_eq!(m.belief(&[0, 1]).unwrap(), 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(m.plausibility(&[0, 1]).unwrap(), 0.9, epsilon = 1e-12);
    assert_abs_diff_eq!(m.belief(&[0, 1, 2]).unwrap(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m.plausibility(&[0, 1, 2]).unwrap(), 1.0, epsilon = 1e-12);
    assert_eq!(m.belief(&[]).unwrap(), 0.0);

    let index = SubsetIndex::new(3).unwrap();
    for (_, event) in index.iter() {
      assert!(m.belief(event).unwrap() <= m.plausibility(event).unwrap() + 1e-12);
    }
  }

  #[test]
  fn test_events_outside_state_space() {
    let m = sample();
    for event in [&[3][..], &[0, 31][..], &[40][..]] {
      assert!(matches!(m.belief(event), Err(CalibrationError::InputData(_))));
      assert!(matches!(m.plausibility(event), Err(CalibrationError::InputData(_))));
    }
  }

  #[test]
  fn test_alpha_ds_price() {
    let m = sample();
    let gamble = [0.0, 10.0, 20.0];
    // α = 1 gives the Choquet lower expectation
    let lower = m.alpha_ds_price(&gamble, 1.0, 1.0).unwrap();
    let expected = 0.2 * 10.0 + 0.1 * 20.0 + 0.1 * 10.0;
    assert_abs_diff_eq!(lower, expected, epsilon = 1e-12);

    let upper = m.alpha_ds_price(&gamble, 0.0, 2.0).unwrap();
    let expected_upper = (0.2 * 10.0 + 0.1 * 20.0 + 0.3 * 10.0 + 0.1 * 20.0 + 0.2 * 20.0) / 2.0;
    assert_abs_diff_eq!(upper, expected_upper, epsilon = 1e-12);
    assert!(m.alpha_ds_price(&gamble[..2], 0.5, 1.0).is_err());
  }

  #[test]
  fn test_rejects_bad_masses() {
    let index = SubsetIndex::new(2).unwrap();
    assert!(MobiusInverse::new(index.clone(), vec![0.5, 0.5]).is_err());
    assert!(MobiusInverse::new(index.clone(), vec![0.5, 0.6, -0.1]).is_err());
    assert!(MobiusInverse::new(index, vec![0.5, 0.4, 0.0]).is_err());
  }

  #[test]
  fn test_lookups() {
    let m = sample();
    assert_eq!(m.mass_of(&[1, 0]), 0.3);
    assert_eq!(m.mass_of(&[]), 0.0);
    assert_eq!(m.to_map().len(), 7);
    assert_eq!(m.to_map()[&6], 0.2);
  }
}
