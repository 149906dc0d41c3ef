//! # Power Set Index
//!
//! $$
//! \mathcal P(\Omega)\setminus\{\emptyset\} \ni B \;\longleftrightarrow\; j\in\{0,\dots,2^n-2\}
//! $$
//!
//! Subsets are enumerated by increasing size and, within one size, in lexicographic
//! order of their sorted elements. With this order the singletons `{0}, ..., {n-1}`
//! occupy indices `0..n` and the full state set is the last index. Variable
//! indices of the optimizer and columns of the gamble matrices both follow it.

use std::collections::HashMap;

use crate::error::CalibrationError;
use crate::error::Result;

/// Largest supported number of states.
pub const MAX_STATES: usize = 20;

/// Bijection between indices and the non-empty subsets of `{0, ..., n-1}`.
#[derive(Clone, Debug)]
pub struct SubsetIndex {
  n: usize,
  subsets: Vec<Vec<usize>>,
  lookup: HashMap<Vec<usize>, usize>,
}

impl SubsetIndex {
  pub fn new(n: usize) -> Result<Self> {
    if n == 0 || n > MAX_STATES {
      return Err(CalibrationError::input(format!(
        "state count must be within 1..={MAX_STATES}, got {n}"
      )));
    }

    let mut subsets = Vec::with_capacity((1usize << n) - 1);
    for size in 1..=n {
      push_combinations(n, size, &mut subsets);
    }

    let lookup = subsets
      .iter()
      .enumerate()
      .map(|(idx, s)| (s.clone(), idx))
      .collect();

    Ok(Self { n, subsets, lookup })
  }

  /// Number of states `n`.
  pub fn states(&self) -> usize {
    self.n
  }

  /// Number of subsets, `2^n - 1`.
  pub fn len(&self) -> usize {
    self.subsets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.subsets.is_empty()
  }

  /// Sorted elements of subset `idx`.
  pub fn subset(&self, idx: usize) -> &[usize] {
    &self.subsets[idx]
  }

  /// Index of a subset given in any order. `None` for empty, out-of-range or repeated elements.
  pub fn index_of(&self, subset: &[usize]) -> Option<usize> {
    let mut key = subset.to_vec();
    key.sort_unstable();
    self.lookup.get(&key).copied()
  }

  pub fn is_singleton(&self, idx: usize) -> bool {
    idx < self.n
  }

  /// Index of the full state set.
  pub fn full(&self) -> usize {
    self.subsets.len() - 1
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
    self.subsets.iter().enumerate().map(|(i, s)| (i, s.as_slice()))
  }
}

/// Append all `size`-combinations of `0..n` in lexicographic order.
fn push_combinations(n: usize, size: usize, out: &mut Vec<Vec<usize>>) {
  let mut comb: Vec<usize> = (0..size).collect();
  loop {
    out.push(comb.clone());

    // rightmost position that can still be advanced
    let Some(pos) = (0..size).rev().find(|&i| comb[i] != i + n - size) else {
      return;
    };
    comb[pos] += 1;
    for i in pos + 1..size {
      comb[i] = comb[i - 1] + 1;
    }
  }
}
