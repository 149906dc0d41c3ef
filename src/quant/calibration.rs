//! # α-DS Calibration
//!
//! $$
//! \widehat m = \arg\min_{m}\ \sum_{i\in\text{calls}\cup\text{puts}}
//! \Big(\frac{1}{R}\sum_{B}m(B)\big(\alpha\min_{B}g_i+(1-\alpha)\max_{B}g_i\big)-p_i^\alpha\Big)^2
//! $$
//!
//! End-to-end calibration of an α-DS mixture model: lattice, power set, gambles and
//! one constrained least-squares solve.

use std::collections::BTreeMap;

use tracing::info;
use tracing::warn;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::gamble::check_alpha;
use crate::quant::gamble::GambleMatrix;
use crate::quant::lattice::PriceLattice;
use crate::quant::mobius::MobiusInverse;
use crate::quant::powerset::SubsetIndex;
use crate::quant::powerset::MAX_STATES;
use crate::quant::quotes::QuoteTable;
use crate::quant::CalibrationLossScore;
use crate::quant::OptionType;

pub mod problem;
pub mod projected;

pub use problem::CalibrationProblem;
pub use problem::Solution;
pub use projected::ProjectedGradient;

/// Stopping rules handed to the optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverSettings {
  pub max_iters: u64,
  /// Accepted duality gap, relative to `max(1, E)`.
  pub gap_tolerance: f64,
  /// Iterations between two support polishes, zero disables them.
  pub polish_every: u64,
}

impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      max_iters: 10_000,
      gap_tolerance: 1e-7,
      polish_every: 25,
    }
  }
}

/// Runtime configuration for [`AlphaDsCalibrator`].
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationConfig {
  /// Number of future states `n`.
  pub states: usize,
  /// Mixing parameter α.
  pub alpha: f64,
  /// Risk-free discount factor `R`.
  pub discount: f64,
  /// Lower bound of every singleton mass.
  pub epsilon: f64,
  pub solver: SolverSettings,
}

impl Default for CalibrationConfig {
  fn default() -> Self {
    Self {
      states: 5,
      alpha: 0.7,
      discount: 1.0,
      epsilon: 1e-4,
      solver: SolverSettings::default(),
    }
  }
}

impl CalibrationConfig {
  pub fn validate(&self) -> Result<()> {
    if self.states == 0 || self.states > MAX_STATES {
      return Err(CalibrationError::input(format!(
        "state count must be within 1..={MAX_STATES}, got {}",
        self.states
      )));
    }
    check_alpha(self.alpha)?;
    if !(self.discount.is_finite() && self.discount > 0.0) {
      return Err(CalibrationError::input(format!(
        "discount factor must be positive, got {}",
        self.discount
      )));
    }
    if !(self.epsilon > 0.0 && self.states as f64 * self.epsilon < 1.0) {
      return Err(CalibrationError::input(format!(
        "epsilon must satisfy 0 < n * epsilon < 1, got {}",
        self.epsilon
      )));
    }
    if !(self.solver.gap_tolerance.is_finite() && self.solver.gap_tolerance > 0.0) {
      return Err(CalibrationError::input(format!(
        "gap tolerance must be positive, got {}",
        self.solver.gap_tolerance
      )));
    }
    Ok(())
  }
}

/// Outcome of one calibration run.
#[derive(Clone, Debug)]
pub struct CalibrationResult {
  pub alpha: f64,
  pub discount: f64,
  /// Optimal aggregate squared error.
  pub error: f64,
  /// Optimal Möbius inverse, indexed like [`CalibrationResult::subsets`].
  pub mobius: MobiusInverse,
  pub lattice: PriceLattice,
  /// Squared pricing error of each call quote.
  pub call_errors: Vec<f64>,
  /// Squared pricing error of each put quote.
  pub put_errors: Vec<f64>,
  /// Discounted model prices of the calls.
  pub call_prices: Vec<f64>,
  /// Discounted model prices of the puts.
  pub put_prices: Vec<f64>,
  pub loss_scores: CalibrationLossScore,
  /// Duality gap of the returned masses, an upper bound on `error - E*`.
  pub optimality_gap: f64,
  pub iterations: u64,
}

impl CalibrationResult {
  /// Optimal weight of every subset index.
  pub fn weights(&self) -> BTreeMap<usize, f64> {
    self.mobius.to_map()
  }

  pub fn subsets(&self) -> &SubsetIndex {
    self.mobius.index()
  }
}

/// Calibrates α-DS mixture masses to call and put quotes.
#[derive(Clone, Debug, Default)]
pub struct AlphaDsCalibrator {
  config: CalibrationConfig,
}

impl AlphaDsCalibrator {
  pub fn new(config: CalibrationConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &CalibrationConfig {
    &self.config
  }

  /// Discretize `closes` and calibrate against the quote tables.
  pub fn calibrate(
    &self,
    closes: &[f64],
    calls: &QuoteTable,
    puts: &QuoteTable,
  ) -> Result<CalibrationResult> {
    self.config.validate()?;
    let lattice = PriceLattice::from_closes(closes, self.config.states)?;
    info!(states = lattice.len(), values = ?lattice.values(), "price lattice");
    self.calibrate_on(lattice, calls, puts)
  }

  /// Calibrate on an already built lattice.
  pub fn calibrate_on(
    &self,
    lattice: PriceLattice,
    calls: &QuoteTable,
    puts: &QuoteTable,
  ) -> Result<CalibrationResult> {
    let cfg = &self.config;
    cfg.validate()?;
    if lattice.len() != cfg.states {
      return Err(CalibrationError::input(format!(
        "lattice has {} states, configuration asks for {}",
        lattice.len(),
        cfg.states
      )));
    }
    if calls.option_type != OptionType::Call || puts.option_type != OptionType::Put {
      return Err(CalibrationError::input("expected a call table and a put table"));
    }

    let index = SubsetIndex::new(cfg.states)?;
    let g_calls = GambleMatrix::build(cfg.alpha, &index, &lattice, calls)?;
    let g_puts = GambleMatrix::build(cfg.alpha, &index, &lattice, puts)?;
    let p_calls = calls.mixed_prices(cfg.alpha);
    let p_puts = puts.mixed_prices(cfg.alpha);
    info!(
      alpha = cfg.alpha,
      subsets = index.len(),
      calls = calls.len(),
      puts = puts.len(),
      "gamble matrices built"
    );

    let problem = CalibrationProblem::new(
      &g_calls,
      &g_puts,
      &p_calls,
      &p_puts,
      cfg.discount,
      cfg.epsilon,
      &index,
    )?;

    let solution = problem.solve(&cfg.solver).inspect_err(|e| {
      warn!(alpha = cfg.alpha, error = %e, "calibration failed");
    })?;
    info!(
      alpha = cfg.alpha,
      error = solution.error,
      gap = solution.gap,
      iterations = solution.iterations,
      "calibration converged"
    );

    let model = problem.model_prices(&solution.weights);
    let squared = problem.squared_errors(&solution.weights);
    let n_calls = problem.n_calls();
    let loss_scores = CalibrationLossScore::new(problem.market().as_slice(), model.as_slice());
    let mobius = MobiusInverse::new(index, solution.weights)?;

    Ok(CalibrationResult {
      alpha: cfg.alpha,
      discount: cfg.discount,
      error: solution.error,
      mobius,
      lattice,
      call_errors: squared[..n_calls].to_vec(),
      put_errors: squared[n_calls..].to_vec(),
      call_prices: model.as_slice()[..n_calls].to_vec(),
      put_prices: model.as_slice()[n_calls..].to_vec(),
      loss_scores,
      optimality_gap: solution.gap,
      iterations: solution.iterations,
    })
  }
}
