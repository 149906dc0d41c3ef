//! # Calibration Problem
//!
//! $$
//! \min_{m}\ E(m)=\sum_i\Big(\tfrac{1}{R}\sum_j G_{ij}m_j - p_i^\alpha\Big)^2
//! \quad\text{s.t.}\quad \sum_j m_j = 1,\ m_{\{k\}}\ge\varepsilon,\ m_j\ge 0
//! $$
//!
//! A convex quadratic program over the floored simplex, solved directly in the
//! masses by [`ProjectedGradient`].

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::gamble::GambleMatrix;
use crate::quant::powerset::SubsetIndex;
use crate::quant::OptionType;

use super::projected::duality_gap;
use super::projected::ProjectedGradient;
use super::SolverSettings;

/// Relative Tikhonov shift keeping the face systems regular.
const FACE_RIDGE: f64 = 1e-15;

/// Stacked call and put pricing program.
#[derive(Clone, Debug)]
pub struct CalibrationProblem {
  /// Calls first, then puts.
  coefficients: DMatrix<f64>,
  market: DVector<f64>,
  n_calls: usize,
  states: usize,
  discount: f64,
  epsilon: f64,
  /// Lipschitz constant of the gradient, `2 λmax(A Aᵀ)` with `A = G / R`.
  lipschitz: f64,
}

/// Optimal point of a [`CalibrationProblem`].
#[derive(Clone, Debug)]
pub struct Solution {
  pub weights: Vec<f64>,
  pub error: f64,
  /// Duality gap at `weights`, bounds the distance to the optimal error.
  pub gap: f64,
  pub iterations: u64,
}

impl CalibrationProblem {
  pub fn new(
    calls: &GambleMatrix,
    puts: &GambleMatrix,
    call_prices: &[f64],
    put_prices: &[f64],
    discount: f64,
    epsilon: f64,
    index: &SubsetIndex,
  ) -> Result<Self> {
    if calls.option_type != OptionType::Call || puts.option_type != OptionType::Put {
      return Err(CalibrationError::input("expected a call and a put gamble matrix"));
    }
    if calls.nrows() != call_prices.len() || puts.nrows() != put_prices.len() {
      return Err(CalibrationError::input(
        "gamble rows and market prices have different lengths",
      ));
    }
    if calls.ncols() != index.len() || puts.ncols() != index.len() {
      return Err(CalibrationError::input(
        "gamble columns do not match the subset index",
      ));
    }
    if !(discount.is_finite() && discount > 0.0) {
      return Err(CalibrationError::input(format!(
        "discount factor must be positive, got {discount}"
      )));
    }
    let states = index.states();
    if !(epsilon > 0.0 && (states as f64) * epsilon < 1.0) {
      return Err(CalibrationError::input(format!(
        "epsilon must satisfy 0 < {states} * epsilon < 1, got {epsilon}"
      )));
    }

    let n_calls = calls.nrows();
    let rows = n_calls + puts.nrows();
    let cols = index.len();
    let coefficients = DMatrix::from_fn(rows, cols, |i, j| {
      if i < n_calls {
        calls.get(i, j)
      } else {
        puts.get(i - n_calls, j)
      }
    });
    let market = DVector::from_iterator(
      rows,
      call_prices.iter().chain(put_prices).copied(),
    );

    let scaled = &coefficients / discount;
    let gram = &scaled * scaled.transpose();
    let lipschitz = (2.0 * gram.symmetric_eigenvalues().max()).max(f64::EPSILON);

    Ok(Self {
      coefficients,
      market,
      n_calls,
      states,
      discount,
      epsilon,
      lipschitz,
    })
  }

  /// Number of decision weights.
  pub fn dim(&self) -> usize {
    self.coefficients.ncols()
  }

  pub fn n_calls(&self) -> usize {
    self.n_calls
  }

  pub fn market(&self) -> &DVector<f64> {
    &self.market
  }

  /// Mass floors: `epsilon` on singletons, zero elsewhere.
  pub fn lower_bounds(&self) -> Vec<f64> {
    (0..self.dim())
      .map(|j| if j < self.states { self.epsilon } else { 0.0 })
      .collect()
  }

  /// Mass left after the floors, `1 - n epsilon`.
  pub fn free_mass(&self) -> f64 {
    1.0 - self.states as f64 * self.epsilon
  }

  /// Floors plus the free mass spread evenly over all subsets.
  pub fn starting_point(&self) -> Vec<f64> {
    let share = self.free_mass() / self.dim() as f64;
    self.lower_bounds().into_iter().map(|l| l + share).collect()
  }

  /// Discounted model prices, calls then puts.
  pub fn model_prices(&self, weights: &[f64]) -> DVector<f64> {
    let m = DVector::from_column_slice(weights);
    &self.coefficients * m / self.discount
  }

  /// Per-quote squared errors, calls then puts.
  pub fn squared_errors(&self, weights: &[f64]) -> Vec<f64> {
    (self.model_prices(weights) - &self.market)
      .iter()
      .map(|r| r * r)
      .collect()
  }

  /// Aggregate squared error of a weight vector.
  pub fn error(&self, weights: &[f64]) -> f64 {
    (self.model_prices(weights) - &self.market).norm_squared()
  }

  /// `∂E/∂m = 2/R Gᵀ r`.
  pub fn error_gradient(&self, weights: &[f64]) -> Vec<f64> {
    let residuals = self.model_prices(weights) - &self.market;
    let grad = self.coefficients.tr_mul(&residuals) * (2.0 / self.discount);
    grad.iter().copied().collect()
  }

  /// KKT residual of `weights`, zero exactly at an optimum.
  pub fn optimality_gap(&self, weights: &[f64]) -> f64 {
    duality_gap(&self.error_gradient(weights), weights, &self.lower_bounds())
  }

  /// Run exactly one solve from the uniform starting point.
  pub fn solve(&self, settings: &SolverSettings) -> Result<Solution> {
    let failed = |e: argmin::core::Error| CalibrationError::OptimizationFailure(e.to_string());

    let solver = ProjectedGradient::new(self.lower_bounds(), 1.0 / self.lipschitz)
      .with_tolerance(settings.gap_tolerance)
      .with_polish_every(settings.polish_every);
    let x0 = self.starting_point();
    let res = Executor::new(self.clone(), solver)
      .configure(|state| state.param(x0).max_iters(settings.max_iters))
      .run()
      .map_err(failed)?;

    let state = res.state();
    let iterations = state.get_iter();
    let status = state.get_termination_status().clone();
    if status != TerminationStatus::Terminated(TerminationReason::SolverConverged) {
      return Err(CalibrationError::OptimizationFailure(format!(
        "solver stopped without converging after {iterations} iterations: {status:?}"
      )));
    }

    let weights = state.get_param().cloned().ok_or_else(|| {
      CalibrationError::OptimizationFailure("solver returned no parameter".into())
    })?;
    let error = self.error(&weights);
    if !error.is_finite() {
      return Err(CalibrationError::OptimizationFailure(format!(
        "non-finite objective {error}"
      )));
    }
    let gap = self.optimality_gap(&weights);
    if gap > settings.gap_tolerance * error.max(1.0) {
      return Err(CalibrationError::OptimizationFailure(format!(
        "KKT conditions violated, duality gap {gap:e} at error {error}"
      )));
    }

    debug!(iterations, error, gap, "solver terminated");
    Ok(Solution {
      weights,
      error,
      gap,
      iterations,
    })
  }

  /// Minimizer of `E` on the face spanned by the support of `weights`.
  ///
  /// Coordinates that would turn negative are dropped one at a time, walking
  /// from `weights` towards each face minimizer, so the result is always
  /// feasible. `None` when no face yields a non-negative minimizer.
  pub(crate) fn polish(&self, weights: &[f64]) -> Option<Vec<f64>> {
    let lower = self.lower_bounds();
    let target = &self.market - self.model_prices(&lower);
    let mut free: Vec<f64> = weights.iter().zip(&lower).map(|(m, l)| m - l).collect();
    let mut support: Vec<usize> = (0..free.len()).filter(|&j| free[j] > 0.0).collect();

    while !support.is_empty() {
      let y = self.face_minimizer(&support, &target)?;
      if y.iter().all(|v| *v >= 0.0) {
        let mut out = lower;
        for (&j, v) in support.iter().zip(y.iter()) {
          out[j] += v;
        }
        return Some(out);
      }

      let (hit, step) = support
        .iter()
        .zip(y.iter())
        .filter(|(_, v)| **v < 0.0)
        .map(|(&j, v)| (j, free[j] / (free[j] - v)))
        .fold((usize::MAX, f64::INFINITY), |best, cand| {
          if cand.1 < best.1 {
            cand
          } else {
            best
          }
        });
      for (&j, v) in support.iter().zip(y.iter()) {
        free[j] += step * (v - free[j]);
      }
      if let Some(x) = free.get_mut(hit) {
        *x = 0.0;
      }
      support.retain(|&j| free[j] > 1e-15);
    }
    None
  }

  /// Solve the KKT system of `min ||A_S y - target||²` subject to `Σ y = free mass`.
  fn face_minimizer(&self, support: &[usize], target: &DVector<f64>) -> Option<DVector<f64>> {
    let k = support.len();
    let a = self.coefficients.select_columns(support) / self.discount;
    let gram = a.tr_mul(&a) * 2.0;
    let ridge = FACE_RIDGE * self.lipschitz;

    let mut kkt = DMatrix::<f64>::zeros(k + 1, k + 1);
    kkt.view_mut((0, 0), (k, k)).copy_from(&gram);
    for i in 0..k {
      kkt[(i, i)] += ridge;
      kkt[(i, k)] = 1.0;
      kkt[(k, i)] = 1.0;
    }
    let mut rhs = DVector::<f64>::zeros(k + 1);
    rhs.rows_mut(0, k).copy_from(&(a.tr_mul(target) * 2.0));
    rhs[k] = self.free_mass();

    let sol = kkt.lu().solve(&rhs)?;
    if sol.iter().any(|v| !v.is_finite()) {
      return None;
    }
    Some(sol.rows(0, k).into_owned())
  }
}

impl CostFunction for CalibrationProblem {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, weights: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    Ok(self.error(weights))
  }
}

impl Gradient for CalibrationProblem {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(
    &self,
    weights: &Self::Param,
  ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
    Ok(self.error_gradient(weights))
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::quant::lattice::PriceLattice;
  use crate::quant::quotes::OptionQuote;
  use crate::quant::quotes::QuoteTable;

  fn tables() -> (QuoteTable, QuoteTable) {
    let calls = QuoteTable::new(OptionType::Call, vec![OptionQuote::new(130.0, 20.0, 24.0)]).unwrap();
    let puts = QuoteTable::new(OptionType::Put, vec![OptionQuote::new(150.0, 10.0, 14.0)]).unwrap();
    (calls, puts)
  }

  fn problem(epsilon: f64) -> CalibrationProblem {
    let index = SubsetIndex::new(2).unwrap();
    let lattice = PriceLattice::from_closes(&[100.0, 200.0], 2).unwrap();
    let (calls, puts) = tables();
    let gc = GambleMatrix::build(0.5, &index, &lattice, &calls).unwrap();
    let gp = GambleMatrix::build(0.5, &index, &lattice, &puts).unwrap();
    CalibrationProblem::new(
      &gc,
      &gp,
      &calls.mixed_prices(0.5),
      &puts.mixed_prices(0.5),
      1.01,
      epsilon,
      &index,
    )
    .unwrap()
  }

  #[test]
  fn test_starting_point_is_admissible() {
    let p = problem(1e-4);
    let w = p.starting_point();
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(w[0] >= 1e-4 && w[1] >= 1e-4 && w[2] >= 0.0);
    assert_eq!(p.lower_bounds(), vec![1e-4, 1e-4, 0.0]);
  }

  #[test]
  fn test_gradient_matches_finite_differences() {
    let p = problem(1e-2);
    let w = vec![0.3, 0.5, 0.2];
    let grad = p.gradient(&w).unwrap();
    let h = 1e-6;
    for k in 0..w.len() {
      let mut up = w.clone();
      let mut down = w.clone();
      up[k] += h;
      down[k] -= h;
      let fd = (p.cost(&up).unwrap() - p.cost(&down).unwrap()) / (2.0 * h);
      assert_abs_diff_eq!(grad[k], fd, epsilon = 1e-4);
    }
  }

  #[test]
  fn test_error_decomposes_per_quote() {
    let p = problem(1e-4);
    let w = p.starting_point();
    let parts = p.squared_errors(&w);
    assert_eq!(parts.len(), 2);
    assert_abs_diff_eq!(parts.iter().sum::<f64>(), p.error(&w), epsilon = 1e-10);
  }

  #[test]
  fn test_solution_satisfies_kkt() {
    let p = problem(1e-4);
    let sol = p.solve(&SolverSettings::default()).unwrap();
    assert_abs_diff_eq!(sol.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(sol.weights[0] >= 1e-4 && sol.weights[1] >= 1e-4 && sol.weights[2] >= 0.0);
    assert!(p.optimality_gap(&sol.weights) <= 1e-7 * sol.error.max(1.0));
    // no admissible point does better than the certified optimum
    for w in [
      p.starting_point(),
      vec![0.9998, 1e-4, 1e-4],
      vec![1e-4, 0.9998, 1e-4],
      vec![1e-4, 1e-4, 0.9998],
      vec![0.4, 0.4, 0.2],
    ] {
      assert!(sol.error <= p.error(&w) + 1e-7);
    }
  }

  #[test]
  fn test_polish_returns_a_feasible_face_minimizer() {
    let p = problem(1e-4);
    let polished = p.polish(&p.starting_point()).unwrap();
    assert_abs_diff_eq!(polished.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(polished
      .iter()
      .zip(p.lower_bounds())
      .all(|(m, l)| *m >= l));
    assert!(p.error(&polished) <= p.error(&p.starting_point()));
  }

  #[test]
  fn test_iteration_limit_is_a_failure() {
    let p = problem(1e-4);
    let settings = SolverSettings {
      max_iters: 1,
      ..Default::default()
    };
    assert!(matches!(
      p.solve(&settings),
      Err(CalibrationError::OptimizationFailure(_))
    ));
  }

  #[test]
  fn test_rejects_bad_epsilon_and_discount() {
    let index = SubsetIndex::new(2).unwrap();
    let lattice = PriceLattice::from_closes(&[100.0, 200.0], 2).unwrap();
    let (calls, puts) = tables();
    let gc = GambleMatrix::build(0.5, &index, &lattice, &calls).unwrap();
    let gp = GambleMatrix::build(0.5, &index, &lattice, &puts).unwrap();
    let (c, p) = (calls.mixed_prices(0.5), puts.mixed_prices(0.5));

    assert!(CalibrationProblem::new(&gc, &gp, &c, &p, 1.0, 0.5, &index).is_err());
    assert!(CalibrationProblem::new(&gc, &gp, &c, &p, 1.0, 0.0, &index).is_err());
    assert!(CalibrationProblem::new(&gc, &gp, &c, &p, 0.0, 1e-4, &index).is_err());
    assert!(CalibrationProblem::new(&gp, &gc, &p, &c, 1.0, 1e-4, &index).is_err());
  }
}
