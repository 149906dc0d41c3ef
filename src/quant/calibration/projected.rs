//! # Accelerated Projected Gradient
//!
//! $$
//! m_{k+1} = \Pi_{\mathcal M}\big(y_k - \tfrac1L\nabla E(y_k)\big),\qquad
//! \mathcal M = \{m : m \ge \ell,\ \textstyle\sum_j m_j = 1\}
//! $$
//!
//! FISTA with gradient restart on the floored simplex, driven by argmin's
//! [`Executor`](argmin::core::Executor). Every few iterations the current support
//! is polished by an exact least-squares solve on its face. The run stops once
//! the duality gap
//!
//! $$
//! \Delta(m)=\sum_j\big(\partial_j E(m)-\min_k\partial_k E(m)\big)(m_j-\ell_j)\ \ge\ E(m)-E^\star
//! $$
//!
//! falls below the tolerance, which certifies the KKT conditions.

use argmin::core::ArgminError;
use argmin::core::Error;
use argmin::core::IterState;
use argmin::core::Problem;
use argmin::core::Solver;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::core::KV;

use super::problem::CalibrationProblem;

pub(crate) type WeightState = IterState<Vec<f64>, Vec<f64>, (), (), (), f64>;

/// Projected gradient solver for [`CalibrationProblem`].
#[derive(Clone, Debug)]
pub struct ProjectedGradient {
  lower: Vec<f64>,
  step: f64,
  tolerance: f64,
  polish_every: u64,
  extrapolated: Vec<f64>,
  momentum: f64,
  gap: f64,
}

impl ProjectedGradient {
  /// `lower` are the mass floors, `step` the inverse Lipschitz constant of the gradient.
  pub fn new(lower: Vec<f64>, step: f64) -> Self {
    Self {
      lower,
      step,
      tolerance: 1e-7,
      polish_every: 25,
      extrapolated: Vec::new(),
      momentum: 1.0,
      gap: f64::INFINITY,
    }
  }

  /// Relative duality gap accepted as converged.
  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }

  /// Polish the support every `every` iterations, never when zero.
  pub fn with_polish_every(mut self, every: u64) -> Self {
    self.polish_every = every;
    self
  }

  /// Duality gap of the last iterate.
  pub fn gap(&self) -> f64 {
    self.gap
  }
}

impl Solver<CalibrationProblem, WeightState> for ProjectedGradient {
  const NAME: &'static str = "Projected gradient";

  fn init(
    &mut self,
    problem: &mut Problem<CalibrationProblem>,
    mut state: WeightState,
  ) -> Result<(WeightState, Option<KV>), Error> {
    let start = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
      text: "projected gradient needs a starting point".to_string(),
    })?;
    if start.len() != self.lower.len() {
      return Err(
        ArgminError::InvalidParameter {
          text: format!(
            "starting point has {} weights, expected {}",
            start.len(),
            self.lower.len()
          ),
        }
        .into(),
      );
    }

    let m = project_onto_floored_simplex(&start, &self.lower);
    let cost = problem.cost(&m)?;
    let grad = problem.gradient(&m)?;
    self.gap = duality_gap(&grad, &m, &self.lower);
    self.extrapolated = m.clone();
    self.momentum = 1.0;

    Ok((state.param(m).cost(cost).gradient(grad), None))
  }

  fn next_iter(
    &mut self,
    problem: &mut Problem<CalibrationProblem>,
    mut state: WeightState,
  ) -> Result<(WeightState, Option<KV>), Error> {
    let prev = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
      text: "projected gradient lost its iterate".to_string(),
    })?;

    let grad_y = problem.gradient(&self.extrapolated)?;
    let trial: Vec<f64> = self
      .extrapolated
      .iter()
      .zip(&grad_y)
      .map(|(y, g)| y - self.step * g)
      .collect();
    let mut next = project_onto_floored_simplex(&trial, &self.lower);

    // restart the momentum when the step points uphill
    let uphill: f64 = grad_y
      .iter()
      .zip(next.iter().zip(&prev))
      .map(|(g, (n, p))| g * (n - p))
      .sum();
    if uphill > 0.0 {
      self.momentum = 1.0;
      self.extrapolated = next.clone();
    } else {
      let momentum = (1.0 + (1.0 + 4.0 * self.momentum * self.momentum).sqrt()) / 2.0;
      let beta = (self.momentum - 1.0) / momentum;
      self.extrapolated = next
        .iter()
        .zip(&prev)
        .map(|(n, p)| n + beta * (n - p))
        .collect();
      self.momentum = momentum;
    }

    let mut cost = problem.cost(&next)?;
    if self.polish_every > 0 && (state.get_iter() + 1) % self.polish_every == 0 {
      let polished = problem.problem("polish_count", |p| Ok(p.polish(&next)))?;
      if let Some(candidate) = polished {
        let candidate_cost = problem.cost(&candidate)?;
        if candidate_cost <= cost {
          next = candidate;
          cost = candidate_cost;
          self.extrapolated = next.clone();
          self.momentum = 1.0;
        }
      }
    }

    let grad = problem.gradient(&next)?;
    self.gap = duality_gap(&grad, &next, &self.lower);

    Ok((state.param(next).cost(cost).gradient(grad), None))
  }

  fn terminate(&mut self, state: &WeightState) -> TerminationStatus {
    if self.gap <= self.tolerance * state.get_cost().max(1.0) {
      TerminationStatus::Terminated(TerminationReason::SolverConverged)
    } else {
      TerminationStatus::NotTerminated
    }
  }
}

/// Euclidean projection of `v` onto `{m >= lower, sum(m) = 1}`.
pub fn project_onto_floored_simplex(v: &[f64], lower: &[f64]) -> Vec<f64> {
  let total = 1.0 - lower.iter().sum::<f64>();
  let shifted: Vec<f64> = v.iter().zip(lower).map(|(x, l)| x - l).collect();

  let mut sorted = shifted.clone();
  sorted.sort_unstable_by(|a, b| b.total_cmp(a));
  let mut cumsum = 0.0;
  let mut theta = 0.0;
  for (i, u) in sorted.iter().enumerate() {
    cumsum += u;
    let t = (cumsum - total) / (i + 1) as f64;
    if u - t > 0.0 {
      theta = t;
    }
  }

  shifted
    .iter()
    .zip(lower)
    .map(|(x, l)| (x - theta).max(0.0) + l)
    .collect()
}

/// Frank-Wolfe duality gap of `m`, an upper bound on `E(m) - E*`.
pub fn duality_gap(gradient: &[f64], m: &[f64], lower: &[f64]) -> f64 {
  let g_min = gradient.iter().copied().fold(f64::INFINITY, f64::min);
  gradient
    .iter()
    .zip(m.iter().zip(lower))
    .map(|(g, (x, l))| (g - g_min) * (x - l).max(0.0))
    .sum()
}
