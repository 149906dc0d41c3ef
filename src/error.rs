//! # Errors
//!
//! Failure modes of a calibration run. Every error is surfaced to the caller
//! immediately; a run never returns a partial result.

use thiserror::Error;

/// Errors raised while loading data, building the lattice or calibrating.
#[derive(Error, Debug)]
pub enum CalibrationError {
  /// Malformed or empty price/quote data, or an invalid run configuration.
  #[error("invalid input data: {0}")]
  InputData(String),

  /// The rounded historical price range collapsed to a single value.
  #[error("degenerate price range: rounded min and max are both {value}")]
  DegenerateRange { value: f64 },

  /// The optimizer did not terminate with a converged, finite solution.
  #[error("optimization failed: {0}")]
  OptimizationFailure(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Csv(#[from] csv::Error),
}

impl CalibrationError {
  pub(crate) fn input(msg: impl Into<String>) -> Self {
    Self::InputData(msg.into())
  }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
