//! # alpha-ds
//!
//! $$
//! \pi_\alpha(X)=\frac1R\sum_{B\subseteq\Omega}m(B)\Big(\alpha\min_{B}X+(1-\alpha)\max_{B}X\Big)
//! $$
//!
//! Calibration of α-DS mixture pricing models to option bid-ask quotes. A
//! historical price range is discretized into `n` future states and the masses of a
//! Möbius inverse over the non-empty subsets of those states are fitted, by
//! constrained least squares, to the α-mixed market prices of calls and puts.

pub mod data;
pub mod error;
pub mod quant;
pub mod report;

pub use error::CalibrationError;
pub use quant::calibration::AlphaDsCalibrator;
pub use quant::calibration::CalibrationConfig;
pub use quant::calibration::CalibrationResult;
pub use quant::calibration::SolverSettings;
pub use quant::lattice::PriceLattice;
pub use quant::mobius::MobiusInverse;
pub use quant::powerset::SubsetIndex;
pub use quant::quotes::OptionQuote;
pub use quant::quotes::QuoteTable;
pub use quant::OptionType;
