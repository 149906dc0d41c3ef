//! # Option Quotes
//!
//! $$
//! p_\alpha = \alpha\,p^{bid} + (1-\alpha)\,p^{ask}
//! $$
//!
//! Validated bid/ask tables for one option type and one expiry.

use serde::Deserialize;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::round_to;
use crate::quant::OptionType;

/// One market quote row.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct OptionQuote {
  pub strike: f64,
  pub bid: f64,
  pub ask: f64,
}

impl OptionQuote {
  pub fn new(strike: f64, bid: f64, ask: f64) -> Self {
    Self { strike, bid, ask }
  }

  /// α-mixture of bid and ask, rounded to 6 decimals like the gamble coefficients.
  pub fn mixed_price(&self, alpha: f64) -> f64 {
    round_to(alpha * self.bid + (1.0 - alpha) * self.ask, 6)
  }

  fn validate(&self, row: usize) -> Result<()> {
    let finite = self.strike.is_finite() && self.bid.is_finite() && self.ask.is_finite();
    if !finite || self.strike <= 0.0 {
      return Err(CalibrationError::input(format!(
        "row {row}: strike must be positive and prices finite ({self:?})"
      )));
    }
    if self.bid < 0.0 || self.ask < self.bid {
      return Err(CalibrationError::input(format!(
        "row {row}: expected 0 <= bid <= ask, got bid {} ask {}",
        self.bid, self.ask
      )));
    }
    Ok(())
  }
}

/// Quotes for a single option type.
#[derive(Clone, Debug)]
pub struct QuoteTable {
  pub option_type: OptionType,
  quotes: Vec<OptionQuote>,
}

impl QuoteTable {
  pub fn new(option_type: OptionType, quotes: Vec<OptionQuote>) -> Result<Self> {
    if quotes.is_empty() {
      return Err(CalibrationError::input(format!(
        "{option_type} quote table is empty"
      )));
    }
    for (row, q) in quotes.iter().enumerate() {
      q.validate(row)?;
    }
    Ok(Self {
      option_type,
      quotes,
    })
  }

  pub fn quotes(&self) -> &[OptionQuote] {
    &self.quotes
  }

  pub fn len(&self) -> usize {
    self.quotes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.quotes.is_empty()
  }

  pub fn strikes(&self) -> Vec<f64> {
    self.quotes.iter().map(|q| q.strike).collect()
  }

  /// Market α-mixed prices in row order.
  pub fn mixed_prices(&self, alpha: f64) -> Vec<f64> {
    self.quotes.iter().map(|q| q.mixed_price(alpha)).collect()
  }
}
