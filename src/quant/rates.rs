//! # Discounting
//!
//! $$
//! R=(1+r)^{\tau}
//! $$
//!

use chrono::NaiveDate;

use crate::error::CalibrationError;
use crate::error::Result;

/// ACT/365 year fraction between the valuation date and the expiry.
pub fn year_fraction(eval: NaiveDate, expiration: NaiveDate) -> Result<f64> {
  let days = expiration.signed_duration_since(eval).num_days();
  if days < 0 {
    return Err(CalibrationError::input(format!(
      "expiry {expiration} is before valuation date {eval}"
    )));
  }
  Ok(days as f64 / 365.0)
}

/// Risk-free return over `tau` years at annual rate `r`.
pub fn discount_factor(r: f64, tau: f64) -> Result<f64> {
  if !(r.is_finite() && r > -1.0 && tau.is_finite() && tau >= 0.0) {
    return Err(CalibrationError::input(format!(
      "invalid rate {r} or maturity {tau}"
    )));
  }
  Ok((1.0 + r).powf(tau))
}
