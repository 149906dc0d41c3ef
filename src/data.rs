//! # Datasets
//!
//! CSV readers for the stock history and the option chains. Stock files need a
//! close column (`Close` by default); option files need `strike`, `bid` and `ask`
//! columns. Other columns are ignored.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::CalibrationError;
use crate::error::Result;
use crate::quant::quotes::OptionQuote;
use crate::quant::quotes::QuoteTable;
use crate::quant::OptionType;

pub const DEFAULT_CLOSE_COLUMN: &str = "Close";

/// Closing prices from a CSV file.
pub fn load_closes<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<f64>> {
  let path = path.as_ref();
  let closes = read_closes(std::fs::File::open(path)?, column)?;
  debug!(path = %path.display(), rows = closes.len(), "loaded closes");
  Ok(closes)
}

pub fn read_closes<R: Read>(reader: R, column: &str) -> Result<Vec<f64>> {
  let mut rdr = csv::Reader::from_reader(reader);
  let col = rdr
    .headers()?
    .iter()
    .position(|h| h.trim() == column)
    .ok_or_else(|| CalibrationError::input(format!("missing column `{column}`")))?;

  let mut closes = Vec::new();
  for (row, record) in rdr.records().enumerate() {
    let record = record?;
    let field = record.get(col).unwrap_or_default().trim();
    let value = field.parse::<f64>().map_err(|_| {
      CalibrationError::input(format!("row {}: cannot parse close `{field}`", row + 1))
    })?;
    closes.push(value);
  }

  if closes.is_empty() {
    return Err(CalibrationError::input("price series is empty"));
  }
  Ok(closes)
}

/// Option quotes of one type from a CSV file.
pub fn load_quotes<P: AsRef<Path>>(path: P, option_type: OptionType) -> Result<QuoteTable> {
  let path = path.as_ref();
  let table = read_quotes(std::fs::File::open(path)?, option_type)?;
  debug!(path = %path.display(), rows = table.len(), %option_type, "loaded quotes");
  Ok(table)
}

pub fn read_quotes<R: Read>(reader: R, option_type: OptionType) -> Result<QuoteTable> {
  let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
  let quotes = rdr
    .deserialize::<OptionQuote>()
    .collect::<std::result::Result<Vec<_>, _>>()?;
  QuoteTable::new(option_type, quotes)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn test_read_closes() {
    let csv = "Date,Open,Close\n2022-01-24,1.0,100.5\n2022-01-25,1.0,120.25\n";
    let closes = read_closes(csv.as_bytes(), DEFAULT_CLOSE_COLUMN).unwrap();
    assert_eq!(closes, vec![100.5, 120.25]);
  }

  #[test]
  fn test_missing_column_and_bad_value() {
    let csv = "Date,Open\n2022-01-24,1.0\n";
    assert!(matches!(
      read_closes(csv.as_bytes(), "Close"),
      Err(CalibrationError::InputData(_))
    ));
    let csv = "Close\nabc\n";
    assert!(matches!(
      read_closes(csv.as_bytes(), "Close"),
      Err(CalibrationError::InputData(_))
    ));
  }

  #[test]
  fn test_read_quotes_ignores_extra_columns() {
    let csv = "contractSymbol,strike,lastPrice,bid,ask\nX1,130.0,21.0,20.5,21.5\nX2,140.0,13.0,12.5, 13.5\n";
    let table = read_quotes(csv.as_bytes(), OptionType::Call).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.quotes()[1], OptionQuote::new(140.0, 12.5, 13.5));
  }

  #[test]
  fn test_read_quotes_rejects_crossed() {
    let csv = "strike,bid,ask\n130.0,22.0,21.0\n";
    assert!(read_quotes(csv.as_bytes(), OptionType::Put).is_err());
  }

  #[test]
  fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Close\n101.0\n99.5").unwrap();
    let closes = load_closes(file.path(), "Close").unwrap();
    assert_eq!(closes, vec![101.0, 99.5]);
    assert!(matches!(
      load_closes("does/not/exist.csv", "Close"),
      Err(CalibrationError::Io(_))
    ));
  }
}
