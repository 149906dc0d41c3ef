//! # Report
//!
//! Tables and charts for calibration and tuning output.

use std::fs;
use std::path::Path;

use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;
use plotly::layout::Layout;
use plotly::Plot;
use plotly::Scatter;
use prettytable::row;
use prettytable::Table;

use crate::error::Result;
use crate::quant::calibration::CalibrationResult;
use crate::quant::tuning::normalize_errors;
use crate::quant::tuning::TuningPoint;

/// `{0, 2}` style rendering of a subset.
pub fn format_subset(subset: &[usize]) -> String {
  let items = subset
    .iter()
    .map(|i| i.to_string())
    .collect::<Vec<_>>()
    .join(", ");
  format!("{{{items}}}")
}

/// One row per subset in index order.
pub fn mobius_table(result: &CalibrationResult, precision: usize) -> Table {
  let mut table = Table::new();
  table.set_titles(row!["index", "subset", "m"]);
  for (j, subset) in result.subsets().iter() {
    table.add_row(row![
      j,
      format_subset(subset),
      format!("{:.*}", precision, result.mobius.mass(j))
    ]);
  }
  table
}

/// Market against model prices for every quote.
pub fn fit_table(result: &CalibrationResult, market_calls: &[f64], market_puts: &[f64]) -> Table {
  let mut table = Table::new();
  table.set_titles(row!["type", "row", "market", "model", "sq. error"]);
  let sides = [
    ("call", market_calls, &result.call_prices, &result.call_errors),
    ("put", market_puts, &result.put_prices, &result.put_errors),
  ];
  for (kind, market, model, errors) in sides {
    for (i, ((p, m), e)) in market.iter().zip(model.iter()).zip(errors.iter()).enumerate() {
      table.add_row(row![
        kind,
        i,
        format!("{p:.4}"),
        format!("{m:.4}"),
        format!("{e:.6}")
      ]);
    }
  }
  table
}

pub fn tuning_table(points: &[TuningPoint]) -> Table {
  let errors: Vec<f64> = points.iter().map(|p| p.error).collect();
  let normalized = normalize_errors(&errors);

  let mut table = Table::new();
  table.set_titles(row!["alpha", "error", "normalized"]);
  for (p, n) in points.iter().zip(normalized) {
    table.add_row(row![
      format!("{:.1}", p.alpha),
      format!("{:.6}", p.error),
      format!("{n:.4}")
    ]);
  }
  table
}

/// Write the normalized optimal error as a function of α to an HTML file.
pub fn plot_normalized_errors(points: &[TuningPoint], label: &str, path: &Path) -> Result<()> {
  let alphas: Vec<f64> = points.iter().map(|p| p.alpha).collect();
  let errors: Vec<f64> = points.iter().map(|p| p.error).collect();

  let trace = Scatter::new(alphas, normalize_errors(&errors))
    .mode(Mode::LinesMarkers)
    .name(label);
  let mut plot = Plot::new();
  plot.add_trace(trace);
  plot.set_layout(
    Layout::new()
      .title(Title::from("Normalized optimal squared error as a function of alpha"))
      .x_axis(Axis::new().title("alpha"))
      .y_axis(Axis::new().title("Normalized E")),
  );
  fs::write(path, plot.to_html())?;
  Ok(())
}
