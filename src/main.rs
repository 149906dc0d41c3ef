use std::path::PathBuf;

use alpha_ds::data::load_closes;
use alpha_ds::data::load_quotes;
use alpha_ds::data::DEFAULT_CLOSE_COLUMN;
use alpha_ds::quant::rates::discount_factor;
use alpha_ds::quant::rates::year_fraction;
use alpha_ds::quant::tuning::best_alpha;
use alpha_ds::quant::tuning::default_alpha_grid;
use alpha_ds::quant::tuning::tune;
use alpha_ds::report;
use alpha_ds::AlphaDsCalibrator;
use alpha_ds::CalibrationConfig;
use alpha_ds::OptionType;
use alpha_ds::SolverSettings;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "alpha-ds", version, about = "Calibrate alpha-DS mixture models to option quotes")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Calibrate the Möbius inverse for one mixing parameter.
  Calibrate {
    #[command(flatten)]
    market: MarketArgs,
    /// Mixing parameter alpha in [0, 1].
    #[arg(long, default_value_t = 0.7)]
    alpha: f64,
    /// Decimals printed for the masses.
    #[arg(long, default_value_t = 4)]
    precision: usize,
    /// Also print market against model prices.
    #[arg(long)]
    show_fit: bool,
  },
  /// Calibrate over a grid of mixing parameters and compare the optimal errors.
  Tune {
    #[command(flatten)]
    market: MarketArgs,
    /// Comma separated alphas, defaults to 0.0, 0.1, ..., 1.0.
    #[arg(long, value_delimiter = ',')]
    alphas: Option<Vec<f64>>,
    /// Legend label of the plot.
    #[arg(long, default_value = "stock")]
    label: String,
    /// Write the normalized error curve to this HTML file.
    #[arg(long)]
    plot: Option<PathBuf>,
  },
}

#[derive(Args, Debug)]
struct MarketArgs {
  /// Stock history CSV.
  #[arg(long)]
  stock: PathBuf,
  /// Call quotes CSV (strike, bid, ask).
  #[arg(long)]
  calls: PathBuf,
  /// Put quotes CSV (strike, bid, ask).
  #[arg(long)]
  puts: PathBuf,
  #[arg(long, default_value = DEFAULT_CLOSE_COLUMN)]
  close_column: String,
  /// Number of future values of the stock.
  #[arg(short, long, default_value_t = 5)]
  states: usize,
  /// Annual risk-free rate.
  #[arg(long, default_value_t = 0.0469)]
  rate: f64,
  /// Time to maturity in years.
  #[arg(long, conflicts_with_all = ["valuation_date", "expiry"])]
  tau: Option<f64>,
  /// Valuation date (YYYY-MM-DD), used with --expiry.
  #[arg(long, requires = "expiry")]
  valuation_date: Option<NaiveDate>,
  /// Option expiry (YYYY-MM-DD), used with --valuation-date.
  #[arg(long, requires = "valuation_date")]
  expiry: Option<NaiveDate>,
  /// Discount factor R, overrides rate and maturity.
  #[arg(long)]
  discount: Option<f64>,
  /// Lower bound of singleton masses.
  #[arg(long, default_value_t = 1e-4)]
  epsilon: f64,
  #[arg(long, default_value_t = 10_000)]
  max_iters: u64,
  /// Accepted duality gap of the solve, relative to max(1, E).
  #[arg(long, default_value_t = 1e-7)]
  gap_tolerance: f64,
}

impl MarketArgs {
  fn discount(&self) -> Result<f64> {
    if let Some(r) = self.discount {
      return Ok(r);
    }
    let tau = match (self.tau, self.valuation_date, self.expiry) {
      (Some(tau), ..) => tau,
      (None, Some(eval), Some(expiry)) => year_fraction(eval, expiry)?,
      _ => bail!("give --discount, --tau, or both --valuation-date and --expiry"),
    };
    Ok(discount_factor(self.rate, tau)?)
  }

  fn config(&self, alpha: f64) -> Result<CalibrationConfig> {
    Ok(CalibrationConfig {
      states: self.states,
      alpha,
      discount: self.discount()?,
      epsilon: self.epsilon,
      solver: SolverSettings {
        max_iters: self.max_iters,
        gap_tolerance: self.gap_tolerance,
        ..Default::default()
      },
    })
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  match cli.command {
    Command::Calibrate {
      market,
      alpha,
      precision,
      show_fit,
    } => {
      let config = market.config(alpha)?;
      let closes = load_closes(&market.stock, &market.close_column)
        .with_context(|| format!("reading {}", market.stock.display()))?;
      let calls = load_quotes(&market.calls, OptionType::Call)
        .with_context(|| format!("reading {}", market.calls.display()))?;
      let puts = load_quotes(&market.puts, OptionType::Put)
        .with_context(|| format!("reading {}", market.puts.display()))?;
      info!(n = config.states, alpha, discount = config.discount, "calibrating");

      let result = AlphaDsCalibrator::new(config).calibrate(&closes, &calls, &puts)?;

      println!("States are indexed from 0, Omega = {{0, ..., {}}}", result.lattice.len() - 1);
      println!("S1 = {:?}", result.lattice.values());
      println!("Minimum squared error = {}", result.error);
      println!("Duality gap = {:e}", result.optimality_gap);
      println!("RMSE = {:.6}", result.loss_scores.rmse);
      report::mobius_table(&result, precision).printstd();
      if show_fit {
        report::fit_table(&result, &calls.mixed_prices(alpha), &puts.mixed_prices(alpha))
          .printstd();
      }
    }
    Command::Tune {
      market,
      alphas,
      label,
      plot,
    } => {
      let alphas = alphas.unwrap_or_else(default_alpha_grid);
      let config = market.config(alphas.first().copied().unwrap_or(0.0))?;
      let closes = load_closes(&market.stock, &market.close_column)
        .with_context(|| format!("reading {}", market.stock.display()))?;
      let calls = load_quotes(&market.calls, OptionType::Call)
        .with_context(|| format!("reading {}", market.calls.display()))?;
      let puts = load_quotes(&market.puts, OptionType::Put)
        .with_context(|| format!("reading {}", market.puts.display()))?;

      let points = tune(&closes, &calls, &puts, &alphas, &config)?;
      report::tuning_table(&points).printstd();
      if let Some(best) = best_alpha(&points) {
        println!("Best alpha = {:.1} (error {:.6})", best.alpha, best.error);
      }
      if let Some(path) = plot {
        report::plot_normalized_errors(&points, &label, &path)
          .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "plot written");
      }
    }
  }

  Ok(())
}
