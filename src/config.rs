//! Configuration file support for optimization runs.
//!
//! Allows loading optimization setups from TOML files for reproducibility.

use crate::data::{CsvPriceProvider, DataConfig, PriceColumn};
use crate::error::{AgoraError, Result};
use crate::optimizer::OptimizerConfig;
use crate::risk_free::{ConstantRate, RiskFreeSource, YieldTable};
use crate::types::{parse_bound, DateRange, DATE_FORMAT};
use crate::universe::TickerUniverse;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete optimization configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationFileConfig {
    /// Instruments, dates and search size.
    #[serde(default)]
    pub portfolio: PortfolioSettings,
    /// Price file settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Risk-free rate settings.
    #[serde(default)]
    pub risk_free: RiskFreeSettings,
    /// Optional ticker universe for stock classification.
    #[serde(default)]
    pub universe: UniverseSettings,
}

/// Instruments and Monte Carlo settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSettings {
    /// Tickers to allocate across.
    #[serde(default)]
    pub tickers: Vec<String>,
    /// Start date (dd/mm/yyyy). Defaults to one year before `end`.
    #[serde(default)]
    pub start: Option<String>,
    /// End date (dd/mm/yyyy). Defaults to today.
    #[serde(default)]
    pub end: Option<String>,
    /// Number of random portfolios.
    #[serde(default = "default_portfolios")]
    pub num_portfolios: usize,
    /// Random seed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Evaluate portfolios in parallel.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_portfolios() -> usize { 5000 }
fn default_true() -> bool { true }

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            start: None,
            end: None,
            num_portfolios: 5000,
            seed: None,
            parallel: true,
        }
    }
}

/// Data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory holding one `<TICKER>.csv` per instrument.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Date format in the price files.
    pub date_format: Option<String>,
    /// Column the prices are read from.
    #[serde(default)]
    pub price_column: PriceColumn,
}

fn default_directory() -> String { "data".to_string() }

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            directory: "data".to_string(),
            date_format: None,
            price_column: PriceColumn::AdjClose,
        }
    }
}

/// Risk-free rate: a constant `rate`, or a `table` of dated yields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskFreeSettings {
    /// Constant annual rate as a fraction.
    pub rate: Option<f64>,
    /// CSV of `date,rate` observations averaged over the date range.
    pub table: Option<String>,
    /// Table rates are percentages.
    #[serde(default)]
    pub percent: bool,
}

/// Ticker universe settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseSettings {
    /// CSV with `Symbol` and `IPOyear` columns.
    pub path: Option<String>,
}

impl OptimizationFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: OptimizationFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AgoraError::InvalidConfiguration(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to the optimizer's configuration.
    ///
    /// The risk-free rate is resolved separately, since it may depend on the
    /// date range; see [`risk_free_source`](Self::risk_free_source).
    pub fn to_optimizer_config(&self) -> Result<OptimizerConfig> {
        if self.portfolio.tickers.is_empty() {
            return Err(AgoraError::InvalidConfiguration(
                "[portfolio] tickers must not be empty".to_string(),
            ));
        }
        if self.portfolio.num_portfolios == 0 {
            return Err(AgoraError::InvalidConfiguration(
                "[portfolio] num_portfolios must be positive".to_string(),
            ));
        }

        let mut config = OptimizerConfig::default().with_portfolios(self.portfolio.num_portfolios);
        if let Some(seed) = self.portfolio.seed {
            config = config.with_seed(seed);
        }
        if !self.portfolio.parallel {
            config = config.sequential();
        }
        Ok(config)
    }

    /// Date range from `start`/`end`, defaulting to the year ending today.
    pub fn date_range(&self) -> Result<DateRange> {
        let today = Local::now().date_naive();
        match (&self.portfolio.start, &self.portfolio.end) {
            (Some(start), Some(end)) => DateRange::parse(start, end),
            (None, None) => Ok(DateRange::trailing_year(today)),
            (Some(start), None) => DateRange::parse(start, &today.format(DATE_FORMAT).to_string()),
            (None, Some(end)) => Ok(DateRange::trailing_year(parse_bound(end, "end")?)),
        }
    }

    pub fn data_config(&self) -> DataConfig {
        DataConfig {
            date_format: self.data.date_format.clone(),
            price_column: self.data.price_column,
            ..Default::default()
        }
    }

    pub fn price_provider(&self) -> CsvPriceProvider {
        CsvPriceProvider::new(&self.data.directory).with_config(self.data_config())
    }

    /// Build the configured risk-free source; zero when none is set.
    pub fn risk_free_source(&self) -> Result<Box<dyn RiskFreeSource>> {
        match (&self.risk_free.table, self.risk_free.rate) {
            (Some(_), Some(_)) => Err(AgoraError::InvalidConfiguration(
                "[risk_free] set either rate or table, not both".to_string(),
            )),
            (Some(table), None) => Ok(Box::new(YieldTable::load(table, self.risk_free.percent)?)),
            (None, rate) => Ok(Box::new(ConstantRate(rate.unwrap_or(0.0)))),
        }
    }

    pub fn universe(&self) -> Result<Option<TickerUniverse>> {
        self.universe
            .path
            .as_ref()
            .map(TickerUniverse::load)
            .transpose()
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Agora Portfolio Optimization Configuration File

[portfolio]
tickers = ["AAPL", "MSFT", "GLD", "TLT"]
start = "01/01/2020"
end = "31/12/2020"
num_portfolios = 5000
# seed = 42
parallel = true

[data]
directory = "data"
# date_format = "%Y-%m-%d"
price_column = "adj_close"

[risk_free]
rate = 0.0
# table = "data/treasury.csv"
# percent = true

[universe]
# path = "data/tickers.csv"
"#
        .to_string()
    }
}
