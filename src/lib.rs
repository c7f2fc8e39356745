//! Agora - Monte Carlo portfolio optimization over historical prices.
//!
//! # Overview
//!
//! Agora builds per-instrument return and risk statistics from daily prices,
//! then searches the space of long-only, fully invested portfolios by random
//! sampling:
//!
//! - **Return statistics**: simple and log returns, expected daily, total and
//!   annual return, plus APR/APY reporting fields
//! - **Risk statistics**: sample standard deviation and variance at daily,
//!   total and annual scale
//! - **Portfolio evaluation**: annual return, full-covariance annual
//!   volatility and a zero-variance guarded Sharpe ratio
//! - **Monte Carlo search**: reproducible, parallel sampling that reports the
//!   max-Sharpe and min-volatility portfolios along with every trial
//! - **Configuration files**: TOML-based setups for reproducible runs
//!
//! # Quick Start
//!
//! ```no_run
//! use agora::{
//!     data::CsvPriceProvider,
//!     instrument::load_instruments,
//!     optimizer::{MonteCarloOptimizer, OptimizerConfig},
//!     types::DateRange,
//! };
//!
//! let provider = CsvPriceProvider::new("data");
//! let range = DateRange::parse("01/01/2020", "31/12/2020").unwrap();
//! let tickers = vec!["AAPL".to_string(), "GLD".to_string(), "TLT".to_string()];
//! let instruments = load_instruments(&provider, &tickers, range).unwrap();
//!
//! let config = OptimizerConfig::default()
//!     .with_portfolios(5000)
//!     .with_risk_free_rate(0.01)
//!     .with_seed(42);
//! let result = MonteCarloOptimizer::from_instruments(&instruments, config)
//!     .unwrap()
//!     .run()
//!     .unwrap();
//!
//! println!("{}", result.summary());
//! ```
//!
//! # Modules
//!
//! - [`types`]: Dates, price series and dated returns
//! - [`returns`]: Return statistics of a price series
//! - [`risk`]: Sample volatility statistics
//! - [`instrument`]: Ticker with prices and derived statistics
//! - [`matrix`]: Date-aligned return matrix and covariance
//! - [`sampler`]: Random weight vectors
//! - [`evaluator`]: Portfolio return, volatility and Sharpe ratio
//! - [`optimizer`]: Monte Carlo search and selection
//! - [`data`]: Price providers
//! - [`risk_free`]: Risk-free rate sources
//! - [`universe`]: Stock classification of tickers
//! - [`config`]: TOML configuration file support
//! - [`report`]: Text, JSON and CSV reporting

pub mod config;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod instrument;
pub mod matrix;
pub mod optimizer;
pub mod report;
pub mod returns;
pub mod risk;
pub mod risk_free;
pub mod sampler;
pub mod types;
pub mod universe;

// Re-exports for convenience
pub use config::OptimizationFileConfig;
pub use data::{CsvPriceProvider, InMemoryPriceProvider, PriceProvider};
pub use error::{AgoraError, Result};
pub use evaluator::{PortfolioEvaluator, PortfolioStats};
pub use instrument::{load_instruments, Instrument};
pub use matrix::ReturnMatrix;
pub use optimizer::{
    select_extremes, MonteCarloOptimizer, OptimizationResult, OptimizerConfig, PortfolioTrial,
};
pub use report::ResultFormatter;
pub use returns::{compute_returns, ReturnSeries, ReturnStatistics, TRADING_DAYS};
pub use risk::{compute_risk, RiskStatistics};
pub use risk_free::{ConstantRate, RiskFreeSource, YieldTable};
pub use sampler::{sample_weights, WeightVector};
pub use types::{DateRange, PricePoint, PriceSeries, ReturnPoint, DATE_FORMAT};
pub use universe::TickerUniverse;
