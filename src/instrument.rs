//! A tradable instrument with its price history and derived statistics.

use crate::data::PriceProvider;
use crate::error::{AgoraError, Result};
use crate::returns::{compute_returns, ReturnSeries, ReturnStatistics};
use crate::risk::{compute_risk, RiskStatistics};
use crate::types::{DateRange, PriceSeries};
use serde::Serialize;
use tracing::{debug, info};

/// One ticker's price history and its return/risk statistics.
///
/// Statistics are computed once at construction and never change.
#[derive(Debug, Clone, Serialize)]
pub struct Instrument {
    ticker: String,
    date_range: DateRange,
    prices: PriceSeries,
    return_statistics: ReturnStatistics,
    risk_statistics: RiskStatistics,
}

impl Instrument {
    /// Build an instrument from an already fetched price series.
    pub fn new(ticker: impl Into<String>, date_range: DateRange, prices: PriceSeries) -> Result<Self> {
        let ticker = ticker.into();

        let return_statistics = compute_returns(&prices).map_err(|e| tag_ticker(e, &ticker))?;
        let risk_statistics =
            compute_risk(&return_statistics.simple.values()).map_err(|e| tag_ticker(e, &ticker))?;

        debug!(
            "{}: {} prices, expected annual return {:.4}, annual std {:.4}",
            ticker,
            prices.len(),
            return_statistics.expected_annual_return,
            risk_statistics.annual_std
        );

        Ok(Self {
            ticker,
            date_range,
            prices,
            return_statistics,
            risk_statistics,
        })
    }

    /// Fetch prices for `ticker` from `provider` and build the instrument.
    pub fn fetch(provider: &dyn PriceProvider, ticker: &str, date_range: DateRange) -> Result<Self> {
        let prices = provider.fetch(ticker, &date_range)?;
        Self::new(ticker, date_range, prices)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    /// Number of price observations.
    pub fn n_trading_dates(&self) -> usize {
        self.prices.len()
    }

    /// Simple daily returns.
    pub fn returns(&self) -> &ReturnSeries {
        &self.return_statistics.simple
    }

    pub fn log_returns(&self) -> &ReturnSeries {
        &self.return_statistics.log
    }

    pub fn expected_annual_return(&self) -> f64 {
        self.return_statistics.expected_annual_return
    }

    pub fn annual_std(&self) -> f64 {
        self.risk_statistics.annual_std
    }

    pub fn return_statistics(&self) -> &ReturnStatistics {
        &self.return_statistics
    }

    pub fn risk_statistics(&self) -> &RiskStatistics {
        &self.risk_statistics
    }
}

/// Build one instrument per ticker, failing on the first bad ticker.
pub fn load_instruments(
    provider: &dyn PriceProvider,
    tickers: &[String],
    date_range: DateRange,
) -> Result<Vec<Instrument>> {
    info!("Loading {} instruments for {}", tickers.len(), date_range);
    tickers
        .iter()
        .map(|ticker| Instrument::fetch(provider, ticker, date_range))
        .collect()
}

fn tag_ticker(err: AgoraError, ticker: &str) -> AgoraError {
    match err {
        AgoraError::InsufficientData {
            context,
            required,
            available,
        } => AgoraError::InsufficientData {
            context: format!("{} {}", ticker, context),
            required,
            available,
        },
        other => other,
    }
}
