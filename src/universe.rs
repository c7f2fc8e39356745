//! Ticker universe used to classify instruments in reports.

use crate::error::Result;
use crate::sampler::WeightVector;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct UniverseRow {
    #[serde(rename = "Symbol", alias = "symbol", alias = "ticker")]
    symbol: String,
    #[serde(rename = "IPOyear", alias = "ipo_year", default)]
    ipo_year: Option<String>,
}

/// Set of tickers known to be stocks.
#[derive(Debug, Clone, Default)]
pub struct TickerUniverse {
    stocks: HashSet<String>,
}

impl TickerUniverse {
    pub fn new<I, S>(stocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stocks: stocks.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a listing CSV with `Symbol` and `IPOyear` columns.
    ///
    /// Rows with an empty or `n/a` IPO year are not counted as stocks.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut stocks = HashSet::new();
        for result in reader.deserialize() {
            let row: UniverseRow = result?;
            let listed = row
                .ipo_year
                .as_deref()
                .map(str::trim)
                .is_some_and(|y| !y.is_empty() && !y.eq_ignore_ascii_case("n/a"));
            if listed {
                stocks.insert(row.symbol.trim().to_string());
            }
        }

        info!("Loaded {} stock tickers from {}", stocks.len(), path.display());
        Ok(Self { stocks })
    }

    pub fn is_stock(&self, ticker: &str) -> bool {
        self.stocks.contains(ticker)
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    /// Share of `weights` allocated to stocks; `tickers` gives the weight order.
    pub fn stock_weight(&self, tickers: &[String], weights: &WeightVector) -> f64 {
        tickers
            .iter()
            .zip(weights.iter())
            .filter(|(t, _)| self.is_stock(t))
            .map(|(_, w)| w)
            .sum()
    }
}
