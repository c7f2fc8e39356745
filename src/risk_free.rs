//! Annual risk-free rate lookup for a date range.

use crate::data::parse_date;
use crate::error::{AgoraError, Result};
use crate::types::DateRange;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Supplies the annual risk-free rate used in the Sharpe ratio.
pub trait RiskFreeSource: Send + Sync {
    /// Annual rate, as a fraction, for `range`.
    fn rate(&self, range: &DateRange) -> Result<f64>;
}

/// The same rate for every range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRate(pub f64);

impl RiskFreeSource for ConstantRate {
    fn rate(&self, _range: &DateRange) -> Result<f64> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct YieldRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: String,
    #[serde(alias = "Rate", alias = "RATE", alias = "yield", alias = "Yield", alias = "value")]
    rate: f64,
}

/// Dated yield observations, averaged over the requested range.
#[derive(Debug, Clone, Default)]
pub struct YieldTable {
    observations: Vec<(NaiveDate, f64)>,
}

impl YieldTable {
    /// Build from `(date, annual rate as a fraction)` pairs.
    pub fn from_observations(mut observations: Vec<(NaiveDate, f64)>) -> Self {
        observations.sort_by_key(|(d, _)| *d);
        Self { observations }
    }

    /// Load a `date,rate` CSV. With `percent` set, rates like `1.5` mean 1.5%.
    pub fn load(path: impl AsRef<Path>, percent: bool) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading risk-free yields from: {}", path.display());

        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let scale = if percent { 0.01 } else { 1.0 };

        let mut observations = Vec::new();
        for result in reader.deserialize() {
            let row: YieldRow = result?;
            if !row.rate.is_finite() {
                debug!("Skipping non-finite yield on {}", row.date);
                continue;
            }
            observations.push((parse_date(&row.date, None)?, row.rate * scale));
        }

        Ok(Self::from_observations(observations))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl RiskFreeSource for YieldTable {
    fn rate(&self, range: &DateRange) -> Result<f64> {
        let inside: Vec<f64> = self
            .observations
            .iter()
            .filter(|(d, _)| range.contains(*d))
            .map(|(_, r)| *r)
            .collect();

        if inside.is_empty() {
            return Err(AgoraError::unavailable(
                "risk-free",
                format!("no yield observations between {}", range),
            ));
        }

        let rate = inside.iter().sum::<f64>() / inside.len() as f64;
        debug!("Risk-free rate {:.5} from {} observations", rate, inside.len());
        Ok(rate)
    }
}
