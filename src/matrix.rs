//! Date-aligned matrix of daily returns across instruments.
//!
//! Rows are the dates on which every instrument has a return (an inner join);
//! columns are instruments in the order given.

use crate::error::{AgoraError, Result};
use crate::instrument::Instrument;
use crate::returns::{mean, ReturnSeries, TRADING_DAYS};
use crate::risk::sample_covariance;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct ReturnMatrix {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    /// One column per instrument, each `dates.len()` long.
    columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Build a matrix from explicit columns.
    pub fn new(tickers: Vec<String>, dates: Vec<NaiveDate>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if tickers.is_empty() {
            return Err(AgoraError::InvalidConfiguration(
                "a return matrix needs at least one instrument".to_string(),
            ));
        }
        if tickers.len() != columns.len() {
            return Err(AgoraError::InvalidConfiguration(format!(
                "{} tickers but {} return columns",
                tickers.len(),
                columns.len()
            )));
        }
        if let Some((i, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != dates.len()) {
            return Err(AgoraError::InvalidConfiguration(format!(
                "column {} has {} returns for {} dates",
                tickers[i],
                col.len(),
                dates.len()
            )));
        }
        Ok(Self {
            tickers,
            dates,
            columns,
        })
    }

    /// Align the simple returns of every instrument on their common dates.
    pub fn from_instruments(instruments: &[Instrument]) -> Result<Self> {
        let series: Vec<(&str, &ReturnSeries)> = instruments
            .iter()
            .map(|i| (i.ticker(), i.returns()))
            .collect();
        Self::align(&series)
    }

    /// Inner-join return series on date.
    pub fn align(series: &[(&str, &ReturnSeries)]) -> Result<Self> {
        let Some((_, first)) = series.first() else {
            return Err(AgoraError::InvalidConfiguration(
                "a return matrix needs at least one instrument".to_string(),
            ));
        };

        let lookups: Vec<HashMap<NaiveDate, f64>> = series
            .iter()
            .map(|(_, s)| s.points().iter().map(|p| (p.date, p.value)).collect())
            .collect();

        let dates: Vec<NaiveDate> = first
            .points()
            .iter()
            .map(|p| p.date)
            .filter(|d| lookups.iter().all(|m| m.contains_key(d)))
            .collect();

        let columns: Vec<Vec<f64>> = lookups
            .iter()
            .map(|m| dates.iter().map(|d| m[d]).collect())
            .collect();

        let longest = series.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
        debug!(
            "Aligned {} series on {} common dates ({} in the longest series)",
            series.len(),
            dates.len(),
            longest
        );

        Self::new(
            series.iter().map(|(t, _)| t.to_string()).collect(),
            dates,
            columns,
        )
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn n_instruments(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    /// Sample covariance matrix of the daily columns.
    ///
    /// Fails with [`AgoraError::InsufficientData`] below two common dates.
    pub fn covariance(&self) -> Result<Vec<Vec<f64>>> {
        if self.n_rows() < 2 {
            return Err(AgoraError::insufficient(
                format!("return matrix over {}", self.tickers.join(", ")),
                2,
                self.n_rows(),
            ));
        }

        let n = self.n_instruments();
        let mut cov = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let c = sample_covariance(&self.columns[i], &self.columns[j]);
                cov[i][j] = c;
                cov[j][i] = c;
            }
        }
        Ok(cov)
    }

    /// Column means scaled by [`TRADING_DAYS`].
    pub fn expected_annual_returns(&self) -> Result<Vec<f64>> {
        self.columns
            .iter()
            .zip(&self.tickers)
            .map(|(col, ticker)| {
                mean(col)
                    .map(|m| m * TRADING_DAYS)
                    .ok_or_else(|| AgoraError::insufficient(format!("{} aligned returns", ticker), 1, 0))
            })
            .collect()
    }
}
