//! Return statistics derived from a price series.
//!
//! Simple returns `(P_t - P_{t-1}) / P_{t-1}` and log returns
//! `ln(P_t) - ln(P_{t-1})` are computed per transition. Transitions where a
//! return is undefined are dropped rather than propagated:
//!
//! - simple return: previous price is zero
//! - log return: either price is zero or negative
//!
//! Annualization multiplies the mean daily return by [`TRADING_DAYS`]. This is
//! a linear approximation, not a compounding model.

use crate::error::{AgoraError, Result};
use crate::types::{PriceSeries, ReturnPoint};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assumed trading days per year.
pub const TRADING_DAYS: f64 = 252.0;

/// Ordered sequence of dated per-period returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Return-side statistics of a single instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStatistics {
    /// Simple daily returns.
    pub simple: ReturnSeries,
    /// Logarithmic daily returns.
    pub log: ReturnSeries,
    /// Arithmetic mean of the simple returns.
    pub expected_daily_return: f64,
    /// Mean daily return scaled by the number of returns in the series.
    pub expected_total_return: f64,
    /// Mean daily return scaled by [`TRADING_DAYS`].
    pub expected_annual_return: f64,
    /// Plain sum of the simple returns.
    pub cumulative_return: f64,
    /// Mean over calendar years of the per-year sum of simple returns.
    /// Reporting only.
    pub apr: Option<f64>,
    /// `(1 + cumulative_return)^(252 / n) - 1`. Reporting only.
    pub apy: Option<f64>,
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Simple returns, skipping transitions from a zero price.
pub fn simple_returns(prices: &PriceSeries) -> ReturnSeries {
    let points = prices
        .points()
        .windows(2)
        .filter(|w| w[0].price != 0.0)
        .map(|w| ReturnPoint {
            date: w[1].date,
            value: (w[1].price - w[0].price) / w[0].price,
        })
        .collect();
    ReturnSeries::new(points)
}

/// Log returns, skipping transitions that touch a non-positive price.
pub fn log_returns(prices: &PriceSeries) -> ReturnSeries {
    let points = prices
        .points()
        .windows(2)
        .filter(|w| w[0].price > 0.0 && w[1].price > 0.0)
        .map(|w| ReturnPoint {
            date: w[1].date,
            value: w[1].price.ln() - w[0].price.ln(),
        })
        .collect();
    ReturnSeries::new(points)
}

/// Compute every return statistic for a price series.
///
/// Fails with [`AgoraError::InsufficientData`] when fewer than two prices are
/// given, or when every transition was undefined.
pub fn compute_returns(prices: &PriceSeries) -> Result<ReturnStatistics> {
    if prices.len() < 2 {
        return Err(AgoraError::insufficient("price series", 2, prices.len()));
    }

    let simple = simple_returns(prices);
    let log = log_returns(prices);
    let values = simple.values();

    let expected_daily_return =
        mean(&values).ok_or_else(|| AgoraError::insufficient("simple returns", 1, 0))?;
    let n = values.len() as f64;
    let cumulative_return: f64 = values.iter().sum();

    Ok(ReturnStatistics {
        expected_daily_return,
        expected_total_return: expected_daily_return * n,
        expected_annual_return: expected_daily_return * TRADING_DAYS,
        cumulative_return,
        apr: annual_percentage_rate(&simple),
        apy: annual_percentage_yield(cumulative_return, values.len()),
        simple,
        log,
    })
}

fn annual_percentage_rate(returns: &ReturnSeries) -> Option<f64> {
    let mut per_year: BTreeMap<i32, f64> = BTreeMap::new();
    for p in returns.points() {
        *per_year.entry(p.date.year()).or_insert(0.0) += p.value;
    }
    let sums: Vec<f64> = per_year.into_values().collect();
    mean(&sums)
}

fn annual_percentage_yield(cumulative_return: f64, n: usize) -> Option<f64> {
    if n == 0 {
        return None;
    }
    let apy = (1.0 + cumulative_return).powf(TRADING_DAYS / n as f64) - 1.0;
    apy.is_finite().then_some(apy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;

    fn series(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PricePoint::new(start + chrono::Duration::days(i as i64), p))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_simple_and_log_returns() {
        let stats = compute_returns(&series(&[100.0, 110.0, 99.0])).unwrap();

        let simple = stats.simple.values();
        assert_eq!(simple.len(), 2);
        assert!((simple[0] - 0.1).abs() < 1e-12);
        assert!((simple[1] - (-0.1)).abs() < 1e-12);

        let log = stats.log.values();
        assert!((log[0] - (110.0f64 / 100.0).ln()).abs() < 1e-12);
        assert!((log[1] - (99.0f64 / 110.0).ln()).abs() < 1e-12);

        assert!(stats.expected_daily_return.abs() < 1e-12);
        assert_eq!(stats.simple.dates()[0], NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
    }

    #[test]
    fn test_annualization() {
        let stats = compute_returns(&series(&[100.0, 101.0, 102.01])).unwrap();
        assert!((stats.expected_daily_return - 0.01).abs() < 1e-12);
        assert!((stats.expected_annual_return - 2.52).abs() < 1e-10);
        assert!((stats.expected_total_return - 0.02).abs() < 1e-12);
        assert!((stats.cumulative_return - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_zero_price_transitions_dropped() {
        let stats = compute_returns(&series(&[100.0, 0.0, 50.0, 55.0])).unwrap();
        // 0 -> 50 has no simple return; 100 -> 0 and 0 -> 50 have no log return
        assert_eq!(stats.simple.len(), 2);
        assert_eq!(stats.log.len(), 1);
        assert!((stats.simple.values()[0] - (-1.0)).abs() < 1e-12);
        assert!(stats.simple.values().iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_insufficient_prices() {
        assert!(matches!(
            compute_returns(&series(&[100.0])),
            Err(AgoraError::InsufficientData { required: 2, available: 1, .. })
        ));
        assert!(compute_returns(&series(&[])).is_err());
        assert!(compute_returns(&series(&[0.0, 5.0])).is_err());
    }

    #[test]
    fn test_apr_groups_by_calendar_year() {
        let prices = PriceSeries::from_pairs([
            (NaiveDate::from_ymd_opt(2019, 12, 30).unwrap(), 100.0),
            (NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(), 110.0),
            (NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(), 121.0),
            (NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(), 133.1),
        ])
        .unwrap();
        let stats = compute_returns(&prices).unwrap();
        // 2019: 0.1, 2020: 0.1 + 0.1
        assert!((stats.apr.unwrap() - 0.15).abs() < 1e-12);
        let expected_apy = (1.3f64).powf(252.0 / 3.0) - 1.0;
        assert!((stats.apy.unwrap() - expected_apy).abs() / expected_apy < 1e-9);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
