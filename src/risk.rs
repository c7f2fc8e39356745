//! Risk statistics: standard deviation and variance of a return series.

use crate::error::{AgoraError, Result};
use crate::returns::TRADING_DAYS;
use serde::{Deserialize, Serialize};

/// Dispersion of an instrument's daily returns at three horizons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskStatistics {
    /// Sample standard deviation of the daily returns.
    pub daily_std: f64,
    /// `daily_std * sqrt(n)` over the whole series.
    pub total_std: f64,
    /// `daily_std * sqrt(252)`.
    pub annual_std: f64,
    pub daily_var: f64,
    pub total_var: f64,
    pub annual_var: f64,
}

/// Sample covariance with the `n - 1` denominator.
///
/// Both slices must have the same length of at least two. Called with the
/// same slice twice it yields the sample variance, so a covariance matrix
/// diagonal matches [`compute_risk`] exactly.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Compute risk statistics for a series of daily returns.
///
/// Fails with [`AgoraError::InsufficientData`] for fewer than two returns,
/// where the sample standard deviation is undefined.
pub fn compute_risk(returns: &[f64]) -> Result<RiskStatistics> {
    if returns.len() < 2 {
        return Err(AgoraError::insufficient("return series", 2, returns.len()));
    }

    let daily_std = sample_covariance(returns, returns).sqrt();
    let total_std = daily_std * (returns.len() as f64).sqrt();
    let annual_std = daily_std * TRADING_DAYS.sqrt();

    Ok(RiskStatistics {
        daily_std,
        total_std,
        annual_std,
        daily_var: daily_std.powi(2),
        total_var: total_std.powi(2),
        annual_var: annual_std.powi(2),
    })
}
