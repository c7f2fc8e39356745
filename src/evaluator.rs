//! Portfolio return, volatility and Sharpe ratio for a weight vector.

use crate::error::{AgoraError, Result};
use crate::instrument::Instrument;
use crate::matrix::ReturnMatrix;
use crate::returns::TRADING_DAYS;
use crate::sampler::WeightVector;
use serde::{Deserialize, Serialize};

/// Annual standard deviations at or below this are treated as zero.
pub const ZERO_STD_TOLERANCE: f64 = 1e-12;

/// Annualized statistics of one weighted portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub annual_return: f64,
    pub annual_std: f64,
    /// `None` when the portfolio has no variance and the ratio is undefined.
    pub sharpe_ratio: Option<f64>,
}

/// Evaluates weight vectors against fixed expected returns and a daily
/// covariance matrix.
///
/// The covariance is computed once at construction; [`evaluate`] is then a
/// pure `O(n^2)` function that can be called from many threads at once.
///
/// [`evaluate`]: PortfolioEvaluator::evaluate
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioEvaluator {
    expected_annual_returns: Vec<f64>,
    daily_covariance: Vec<Vec<f64>>,
}

impl PortfolioEvaluator {
    /// Pair per-instrument expected annual returns with the covariance of
    /// `matrix`. Both must cover the same instruments in the same order.
    pub fn new(expected_annual_returns: Vec<f64>, matrix: &ReturnMatrix) -> Result<Self> {
        if expected_annual_returns.len() != matrix.n_instruments() {
            return Err(AgoraError::InvalidConfiguration(format!(
                "{} expected returns for {} instruments",
                expected_annual_returns.len(),
                matrix.n_instruments()
            )));
        }
        Ok(Self {
            expected_annual_returns,
            daily_covariance: matrix.covariance()?,
        })
    }

    /// Use each instrument's own expected annual return.
    pub fn from_instruments(instruments: &[Instrument], matrix: &ReturnMatrix) -> Result<Self> {
        Self::new(
            instruments.iter().map(|i| i.expected_annual_return()).collect(),
            matrix,
        )
    }

    /// Use the annualized column means of `matrix` as expected returns.
    pub fn from_matrix(matrix: &ReturnMatrix) -> Result<Self> {
        Self::new(matrix.expected_annual_returns()?, matrix)
    }

    pub fn n_instruments(&self) -> usize {
        self.expected_annual_returns.len()
    }

    pub fn daily_covariance(&self) -> &[Vec<f64>] {
        &self.daily_covariance
    }

    /// Annual return, annual standard deviation and Sharpe ratio of `weights`.
    ///
    /// The standard deviation uses the full covariance:
    /// `sqrt(w' Σ w) * sqrt(252)`. The Sharpe ratio is `None` when that is
    /// zero, rather than an infinity that would win every max selection.
    pub fn evaluate(&self, weights: &WeightVector, risk_free_rate: f64) -> Result<PortfolioStats> {
        let n = self.n_instruments();
        if weights.len() != n {
            return Err(AgoraError::InvalidConfiguration(format!(
                "{} weights for {} instruments",
                weights.len(),
                n
            )));
        }
        let w = weights.as_slice();

        let annual_return: f64 = w
            .iter()
            .zip(&self.expected_annual_returns)
            .map(|(wi, ri)| wi * ri)
            .sum();

        let mut daily_variance = 0.0;
        for i in 0..n {
            for j in 0..n {
                daily_variance += w[i] * w[j] * self.daily_covariance[i][j];
            }
        }
        // rounding can push a zero variance slightly negative
        let annual_std = daily_variance.max(0.0).sqrt() * TRADING_DAYS.sqrt();

        let sharpe_ratio = (annual_std > ZERO_STD_TOLERANCE)
            .then(|| (annual_return - risk_free_rate) / annual_std);

        Ok(PortfolioStats {
            annual_return,
            annual_std,
            sharpe_ratio,
        })
    }
}

/// One-shot evaluation straight from a return matrix.
pub fn evaluate(
    matrix: &ReturnMatrix,
    expected_annual_returns: &[f64],
    weights: &WeightVector,
    risk_free_rate: f64,
) -> Result<PortfolioStats> {
    PortfolioEvaluator::new(expected_annual_returns.to_vec(), matrix)?.evaluate(weights, risk_free_rate)
}
