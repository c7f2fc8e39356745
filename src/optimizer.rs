//! Monte Carlo search for efficient portfolios.
//!
//! The optimizer draws `num_portfolios` random full-investment weight vectors,
//! evaluates each one, and then picks two portfolios from the trial set:
//!
//! - **Max Sharpe**: highest Sharpe ratio among trials where it is defined
//! - **Min std**: lowest annual standard deviation
//!
//! Ties go to the earliest trial. Trials are independent, so they run on the
//! rayon thread pool by default; each trial seeds its own generator from the
//! base seed and its index, making a seeded run reproducible regardless of
//! scheduling.
//!
//! # Example
//!
//! ```ignore
//! use agora::optimizer::{MonteCarloOptimizer, OptimizerConfig};
//!
//! let config = OptimizerConfig::default()
//!     .with_portfolios(5000)
//!     .with_risk_free_rate(0.02)
//!     .with_seed(42);
//! let result = MonteCarloOptimizer::from_instruments(&instruments, config)?.run()?;
//! println!("{}", result.summary());
//! ```

use crate::error::{AgoraError, Result};
use crate::evaluator::PortfolioEvaluator;
use crate::instrument::Instrument;
use crate::matrix::ReturnMatrix;
use crate::sampler::{sample_weights, trial_rng, WeightVector};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the Monte Carlo search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Number of random portfolios to evaluate.
    pub num_portfolios: usize,
    /// Annual risk-free rate subtracted in the Sharpe ratio.
    pub risk_free_rate: f64,
    /// Random seed for reproducibility (None for random).
    pub seed: Option<u64>,
    /// Evaluate trials on the rayon thread pool.
    pub parallel: bool,
    /// Show a terminal progress bar while sampling.
    pub show_progress: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            num_portfolios: 5000,
            risk_free_rate: 0.0,
            seed: None,
            parallel: true,
            show_progress: false,
        }
    }
}

impl OptimizerConfig {
    /// Set number of portfolios.
    pub fn with_portfolios(mut self, n: usize) -> Self {
        self.num_portfolios = n;
        self
    }

    /// Set the annual risk-free rate.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run trials on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// One sampled portfolio and its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTrial {
    /// Position of the trial in the sampling order.
    pub index: usize,
    pub weights: WeightVector,
    pub annual_return: f64,
    pub annual_std: f64,
    pub sharpe_ratio: Option<f64>,
}

/// The two selected portfolios plus every trial they were chosen from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Instrument tickers, in weight order.
    pub tickers: Vec<String>,
    pub risk_free_rate: f64,
    pub max_sharpe_trial: PortfolioTrial,
    pub min_std_trial: PortfolioTrial,
    pub all_trials: Vec<PortfolioTrial>,
}

impl OptimizationResult {
    /// Number of trials with an undefined Sharpe ratio.
    pub fn degenerate_trials(&self) -> usize {
        self.all_trials
            .iter()
            .filter(|t| t.sharpe_ratio.is_none())
            .count()
    }

    /// Generate summary report.
    pub fn summary(&self) -> String {
        let weights = |trial: &PortfolioTrial| {
            self.tickers
                .iter()
                .zip(trial.weights.iter())
                .map(|(t, w)| format!("{}={:.2}%", t, w * 100.0))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sharpe = |trial: &PortfolioTrial| {
            trial
                .sharpe_ratio
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "n/a".to_string())
        };

        format!(
            r#"Monte Carlo Portfolio Optimization
==================================
Portfolios: {}
Instruments: {}
Risk-free rate: {:.3}%

Max Sharpe Ratio Portfolio (trial {}):
  Annual Return: {:.3}%
  Annual Std: {:.3}
  Sharpe Ratio: {}
  Weights: {}

Min Standard Deviation Portfolio (trial {}):
  Annual Return: {:.3}%
  Annual Std: {:.3}
  Sharpe Ratio: {}
  Weights: {}"#,
            self.all_trials.len(),
            self.tickers.join(", "),
            self.risk_free_rate * 100.0,
            self.max_sharpe_trial.index,
            self.max_sharpe_trial.annual_return * 100.0,
            self.max_sharpe_trial.annual_std,
            sharpe(&self.max_sharpe_trial),
            weights(&self.max_sharpe_trial),
            self.min_std_trial.index,
            self.min_std_trial.annual_return * 100.0,
            self.min_std_trial.annual_std,
            sharpe(&self.min_std_trial),
            weights(&self.min_std_trial),
        )
    }
}

/// Drives the sampling and selection phases over one instrument set.
///
/// [`run`](MonteCarloOptimizer::run) consumes the optimizer; a different
/// instrument set needs a new one.
pub struct MonteCarloOptimizer {
    tickers: Vec<String>,
    evaluator: PortfolioEvaluator,
    config: OptimizerConfig,
    stop: Option<Arc<AtomicBool>>,
}

impl MonteCarloOptimizer {
    /// Create an optimizer over a prepared evaluator.
    ///
    /// Fails with [`AgoraError::InvalidConfiguration`] for zero portfolios,
    /// zero instruments, or a ticker count that does not match the evaluator.
    pub fn new(
        tickers: Vec<String>,
        evaluator: PortfolioEvaluator,
        config: OptimizerConfig,
    ) -> Result<Self> {
        if config.num_portfolios == 0 {
            return Err(AgoraError::InvalidConfiguration(
                "number of portfolios must be positive".to_string(),
            ));
        }
        if tickers.is_empty() {
            return Err(AgoraError::InvalidConfiguration(
                "at least one instrument is required".to_string(),
            ));
        }
        if tickers.len() != evaluator.n_instruments() {
            return Err(AgoraError::InvalidConfiguration(format!(
                "{} tickers for an evaluator over {} instruments",
                tickers.len(),
                evaluator.n_instruments()
            )));
        }
        Ok(Self {
            tickers,
            evaluator,
            config,
            stop: None,
        })
    }

    /// Align the instruments' returns and build the evaluator from them.
    pub fn from_instruments(instruments: &[Instrument], config: OptimizerConfig) -> Result<Self> {
        if config.num_portfolios == 0 {
            return Err(AgoraError::InvalidConfiguration(
                "number of portfolios must be positive".to_string(),
            ));
        }
        let matrix = ReturnMatrix::from_instruments(instruments)?;
        let evaluator = PortfolioEvaluator::from_instruments(instruments, &matrix)?;
        Self::new(matrix.tickers().to_vec(), evaluator, config)
    }

    /// Stop sampling once `flag` is raised; trials already finished are kept.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Sample, evaluate and select.
    pub fn run(self) -> Result<OptimizationResult> {
        let trials = self.sample()?;

        let requested = self.config.num_portfolios;
        if trials.len() < requested {
            warn!(
                "Sampling stopped early: {} of {} portfolios evaluated",
                trials.len(),
                requested
            );
        }

        let (max_idx, min_idx) = select_extremes(&trials)?;
        let result = OptimizationResult {
            tickers: self.tickers,
            risk_free_rate: self.config.risk_free_rate,
            max_sharpe_trial: trials[max_idx].clone(),
            min_std_trial: trials[min_idx].clone(),
            all_trials: trials,
        };

        let degenerate = result.degenerate_trials();
        if degenerate > 0 {
            debug!("{} trials had zero variance and no Sharpe ratio", degenerate);
        }
        info!(
            "Max Sharpe trial {} (sharpe {:.3}), min std trial {} (std {:.4})",
            result.max_sharpe_trial.index,
            result.max_sharpe_trial.sharpe_ratio.unwrap_or(f64::NAN),
            result.min_std_trial.index,
            result.min_std_trial.annual_std
        );

        Ok(result)
    }

    fn sample(&self) -> Result<Vec<PortfolioTrial>> {
        let p = self.config.num_portfolios;
        let n = self.tickers.len();
        let rf = self.config.risk_free_rate;
        let base_seed = self.config.seed.unwrap_or_else(|| rand::thread_rng().gen());

        info!(
            "Sampling {} portfolios over {} instruments ({})",
            p,
            n,
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(p as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        let run_trial = |index: usize| -> Result<Option<PortfolioTrial>> {
            if self.stop.as_ref().is_some_and(|s| s.load(Ordering::Relaxed)) {
                return Ok(None);
            }
            let mut rng = trial_rng(base_seed, index);
            let weights = sample_weights(&mut rng, n)?;
            let stats = self.evaluator.evaluate(&weights, rf)?;
            if let Some(pb) = &progress {
                pb.inc(1);
            }
            Ok(Some(PortfolioTrial {
                index,
                weights,
                annual_return: stats.annual_return,
                annual_std: stats.annual_std,
                sharpe_ratio: stats.sharpe_ratio,
            }))
        };

        // one slot per trial index keeps the order stable across threads
        let slots: Vec<Option<PortfolioTrial>> = if self.config.parallel {
            (0..p).into_par_iter().map(run_trial).collect::<Result<_>>()?
        } else {
            (0..p).map(run_trial).collect::<Result<_>>()?
        };

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Indices of the max-Sharpe and min-std trials, first occurrence on ties.
///
/// Trials without a Sharpe ratio are skipped for the max-Sharpe pick but
/// still compete on standard deviation. Fails with
/// [`AgoraError::DegenerateOptimization`] when no trial has a Sharpe ratio.
pub fn select_extremes(trials: &[PortfolioTrial]) -> Result<(usize, usize)> {
    let mut max_sharpe: Option<(usize, f64)> = None;
    let mut min_std: Option<(usize, f64)> = None;

    for (i, trial) in trials.iter().enumerate() {
        if let Some(s) = trial.sharpe_ratio.filter(|s| !s.is_nan()) {
            if max_sharpe.map_or(true, |(_, best)| s > best) {
                max_sharpe = Some((i, s));
            }
        }
        let std = trial.annual_std;
        if !std.is_nan() && min_std.map_or(true, |(_, best)| std < best) {
            min_std = Some((i, std));
        }
    }

    match (max_sharpe, min_std) {
        (Some((max_idx, _)), Some((min_idx, _))) => Ok((max_idx, min_idx)),
        _ => Err(AgoraError::DegenerateOptimization {
            trials: trials.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn matrix(columns: Vec<Vec<f64>>) -> ReturnMatrix {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let rows = columns[0].len();
        let tickers = (0..columns.len()).map(|i| format!("T{}", i)).collect();
        ReturnMatrix::new(
            tickers,
            (0..rows as i64).map(|i| start + chrono::Duration::days(i)).collect(),
            columns,
        )
        .unwrap()
    }

    fn three_assets() -> ReturnMatrix {
        matrix(vec![
            vec![0.010, -0.004, 0.012, 0.003, -0.006, 0.008],
            vec![0.002, 0.001, -0.001, 0.003, 0.000, 0.002],
            vec![-0.015, 0.020, -0.010, 0.025, -0.005, 0.012],
        ])
    }

    fn optimizer(m: &ReturnMatrix, config: OptimizerConfig) -> MonteCarloOptimizer {
        let evaluator = PortfolioEvaluator::from_matrix(m).unwrap();
        MonteCarloOptimizer::new(m.tickers().to_vec(), evaluator, config).unwrap()
    }

    fn trial(index: usize, std: f64, sharpe: Option<f64>) -> PortfolioTrial {
        PortfolioTrial {
            index,
            weights: WeightVector::one_hot(1, 0).unwrap(),
            annual_return: 0.1,
            annual_std: std,
            sharpe_ratio: sharpe,
        }
    }

    #[test]
    fn test_optimizer_config() {
        let config = OptimizerConfig::default();
        assert_eq!(config.num_portfolios, 5000);
        assert!(config.parallel);
        assert!(config.seed.is_none());

        let config = config.with_portfolios(10).with_seed(3).sequential();
        assert_eq!(config.num_portfolios, 10);
        assert_eq!(config.seed, Some(3));
        assert!(!config.parallel);
    }

    #[test]
    fn test_selected_trials_are_extremal() {
        let m = three_assets();
        let config = OptimizerConfig::default().with_portfolios(500).with_seed(42);
        let result = optimizer(&m, config).run().unwrap();

        assert_eq!(result.all_trials.len(), 500);
        let best = result.max_sharpe_trial.sharpe_ratio.unwrap();
        for t in &result.all_trials {
            assert!(best >= t.sharpe_ratio.unwrap());
            assert!(result.min_std_trial.annual_std <= t.annual_std);
        }
        assert_eq!(result.all_trials[result.max_sharpe_trial.index], result.max_sharpe_trial);
        assert_eq!(result.all_trials[result.min_std_trial.index], result.min_std_trial);
    }

    #[test]
    fn test_parallel_matches_sequential_with_seed() {
        let m = three_assets();
        let config = OptimizerConfig::default().with_portfolios(200).with_seed(7);

        let par = optimizer(&m, config.clone()).run().unwrap();
        let seq = optimizer(&m, config.sequential()).run().unwrap();

        assert_eq!(par.all_trials, seq.all_trials);
        assert_eq!(par.max_sharpe_trial, seq.max_sharpe_trial);
        assert_eq!(par.min_std_trial, seq.min_std_trial);
    }

    #[test]
    fn test_trials_are_in_index_order() {
        let m = three_assets();
        let result = optimizer(&m, OptimizerConfig::default().with_portfolios(64).with_seed(1))
            .run()
            .unwrap();
        for (i, t) in result.all_trials.iter().enumerate() {
            assert_eq!(t.index, i);
        }
    }

    #[test]
    fn test_zero_portfolios_rejected() {
        let m = three_assets();
        let evaluator = PortfolioEvaluator::from_matrix(&m).unwrap();
        let err = MonteCarloOptimizer::new(
            m.tickers().to_vec(),
            evaluator,
            OptimizerConfig::default().with_portfolios(0),
        );
        assert!(matches!(err, Err(AgoraError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_ticker_count_must_match() {
        let m = three_assets();
        let evaluator = PortfolioEvaluator::from_matrix(&m).unwrap();
        let err = MonteCarloOptimizer::new(vec!["X".into()], evaluator, OptimizerConfig::default());
        assert!(matches!(err, Err(AgoraError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_all_flat_instruments_are_degenerate() {
        let m = matrix(vec![vec![0.25, 0.25, 0.25], vec![0.5, 0.5, 0.5]]);
        let err = optimizer(&m, OptimizerConfig::default().with_portfolios(20).with_seed(1)).run();
        assert!(matches!(err, Err(AgoraError::DegenerateOptimization { trials: 20 })));
    }

    #[test]
    fn test_stop_flag_raised_before_run() {
        let m = three_assets();
        let flag = Arc::new(AtomicBool::new(true));
        let err = optimizer(&m, OptimizerConfig::default().with_portfolios(50))
            .with_stop_flag(flag)
            .run();
        assert!(matches!(err, Err(AgoraError::DegenerateOptimization { trials: 0 })));
    }

    #[test]
    fn test_select_first_occurrence_on_ties() {
        let trials = vec![
            trial(0, 0.3, Some(1.0)),
            trial(1, 0.2, Some(2.0)),
            trial(2, 0.2, Some(2.0)),
            trial(3, 0.4, Some(1.5)),
        ];
        assert_eq!(select_extremes(&trials).unwrap(), (1, 1));
    }

    #[test]
    fn test_select_skips_undefined_sharpe() {
        let trials = vec![
            trial(0, 0.0, None),
            trial(1, 0.2, Some(-0.5)),
            trial(2, 0.1, Some(-1.0)),
        ];
        // the zero-variance trial still wins on std
        assert_eq!(select_extremes(&trials).unwrap(), (1, 0));

        let none = vec![trial(0, 0.0, None), trial(1, 0.0, None)];
        assert!(matches!(
            select_extremes(&none),
            Err(AgoraError::DegenerateOptimization { trials: 2 })
        ));
        assert!(select_extremes(&[]).is_err());
    }

    #[test]
    fn test_summary_report() {
        let m = three_assets();
        let result = optimizer(&m, OptimizerConfig::default().with_portfolios(50).with_seed(9))
            .run()
            .unwrap();
        let summary = result.summary();
        assert!(summary.contains("Max Sharpe Ratio Portfolio"));
        assert!(summary.contains("Min Standard Deviation Portfolio"));
        assert!(summary.contains("T2="));
        assert_eq!(result.degenerate_trials(), 0);
    }
}
