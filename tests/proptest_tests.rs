//! Property-based tests using proptest for invariant testing.
//!
//! These tests verify that:
//! 1. Simple returns match the closed form and drop undefined transitions
//! 2. Sampled weights are non-negative and fully invested
//! 3. Weight vectors off the unit sum are rejected
//! 4. Optimizer selections are extremal over the trial set

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use agora::error::AgoraError;
use agora::evaluator::PortfolioEvaluator;
use agora::matrix::ReturnMatrix;
use agora::optimizer::{select_extremes, MonteCarloOptimizer, OptimizerConfig, PortfolioTrial};
use agora::returns::compute_returns;
use agora::risk::compute_risk;
use agora::sampler::{sample_weights, trial_rng, WeightVector, WEIGHT_SUM_TOLERANCE};
use agora::types::PriceSeries;

fn date(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset as i64)
}

/// Strategy to generate a price series, occasionally touching zero.
fn price_series_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            9 => 0.5..500.0f64,
            1 => Just(0.0),
        ],
        2..60,
    )
}

/// Strategy to generate an aligned return matrix of `n` columns.
fn return_columns_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1..5usize, 3..40usize).prop_flat_map(|(n, rows)| {
        prop::collection::vec(prop::collection::vec(-0.05..0.05f64, rows), n)
    })
}

fn matrix_from(columns: Vec<Vec<f64>>) -> ReturnMatrix {
    let rows = columns[0].len();
    let tickers = (0..columns.len()).map(|i| format!("T{}", i)).collect();
    ReturnMatrix::new(tickers, (0..rows).map(date).collect(), columns).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // ========================================================================
    // Return Statistics
    // ========================================================================

    #[test]
    fn simple_returns_match_closed_form(prices in price_series_strategy()) {
        let series = PriceSeries::from_pairs(
            prices.iter().enumerate().map(|(i, &p)| (date(i), p))
        ).unwrap();

        let undefined = prices.windows(2).filter(|w| w[0] == 0.0).count();
        match compute_returns(&series) {
            Ok(stats) => {
                prop_assert_eq!(stats.simple.len(), prices.len() - 1 - undefined);

                let expected: Vec<f64> = prices
                    .windows(2)
                    .filter(|w| w[0] != 0.0)
                    .map(|w| (w[1] - w[0]) / w[0])
                    .collect();
                prop_assert_eq!(stats.simple.values(), expected);

                for r in stats.log.values() {
                    prop_assert!(r.is_finite());
                }
                prop_assert!(
                    (stats.expected_annual_return - stats.expected_daily_return * 252.0).abs() < 1e-12
                );
            }
            Err(AgoraError::InsufficientData { .. }) => {
                // every transition started from zero
                prop_assert_eq!(undefined, prices.len() - 1);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn risk_variance_is_squared_std(returns in prop::collection::vec(-0.1..0.1f64, 2..100)) {
        let stats = compute_risk(&returns).unwrap();
        prop_assert!(stats.daily_std >= 0.0);
        prop_assert!((stats.annual_std - stats.daily_std * 252f64.sqrt()).abs() < 1e-12);
        prop_assert!((stats.annual_var - stats.annual_std * stats.annual_std).abs() < 1e-12);
    }

    // ========================================================================
    // Weights
    // ========================================================================

    #[test]
    fn sampled_weights_are_fully_invested(seed in any::<u64>(), n in 1..20usize) {
        let mut rng = trial_rng(seed, 0);
        let w = sample_weights(&mut rng, n).unwrap();
        prop_assert_eq!(w.len(), n);
        for &x in w.iter() {
            prop_assert!((0.0..=1.0).contains(&x));
        }
        let sum: f64 = w.iter().sum();
        prop_assert!((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn off_unit_weight_sums_are_rejected(
        weights in prop::collection::vec(0.0..1.0f64, 1..8),
        scale in prop_oneof![0.5..0.99f64, 1.01..2.0f64],
    ) {
        let total: f64 = weights.iter().sum();
        prop_assume!(total > 1e-6);
        let scaled: Vec<f64> = weights.iter().map(|w| w / total * scale).collect();
        let is_invalid_weights = matches!(WeightVector::new(scaled), Err(AgoraError::InvalidWeights { .. }));
        prop_assert!(is_invalid_weights);
    }

    // ========================================================================
    // Evaluation and Selection
    // ========================================================================

    #[test]
    fn one_hot_std_matches_compute_risk(columns in return_columns_strategy()) {
        let n = columns.len();
        let matrix = matrix_from(columns.clone());
        let evaluator = PortfolioEvaluator::from_matrix(&matrix).unwrap();

        for (k, col) in columns.iter().enumerate() {
            let stats = evaluator.evaluate(&WeightVector::one_hot(n, k).unwrap(), 0.0).unwrap();
            prop_assert_eq!(stats.annual_std, compute_risk(col).unwrap().annual_std);
        }
    }

    #[test]
    fn optimizer_selections_are_extremal(columns in return_columns_strategy(), seed in any::<u64>()) {
        let matrix = matrix_from(columns);
        let evaluator = PortfolioEvaluator::from_matrix(&matrix).unwrap();
        let config = OptimizerConfig::default().with_portfolios(50).with_seed(seed);
        let optimizer = MonteCarloOptimizer::new(matrix.tickers().to_vec(), evaluator, config).unwrap();

        match optimizer.run() {
            Ok(result) => {
                let best = result.max_sharpe_trial.sharpe_ratio.unwrap();
                for t in &result.all_trials {
                    if let Some(s) = t.sharpe_ratio {
                        prop_assert!(best >= s);
                    }
                    prop_assert!(result.min_std_trial.annual_std <= t.annual_std);
                }
            }
            Err(AgoraError::DegenerateOptimization { trials }) => prop_assert_eq!(trials, 50),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn selection_breaks_ties_by_first_occurrence(
        stds in prop::collection::vec(prop_oneof![Just(0.1f64), Just(0.2f64), Just(0.3f64)], 1..30),
    ) {
        let trials: Vec<PortfolioTrial> = stds
            .iter()
            .enumerate()
            .map(|(index, &std)| PortfolioTrial {
                index,
                weights: WeightVector::one_hot(1, 0).unwrap(),
                annual_return: 0.1,
                annual_std: std,
                sharpe_ratio: Some(0.1 / std),
            })
            .collect();

        let (max_idx, min_idx) = select_extremes(&trials).unwrap();
        let min_std = stds.iter().cloned().fold(f64::INFINITY, f64::min);
        let first_min = stds.iter().position(|&s| s == min_std).unwrap();
        prop_assert_eq!(min_idx, first_min);
        prop_assert_eq!(max_idx, first_min);
    }
}

#[test]
fn verify_sampler_slot_means_converge() {
    let n = 5;
    let draws = 100_000;
    let mut sums = vec![0.0; n];
    for i in 0..draws {
        let w = sample_weights(&mut trial_rng(99, i), n).unwrap();
        for (acc, x) in sums.iter_mut().zip(w.iter()) {
            *acc += x;
        }
    }
    for s in sums {
        assert!((s / draws as f64 - 1.0 / n as f64).abs() < 0.01);
    }
}
