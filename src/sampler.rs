//! Random full-investment weight vectors.
//!
//! Each weight is an independent uniform draw on `[0, 1)` divided by the sum
//! of all draws, so weights are non-negative and sum to one. Every trial gets
//! its own generator seeded from `(base_seed, trial_index)`, which keeps
//! results identical whether trials run sequentially or on a thread pool.

use crate::error::{AgoraError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Allowed deviation of a weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Non-negative allocation weights summing to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    /// Validate and wrap a weight vector.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(AgoraError::InvalidConfiguration(
                "weight vector must not be empty".to_string(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AgoraError::InvalidConfiguration(format!(
                "weights must be finite and non-negative: {:?}",
                weights
            )));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AgoraError::InvalidWeights { sum });
        }
        Ok(Self(weights))
    }

    /// All weight on instrument `k` of `n`.
    pub fn one_hot(n: usize, k: usize) -> Result<Self> {
        if k >= n {
            return Err(AgoraError::InvalidConfiguration(format!(
                "index {} out of range for {} instruments",
                k, n
            )));
        }
        let mut weights = vec![0.0; n];
        weights[k] = 1.0;
        Self::new(weights)
    }

    /// Equal weight on each of `n` instruments.
    pub fn equal(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(AgoraError::InvalidConfiguration(
                "cannot weight zero instruments".to_string(),
            ));
        }
        Self::new(vec![1.0 / n as f64; n])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }
}

impl Index<usize> for WeightVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Draw a random full-investment weight vector over `n` instruments.
pub fn sample_weights<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Result<WeightVector> {
    if n == 0 {
        return Err(AgoraError::InvalidConfiguration(
            "cannot sample weights for zero instruments".to_string(),
        ));
    }

    loop {
        let draws: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
        let total: f64 = draws.iter().sum();
        // all-zero draws cannot be normalized
        if total > 0.0 {
            return WeightVector::new(draws.into_iter().map(|d| d / total).collect());
        }
    }
}

/// Generator for one trial, independent of every other trial index.
pub fn trial_rng(base_seed: u64, trial: usize) -> StdRng {
    StdRng::seed_from_u64(mix_seed(base_seed, trial as u64))
}

/// SplitMix64 finalizer over the seed and trial index.
fn mix_seed(base_seed: u64, trial: u64) -> u64 {
    let mut z = base_seed ^ trial.wrapping_mul(0x9e3779b97f4a7c15);
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
