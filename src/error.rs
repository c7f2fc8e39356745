//! Error types for the statistics engine and optimizer.

use thiserror::Error;

/// Main error type for agora.
#[derive(Error, Debug)]
pub enum AgoraError {
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Insufficient data for {context}: need at least {required} observations, have {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No trial out of {trials} produced a defined Sharpe ratio")]
    DegenerateOptimization { trials: usize },

    #[error("Weights must sum to 1.0, got {sum}")]
    InvalidWeights { sum: f64 },

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl AgoraError {
    /// Shorthand for an `InsufficientData` error.
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        AgoraError::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }

    /// Shorthand for a `DataUnavailable` error.
    pub fn unavailable(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        AgoraError::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for agora operations.
pub type Result<T> = std::result::Result<T, AgoraError>;
