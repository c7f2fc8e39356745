//! Price data providers.
//!
//! The core never fetches prices itself; it asks a [`PriceProvider`] for the
//! series of one ticker over a date range. Providers guarantee ascending,
//! duplicate-free dates.

use crate::error::{AgoraError, Result};
use crate::types::{DateRange, PricePoint, PriceSeries};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Source of historical prices.
pub trait PriceProvider: Send + Sync {
    /// Fetch the price series of `ticker` inside `range`.
    ///
    /// Fails with [`AgoraError::DataUnavailable`] for unknown tickers or when
    /// the source cannot be read.
    fn fetch(&self, ticker: &str, range: &DateRange) -> Result<PriceSeries>;
}

/// Raw CSV row with flexible column naming.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "DATE",
        alias = "Timestamp",
        alias = "timestamp",
        alias = "datetime",
        alias = "Datetime"
    )]
    date: String,
    #[serde(alias = "Close", alias = "close", alias = "c", default)]
    close: Option<f64>,
    #[serde(
        rename = "Adj Close",
        alias = "adj_close",
        alias = "AdjClose",
        alias = "adjclose",
        default
    )]
    adj_close: Option<f64>,
}

/// Which column a price file is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceColumn {
    /// Dividend and split adjusted close, falling back to close when absent.
    #[default]
    AdjClose,
    /// Raw close.
    Close,
}

/// Price file parsing options.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date format string for parsing (e.g., "%Y-%m-%d").
    pub date_format: Option<String>,
    /// CSV delimiter character. If None, delimiter is auto-detected.
    pub delimiter: Option<u8>,
    /// Skip invalid rows instead of failing.
    pub skip_invalid: bool,
    /// Column to take prices from.
    pub price_column: PriceColumn,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            delimiter: None,
            skip_invalid: true,
            price_column: PriceColumn::AdjClose,
        }
    }
}

/// Detect the CSV delimiter from the first lines of a file.
///
/// Picks the candidate that splits every sampled line into the same number of
/// fields, preferring more fields. Price files need at least date and price.
fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().take(5).filter_map(|l| l.ok()).collect();

    if lines.is_empty() {
        return Ok(b',');
    }

    let delimiters = [b',', b'\t', b';', b'|'];
    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in &delimiters {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.as_bytes().iter().filter(|&&b| b == delim).count() + 1)
            .collect();

        let first_count = counts[0];
        let all_consistent = counts.iter().all(|&c| c == first_count);
        if all_consistent && first_count >= 2 && first_count > best_score {
            best_score = first_count;
            best_delimiter = delim;
        }
    }

    debug!(
        "Detected delimiter {:?} with {} fields",
        best_delimiter as char, best_score
    );
    Ok(best_delimiter)
}

/// Parse a date string, trying an explicit format first and then common ones.
pub(crate) fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate> {
    let s = s.trim();
    if let Some(fmt) = format {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d-%b-%Y",
        "%d %b %Y",
        "%b %d, %Y",
    ];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%SZ",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(AgoraError::InvalidSeries(format!(
        "could not parse date: '{}'",
        s
    )))
}

/// Load a dated price column from a CSV file.
///
/// Rows are sorted by date; duplicate dates keep the first row.
pub fn load_price_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<PriceSeries> {
    let path = path.as_ref();
    info!("Loading prices from: {}", path.display());

    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(path)?,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let mut points = Vec::new();
    let mut skipped = 0;

    for (row_num, result) in reader.deserialize().enumerate() {
        let row: CsvRow = match result {
            Ok(r) => r,
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {}: {}", row_num + 1, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(AgoraError::CsvError(e)),
        };

        let date = match parse_date(&row.date, config.date_format.as_deref()) {
            Ok(d) => d,
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {} due to date parse error: {}", row_num + 1, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let price = match config.price_column {
            PriceColumn::AdjClose => row.adj_close.or(row.close),
            PriceColumn::Close => row.close,
        };

        match price.filter(|p| p.is_finite()) {
            Some(price) => points.push(PricePoint::new(date, price)),
            None if config.skip_invalid => {
                debug!("Skipping row {}: missing price", row_num + 1);
                skipped += 1;
            }
            None => {
                return Err(AgoraError::InvalidSeries(format!(
                    "missing price at row {}",
                    row_num + 1
                )))
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} invalid rows in {}", skipped, path.display());
    }

    points.sort_by_key(|p| p.date);
    let original_len = points.len();
    points.dedup_by_key(|p| p.date);
    if points.len() < original_len {
        warn!("Removed {} duplicate dates", original_len - points.len());
    }

    PriceSeries::new(points)
}

/// Reads `<directory>/<TICKER>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    directory: PathBuf,
    config: DataConfig,
}

impl CsvPriceProvider {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            config: DataConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DataConfig) -> Self {
        self.config = config;
        self
    }

    /// Path of the price file for `ticker`.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.directory.join(format!("{}.csv", ticker))
    }
}

impl PriceProvider for CsvPriceProvider {
    fn fetch(&self, ticker: &str, range: &DateRange) -> Result<PriceSeries> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(AgoraError::unavailable(
                ticker,
                format!("no price file at {}", path.display()),
            ));
        }

        let series = load_price_csv(&path, &self.config)
            .map_err(|e| AgoraError::unavailable(ticker, e.to_string()))?
            .within(range);

        if series.is_empty() {
            return Err(AgoraError::unavailable(
                ticker,
                format!("no prices between {}", range),
            ));
        }
        Ok(series)
    }
}

/// Serves prices from memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceProvider {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<String>, series: PriceSeries) {
        self.series.insert(ticker.into(), series);
    }

    pub fn with_series(mut self, ticker: impl Into<String>, series: PriceSeries) -> Self {
        self.insert(ticker, series);
        self
    }
}

impl PriceProvider for InMemoryPriceProvider {
    fn fetch(&self, ticker: &str, range: &DateRange) -> Result<PriceSeries> {
        let series = self
            .series
            .get(ticker)
            .ok_or_else(|| AgoraError::unavailable(ticker, "unknown ticker"))?
            .within(range);
        if series.is_empty() {
            return Err(AgoraError::unavailable(
                ticker,
                format!("no prices between {}", range),
            ));
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn wide_range() -> DateRange {
        DateRange::new(date(2000, 1, 1), date(2030, 1, 1)).unwrap()
    }

    #[test]
    fn test_load_prefers_adj_close() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Adj Close,Volume").unwrap();
        writeln!(file, "2020-01-02,10,11,9,10.5,10.0,1000").unwrap();
        writeln!(file, "2020-01-03,10,11,9,11.5,11.0,1000").unwrap();

        let series = load_price_csv(file.path(), &DataConfig::default()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].price, 10.0);

        let config = DataConfig {
            price_column: PriceColumn::Close,
            ..Default::default()
        };
        let series = load_price_csv(file.path(), &config).unwrap();
        assert_eq!(series.points()[1].price, 11.5);
    }

    #[test]
    fn test_load_sorts_and_dedups() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date;close").unwrap();
        writeln!(file, "2020-01-03;3.0").unwrap();
        writeln!(file, "2020-01-01;1.0").unwrap();
        writeln!(file, "2020-01-01;9.0").unwrap();
        writeln!(file, "not a date;2.0").unwrap();

        let series = load_price_csv(file.path(), &DataConfig::default()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(date(2020, 1, 1)));
        assert_eq!(series.last_date(), Some(date(2020, 1, 3)));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-04-23", None).unwrap(), date(2020, 4, 23));
        assert_eq!(parse_date("23/04/2020", None).unwrap(), date(2020, 4, 23));
        assert_eq!(
            parse_date("2020-04-23 16:00:00", None).unwrap(),
            date(2020, 4, 23)
        );
        assert_eq!(
            parse_date("04.23.2020", Some("%m.%d.%Y")).unwrap(),
            date(2020, 4, 23)
        );
        assert!(parse_date("yesterday", None).is_err());
    }

    #[test]
    fn test_csv_provider() {
        let dir = TempDir::new().unwrap();
        let mut file = File::create(dir.path().join("AAPL.csv")).unwrap();
        writeln!(file, "Date,Close").unwrap();
        writeln!(file, "2020-01-02,100.0").unwrap();
        writeln!(file, "2020-01-03,101.0").unwrap();
        writeln!(file, "2020-02-03,102.0").unwrap();

        let provider = CsvPriceProvider::new(dir.path());
        let range = DateRange::new(date(2020, 1, 1), date(2020, 1, 31)).unwrap();
        let series = provider.fetch("AAPL", &range).unwrap();
        assert_eq!(series.len(), 2);

        let err = provider.fetch("MSFT", &range).unwrap_err();
        assert!(matches!(err, AgoraError::DataUnavailable { ref ticker, .. } if ticker == "MSFT"));

        let later = DateRange::new(date(2021, 1, 1), date(2021, 2, 1)).unwrap();
        assert!(provider.fetch("AAPL", &later).is_err());
    }

    #[test]
    fn test_in_memory_provider() {
        let series =
            PriceSeries::from_pairs([(date(2020, 1, 1), 1.0), (date(2020, 1, 2), 2.0)]).unwrap();
        let provider = InMemoryPriceProvider::new().with_series("X", series.clone());
        assert_eq!(provider.fetch("X", &wide_range()).unwrap(), series);
        assert!(provider.fetch("Y", &wide_range()).is_err());
    }
}
