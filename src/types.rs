//! Core data types: dates, price series and dated returns.

use crate::error::{AgoraError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format accepted on the configuration surface.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Inclusive calendar window for which prices are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(AgoraError::InvalidDateRange(format!(
                "end ({}) should be later than start ({})",
                end.format(DATE_FORMAT),
                start.format(DATE_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `dd/mm/yyyy` strings into a validated range.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_bound(start, "start")?, parse_bound(end, "end")?)
    }

    /// The 365 days ending at `today`.
    pub fn trailing_year(today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(365),
            end: today,
        }
    }

    /// Check whether `date` falls inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Parse one `dd/mm/yyyy` bound; `bound` names it in the error.
pub fn parse_bound(value: &str, bound: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        AgoraError::InvalidDateRange(format!(
            "incorrect {} date '{}', it should be 'dd/mm/yyyy'",
            bound, value
        ))
    })
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// A single dated closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Price history of one ticker, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting unsorted or duplicate dates and non-finite prices.
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(AgoraError::InvalidSeries(format!(
                    "dates must be strictly increasing, found {} after {} at index {}",
                    pair[1].date,
                    pair[0].date,
                    i + 1
                )));
            }
        }
        if let Some(p) = points.iter().find(|p| !p.price.is_finite()) {
            return Err(AgoraError::InvalidSeries(format!(
                "non-finite price {} on {}",
                p.price, p.date
            )));
        }
        Ok(Self { points })
    }

    /// Build a series from `(date, price)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, f64)>) -> Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, price)| PricePoint::new(date, price))
                .collect(),
        )
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Keep only the points inside `range`.
    pub fn within(&self, range: &DateRange) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| range.contains(p.date))
                .copied()
                .collect(),
        }
    }
}

/// A per-period return stamped with the date of the closing price it ends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}
