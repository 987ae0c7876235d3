use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A single `[timestamp_ms, price]` sample as returned by the market chart API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Formats the timestamp as a US-style calendar date (`M/D/YYYY`, UTC).
    pub fn date_label(&self) -> String {
        format_date(self.timestamp)
    }
}

// Upstream sends timestamps as JSON numbers, occasionally with a fractional part.
impl From<(f64, f64)> for PricePoint {
    fn from((timestamp, price): (f64, f64)) -> Self {
        Self {
            timestamp: timestamp as i64,
            price,
        }
    }
}

impl From<PricePoint> for (f64, f64) {
    fn from(point: PricePoint) -> Self {
        (point.timestamp as f64, point.price)
    }
}

pub fn format_date(timestamp_ms: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Body of `GET /coins/{id}/market_chart`. Only `prices` is consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<PricePoint>,
}

impl MarketChart {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.get("prices").map_or(false, |p| p.is_array()) {
            return Err(Error::ApiInvalidFormat(
                "market chart response has no prices array".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Price history for one coin, in the order the API returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinHistory {
    pub coin: String,
    pub prices: Vec<PricePoint>,
}

/// Per-coin histories keyed by coin id, preserving the requested coin order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinSeries {
    entries: Vec<CoinHistory>,
}

impl CoinSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, coin: impl Into<String>, prices: Vec<PricePoint>) {
        let coin = coin.into();
        match self.entries.iter_mut().find(|e| e.coin == coin) {
            Some(entry) => entry.prices = prices,
            None => self.entries.push(CoinHistory { coin, prices }),
        }
    }

    pub fn get(&self, coin: &str) -> Option<&[PricePoint]> {
        self.entries
            .iter()
            .find(|e| e.coin == coin)
            .map(|e| e.prices.as_slice())
    }

    pub fn coins(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.coin.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoinHistory> {
        self.entries.iter()
    }

    /// The first coin's history, used as the reference axis when merging.
    pub fn reference(&self) -> Option<&CoinHistory> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One chart row: a date label plus the price of every coin that has a
/// sample at this position. Serializes flat, e.g.
/// `{"date":"1/2/2024","bitcoin":42000.0,"ethereum":2300.0}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub date: String,
    #[serde(skip)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub prices: BTreeMap<String, f64>,
}

impl MergedRow {
    pub fn price(&self, coin: &str) -> Option<f64> {
        self.prices.get(coin).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Interval::Daily),
            other => Err(Error::ValidationError(format!(
                "unsupported interval '{}'",
                other
            ))),
        }
    }
}
