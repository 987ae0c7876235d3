use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::Error;
use crate::models::{CoinSeries, MergedRow};

pub const COIN_NOT_FOUND_MESSAGE: &str = "Coin not found. Try another name.";
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit reached. Please wait a moment and try again.";
pub const FETCH_FAILED_MESSAGE: &str = "Error fetching data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
}

/// A failure as shown to the user. Cancellation never becomes one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    CoinNotFound(String),
    RateLimited,
    UpstreamHttp(u16),
    NetworkOrParse(String),
}

impl FetchError {
    /// Maps a crate error onto a user-facing kind. Returns `None` for
    /// [`Error::Canceled`], which is never surfaced.
    pub fn classify(err: &Error) -> Option<Self> {
        match err {
            Error::Canceled => None,
            Error::CoinNotFound(coin) => Some(FetchError::CoinNotFound(coin.clone())),
            Error::RateLimitExceeded(_) => Some(FetchError::RateLimited),
            Error::UpstreamStatus { status: 429, .. } => Some(FetchError::RateLimited),
            Error::UpstreamStatus { status, .. } => Some(FetchError::UpstreamHttp(*status)),
            other => Some(FetchError::NetworkOrParse(other.to_string())),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FetchError::CoinNotFound(_) => COIN_NOT_FOUND_MESSAGE,
            FetchError::RateLimited => RATE_LIMITED_MESSAGE,
            FetchError::UpstreamHttp(_) | FetchError::NetworkOrParse(_) => FETCH_FAILED_MESSAGE,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for FetchError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Everything the view reads. Only the orchestrator writes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    pub status: FetchStatus,
    pub error: Option<FetchError>,
    pub price: Option<f64>,
    pub series: CoinSeries,
    pub rows: Vec<MergedRow>,
}

impl DashboardState {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(FetchError::message)
    }

    pub(crate) fn clear_data(&mut self) {
        self.price = None;
        self.series = CoinSeries::new();
        self.rows.clear();
    }
}
