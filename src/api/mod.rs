use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Interval, MarketChart, PricePoint};

pub mod coingecko;

pub use coingecko::CoinGeckoClient;

/// Upstream market data source used by the orchestrator and the proxy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current USD price for `coin`, or `None` when the API has no entry for it.
    async fn current_price(&self, coin: &str) -> Result<Option<f64>>;

    /// Raw market chart body, relayed as-is by the proxy.
    async fn market_chart_raw(
        &self,
        coin: &str,
        days: &str,
        interval: &str,
    ) -> Result<serde_json::Value>;
}

/// Fetches and decodes the price history for `coin`.
pub async fn price_history(
    provider: &dyn MarketDataProvider,
    coin: &str,
    days: u32,
    interval: Interval,
) -> Result<Vec<PricePoint>> {
    let body = provider
        .market_chart_raw(coin, &days.to_string(), interval.as_str())
        .await?;
    Ok(MarketChart::from_value(body)?.prices)
}

pub type SharedProvider = Arc<dyn MarketDataProvider>;
