use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::api::MarketDataProvider;
use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";
const PRO_KEY_HEADER: &str = "x-cg-pro-api-key";

#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
    #[serde(flatten)]
    other: HashMap<String, Value>,
}

impl SimplePriceEntry {
    fn price_in(&self, vs_currency: &str) -> Option<f64> {
        if vs_currency == "usd" {
            return self.usd;
        }
        self.other.get(vs_currency).and_then(Value::as_f64)
    }
}

/// CoinGecko REST client. Stateless: no caching and no retries.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    base: Url,
    vs_currency: String,
    api_key: Option<String>,
    pro: bool,
}

impl CoinGeckoClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| Error::ConfigError(format!("invalid upstream base URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "upstream base URL {} cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            base,
            vs_currency: config.vs_currency.clone(),
            api_key: config.api_key.clone(),
            pro: config.pro,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Appends `segments` to the base URL, each one percent-encoded as a
    /// single path segment, so caller-supplied ids can't change the endpoint.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ConfigError(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn make_request(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<Value> {
        let url = self.endpoint_url(segments)?;
        let endpoint = url.path().to_string();
        debug!("GET {} {:?}", url, params);

        let mut request = self.client.get(url.clone()).query(params);
        if let Some(key) = &self.api_key {
            let header = if self.pro { PRO_KEY_HEADER } else { DEMO_KEY_HEADER };
            request = request.header(header, key);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            Error::NetworkError(e.to_string())
        })?;

        match response.status() {
            status if status.is_success() => response.json::<Value>().await.map_err(|e| {
                error!("Failed to parse response from {}: {}", url, e);
                Error::ApiInvalidFormat(format!("Failed to parse response: {}", e))
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("CoinGecko rate limit hit on {}", endpoint);
                Err(Error::RateLimitExceeded(
                    "CoinGecko API rate limit exceeded".to_string(),
                ))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("CoinGecko request {} failed with status {}", endpoint, status);
                Err(Error::UpstreamStatus {
                    status: status.as_u16(),
                    message: if body.is_empty() {
                        format!("Upstream error: {}", status.as_u16())
                    } else {
                        body
                    },
                })
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn current_price(&self, coin: &str) -> Result<Option<f64>> {
        let body = self
            .make_request(
                &["simple", "price"],
                &[("ids", coin), ("vs_currencies", self.vs_currency.as_str())],
            )
            .await?;

        let entries: HashMap<String, SimplePriceEntry> = serde_json::from_value(body)?;
        Ok(entries
            .get(coin)
            .and_then(|entry| entry.price_in(&self.vs_currency)))
    }

    async fn market_chart_raw(&self, coin: &str, days: &str, interval: &str) -> Result<Value> {
        self.make_request(
            &["coins", coin, "market_chart"],
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("days", days),
                ("interval", interval),
            ],
        )
        .await
    }
}
