use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::api::MarketDataProvider;
use crate::config::{Config, DashboardConfig, ServerConfig, UpstreamConfig};
use crate::error::{Error, Result};
use crate::models::PricePoint;
use crate::orchestrator::MergeStrategy;

// Helper to create a config pointing at a local upstream
pub fn create_test_config(base_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        upstream: UpstreamConfig {
            base_url: base_url.to_string(),
            vs_currency: "usd".to_string(),
            api_key: None,
            pro: false,
            timeout_secs: Some(5),
        },
        dashboard: DashboardConfig {
            coins: vec!["bitcoin".to_string()],
            range_days: 30,
            interval: Default::default(),
            debounce_ms: 500,
            merge: MergeStrategy::Positional,
        },
    }
}

/// `len` daily samples starting 2024-01-01 UTC, priced `base`, `base + 1`, ...
pub fn daily_points(len: usize, base: f64) -> Vec<PricePoint> {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .unwrap()
        .timestamp_millis();
    (0..len)
        .map(|i| PricePoint::new(start + i as i64 * 86_400_000, base + i as f64))
        .collect()
}

pub fn chart_body(points: &[PricePoint]) -> serde_json::Value {
    serde_json::json!({
        "prices": points.iter().map(|p| vec![p.timestamp as f64, p.price]).collect::<Vec<_>>(),
        "market_caps": [],
        "total_volumes": [],
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Price(String),
    ChartStart(String, String, String),
    ChartEnd(String),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn snapshot(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn chart_requests(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|c| matches!(c, Call::ChartStart(..)))
            .count()
    }

    /// `(coin, days)` of every chart request, in order.
    pub fn charted_coins(&self) -> Vec<(String, String)> {
        self.snapshot()
            .into_iter()
            .filter_map(|c| match c {
                Call::ChartStart(coin, days, _) => Some((coin, days)),
                _ => None,
            })
            .collect()
    }

    pub fn requested_chart(&self, coin: &str) -> bool {
        self.charted_coins().iter().any(|(c, _)| c == coin)
    }
}

#[derive(Debug, Clone)]
enum Failure {
    Status(u16),
    Network,
}

/// In-memory provider that records every call and can hold chart requests
/// until released.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    prices: HashMap<String, f64>,
    charts: HashMap<String, Vec<PricePoint>>,
    chart_failures: HashMap<String, Failure>,
    network_down: Vec<String>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    delay: Option<Duration>,
    calls: CallLog,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coin(mut self, coin: &str, price: f64, points: Vec<PricePoint>) -> Self {
        self.prices.insert(coin.to_string(), price);
        self.charts.insert(coin.to_string(), points);
        self
    }

    pub fn with_price(mut self, coin: &str, price: f64) -> Self {
        self.prices.insert(coin.to_string(), price);
        self
    }

    pub fn with_chart_status(mut self, coin: &str, status: u16) -> Self {
        self.chart_failures.insert(coin.to_string(), Failure::Status(status));
        self
    }

    pub fn with_network_failure(mut self, coin: &str) -> Self {
        self.network_down.push(coin.to_string());
        self.chart_failures.insert(coin.to_string(), Failure::Network);
        self
    }

    /// Every chart request takes `delay` before it answers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds chart requests for `coin` until the returned handle is notified.
    pub fn gate(&self, coin: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(coin.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn current_price(&self, coin: &str) -> Result<Option<f64>> {
        self.calls.push(Call::Price(coin.to_string()));
        if self.network_down.iter().any(|c| c == coin) {
            return Err(Error::NetworkError("connection refused".to_string()));
        }
        Ok(self.prices.get(coin).copied())
    }

    async fn market_chart_raw(
        &self,
        coin: &str,
        days: &str,
        interval: &str,
    ) -> Result<serde_json::Value> {
        self.calls.push(Call::ChartStart(
            coin.to_string(),
            days.to_string(),
            interval.to_string(),
        ));

        let gate = self.gates.lock().unwrap().get(coin).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.push(Call::ChartEnd(coin.to_string()));

        match self.chart_failures.get(coin) {
            Some(Failure::Status(status)) => Err(Error::UpstreamStatus {
                status: *status,
                message: format!("Upstream error: {}", status),
            }),
            Some(Failure::Network) => Err(Error::NetworkError("connection reset".to_string())),
            None => match self.charts.get(coin) {
                Some(points) => Ok(chart_body(points)),
                None => Err(Error::UpstreamStatus {
                    status: 404,
                    message: "coin not found".to_string(),
                }),
            },
        }
    }
}
