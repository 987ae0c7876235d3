use coin_dashboard::config::UpstreamConfig;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;
use warp::Filter;

/// Requests seen by the mock upstream, in order.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    paths: Arc<Mutex<Vec<String>>>,
    keys: Arc<Mutex<Vec<String>>>,
}

impl RequestLog {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// API key header per request: `demo:<key>`, `pro:<key>` or `none`.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    fn record(&self, path: String, demo: Option<String>, pro: Option<String>) {
        let key = match (demo, pro) {
            (Some(demo), None) => format!("demo:{}", demo),
            (None, Some(pro)) => format!("pro:{}", pro),
            (None, None) => "none".to_string(),
            (Some(demo), Some(pro)) => format!("demo:{}+pro:{}", demo, pro),
        };
        self.paths.lock().unwrap().push(path);
        self.keys.lock().unwrap().push(key);
    }
}

fn api_key_headers(
) -> impl Filter<Extract = (Option<String>, Option<String>), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("x-cg-demo-api-key")
        .and(warp::header::optional::<String>("x-cg-pro-api-key"))
}

// Helper to spin up a CoinGecko look-alike on an ephemeral port.
// Known coins: bitcoin (3 daily samples), ethereum (2). "throttled" answers 429.
pub fn spawn_mock_upstream() -> (SocketAddr, RequestLog) {
    let log = RequestLog::default();

    let price_log = log.clone();
    let price = warp::path!("api" / "v3" / "simple" / "price")
        .and(warp::query::<HashMap<String, String>>())
        .and(api_key_headers())
        .map(move |q: HashMap<String, String>, demo: Option<String>, pro: Option<String>| {
            let ids = q.get("ids").cloned().unwrap_or_default();
            price_log.record(format!("price:{}", ids), demo, pro);
            let body = match ids.as_str() {
                "bitcoin" => serde_json::json!({"bitcoin": {"usd": 67123.45}}),
                "ethereum" => serde_json::json!({"ethereum": {"usd": 3012.5}}),
                _ => serde_json::json!({}),
            };
            warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
        });

    let chart_log = log.clone();
    let chart = warp::path!("api" / "v3" / "coins" / String / "market_chart")
        .and(warp::query::<HashMap<String, String>>())
        .and(api_key_headers())
        .map(move |coin: String, q: HashMap<String, String>, demo: Option<String>, pro: Option<String>| {
            chart_log.record(
                format!(
                    "chart:{}:{}:{}:{}",
                    coin,
                    q.get("vs_currency").cloned().unwrap_or_default(),
                    q.get("days").cloned().unwrap_or_default(),
                    q.get("interval").cloned().unwrap_or_default()
                ),
                demo,
                pro,
            );
            let (status, body) = match coin.as_str() {
                "bitcoin" => (
                    StatusCode::OK,
                    serde_json::json!({
                        "prices": [[1704067200000u64, 42000.0], [1704153600000u64, 43000.0], [1704240000000u64, 44000.0]],
                        "market_caps": [],
                        "total_volumes": []
                    }),
                ),
                "ethereum" => (
                    StatusCode::OK,
                    serde_json::json!({
                        "prices": [[1704067200000u64, 2300.0], [1704153600000u64, 2350.0]],
                        "market_caps": [],
                        "total_volumes": []
                    }),
                ),
                "throttled" => (
                    StatusCode::TOO_MANY_REQUESTS,
                    serde_json::json!({"status": {"error_code": 429, "error_message": "Throttled"}}),
                ),
                _ => (StatusCode::NOT_FOUND, serde_json::json!({"error": "coin not found"})),
            };
            warp::reply::with_status(warp::reply::json(&body), status)
        });

    let (addr, server) = warp::serve(price.or(chart)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, log)
}

pub fn upstream_config(addr: SocketAddr) -> UpstreamConfig {
    UpstreamConfig {
        base_url: format!("http://{}/api/v3", addr),
        timeout_secs: Some(5),
        ..UpstreamConfig::default()
    }
}
