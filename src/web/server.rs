use log::info;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use warp::{Filter, Rejection, Reply};

use crate::api::SharedProvider;
use crate::error::{Error, Result};
use crate::web::proxy;

pub struct WebServer {
    provider: SharedProvider,
}

impl WebServer {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        routes(self.provider.clone())
    }

    /// Serves until `shutdown` resolves.
    pub async fn start(
        &self,
        host: &str,
        port: u16,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| Error::ConfigError(format!("invalid listen address {}:{}: {}", host, port, e)))?;

        let routes = self.routes().with(warp::log("coin_dashboard::web"));
        let (bound, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|e| Error::InternalError(format!("failed to bind {}: {}", addr, e)))?;

        info!("Proxy listening on http://{}", bound);
        server.await;
        info!("Proxy stopped");
        Ok(())
    }
}

pub fn routes(
    provider: SharedProvider,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "ok",
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        });

    let coins = warp::path!("api" / "coins")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_provider(provider))
        .and_then(proxy::market_chart);

    health.or(coins)
}

fn with_provider(
    provider: SharedProvider,
) -> impl Filter<Extract = (SharedProvider,), Error = Infallible> + Clone {
    warp::any().map(move || provider.clone())
}
