use log::{error, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::api::SharedProvider;
use crate::error::Error;
use crate::web::validation::{ChartQuery, MISSING_PARAMS_MESSAGE};

pub const UPSTREAM_FAILED_MESSAGE: &str = "Failed to fetch CoinGecko data";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn error_reply(status: StatusCode, error: &str, details: Option<String>) -> Response {
    reply::with_status(reply::json(&ErrorBody { error, details }), status).into_response()
}

fn details(err: &Error) -> String {
    match err {
        Error::UpstreamStatus { status, .. } => format!("Upstream error: {}", status),
        Error::RateLimitExceeded(_) => "Upstream error: 429".to_string(),
        other => other.to_string(),
    }
}

/// `GET /api/coins?coin=&days=&interval=`: relays the upstream market
/// chart unchanged.
pub async fn market_chart(
    params: HashMap<String, String>,
    provider: SharedProvider,
) -> Result<Response, Infallible> {
    let query = match ChartQuery::from_params(&params) {
        Ok(query) => query,
        Err(missing) => {
            warn!("Rejected proxy request, missing: {}", missing.join(", "));
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                MISSING_PARAMS_MESSAGE,
                None,
            ));
        }
    };

    match provider
        .market_chart_raw(&query.coin, &query.days, &query.interval)
        .await
    {
        Ok(body) => Ok(reply::with_header(
            reply::with_status(reply::json(&body), StatusCode::OK),
            "Access-Control-Allow-Origin",
            "*",
        )
        .into_response()),
        Err(err) => {
            match &err {
                Error::UpstreamStatus { status, .. } => {
                    error!("Proxy error: upstream returned {} for {}", status, query.coin)
                }
                Error::RateLimitExceeded(_) => {
                    error!("Proxy error: upstream rate limited request for {}", query.coin)
                }
                other => error!("Proxy error: request for {} failed: {}", query.coin, other),
            }
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                UPSTREAM_FAILED_MESSAGE,
                Some(details(&err)),
            ))
        }
    }
}
