use std::collections::HashMap;

pub const MISSING_PARAMS_MESSAGE: &str = "Missing required query params";

/// Query of `GET /api/coins`, all fields required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartQuery {
    pub coin: String,
    pub days: String,
    pub interval: String,
}

impl ChartQuery {
    /// Returns the names of the missing parameters on failure. An empty
    /// value counts as missing.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, Vec<&'static str>> {
        let field = |name: &'static str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let coin = field("coin");
        let days = field("days");
        let interval = field("interval");

        match (coin, days, interval) {
            (Some(coin), Some(days), Some(interval)) => Ok(Self {
                coin,
                days,
                interval,
            }),
            (coin, days, interval) => Err([
                ("coin", coin.is_none()),
                ("days", days.is_none()),
                ("interval", interval.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect()),
        }
    }
}
