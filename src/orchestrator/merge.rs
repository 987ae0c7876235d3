use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{CoinSeries, MergedRow};

/// How per-coin histories are aligned into chart rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Row `i` takes sample `i` of every coin, whatever its timestamp.
    /// Assumes all histories share the reference coin's sampling.
    #[default]
    Positional,
    /// Row `i` takes each coin's sample whose timestamp equals the
    /// reference coin's sample `i`.
    ByTimestamp,
}

/// Builds one row per sample of the first coin. A coin that has no sample
/// for a row is left out of that row.
pub fn merge_series(series: &CoinSeries, strategy: MergeStrategy) -> Vec<MergedRow> {
    match strategy {
        MergeStrategy::Positional => merge_positional(series),
        MergeStrategy::ByTimestamp => merge_by_timestamp(series),
    }
}

fn merge_positional(series: &CoinSeries) -> Vec<MergedRow> {
    let Some(reference) = series.reference() else {
        return Vec::new();
    };

    reference
        .prices
        .iter()
        .enumerate()
        .map(|(i, anchor)| {
            let prices = series
                .iter()
                .filter_map(|history| history.prices.get(i).map(|p| (history.coin.clone(), p.price)))
                .collect::<BTreeMap<_, _>>();
            MergedRow {
                date: anchor.date_label(),
                timestamp: anchor.timestamp,
                prices,
            }
        })
        .collect()
}

fn merge_by_timestamp(series: &CoinSeries) -> Vec<MergedRow> {
    let Some(reference) = series.reference() else {
        return Vec::new();
    };

    let lookups: Vec<(&str, HashMap<i64, f64>)> = series
        .iter()
        .map(|history| {
            let by_ts = history
                .prices
                .iter()
                .map(|p| (p.timestamp, p.price))
                .collect::<HashMap<_, _>>();
            (history.coin.as_str(), by_ts)
        })
        .collect();

    reference
        .prices
        .iter()
        .map(|anchor| {
            let prices = lookups
                .iter()
                .filter_map(|(coin, by_ts)| {
                    by_ts.get(&anchor.timestamp).map(|price| (coin.to_string(), *price))
                })
                .collect::<BTreeMap<_, _>>();
            MergedRow {
                date: anchor.date_label(),
                timestamp: anchor.timestamp,
                prices,
            }
        })
        .collect()
}
