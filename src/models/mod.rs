pub mod market;

pub use market::{CoinHistory, CoinSeries, Interval, MarketChart, MergedRow, PricePoint};
