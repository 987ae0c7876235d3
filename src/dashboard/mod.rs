use log::debug;
use tokio::task::JoinHandle;

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::models::Interval;
use crate::orchestrator::{DashboardState, Debouncer, FetchOrchestrator, FetchSpec};

mod render;
pub mod terminal;

pub use render::{format_price, format_usd, render};

/// What the user currently has selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub coins: Vec<String>,
    pub range_days: u32,
    pub interval: Interval,
}

impl Selection {
    pub fn to_spec(&self) -> Result<FetchSpec> {
        FetchSpec::new(&self.coins, self.range_days, self.interval)
    }
}

impl From<&DashboardConfig> for Selection {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            coins: config.coins.clone(),
            range_days: config.range_days,
            interval: config.interval,
        }
    }
}

/// Binds the selection controls to the orchestrator. Selection changes go
/// through the debouncer; refresh goes straight to the orchestrator.
pub struct DashboardView {
    selection: Selection,
    orchestrator: FetchOrchestrator,
    debouncer: Debouncer,
}

impl DashboardView {
    pub fn new(orchestrator: FetchOrchestrator, config: &DashboardConfig) -> Self {
        Self {
            selection: Selection::from(config),
            debouncer: Debouncer::new(orchestrator.clone(), config.debounce()),
            orchestrator,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn state(&self) -> DashboardState {
        self.orchestrator.state()
    }

    /// Replaces the coin selection; rejected selections leave the current one
    /// untouched.
    pub async fn select_coins<I, S>(&mut self, coins: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let spec = FetchSpec::new(coins, self.selection.range_days, self.selection.interval)?;
        self.selection.coins = spec.coins().to_vec();
        debug!("Coins changed to {}", spec.coins().join(","));
        self.debouncer.schedule(spec).await;
        Ok(())
    }

    pub async fn select_range(&mut self, range_days: u32) -> Result<()> {
        let spec = FetchSpec::new(&self.selection.coins, range_days, self.selection.interval)?;
        self.selection.range_days = range_days;
        debug!("Range changed to {} days", range_days);
        self.debouncer.schedule(spec).await;
        Ok(())
    }

    /// Fetches the current selection now.
    pub async fn refresh(&self) -> Result<JoinHandle<()>> {
        let spec = self.selection.to_spec()?;
        Ok(self.debouncer.fire_now(spec).await)
    }

    pub fn render(&self, state: &DashboardState) -> String {
        render::render(&self.selection, state)
    }

    /// Drops any pending timer and stops the in-flight fetch.
    pub async fn shutdown(&self) {
        self.debouncer.cancel_pending().await;
        self.orchestrator.cancel().await;
    }
}
