//! Fetch orchestration for the dashboard.
//!
//! Each call to [`FetchOrchestrator::start_fetch`] opens a new request
//! session and aborts the previous one. Sessions are numbered; a session
//! may only publish into [`DashboardState`] while its number is still the
//! latest, and the number is bumped under the same lock that guards the
//! state, so a superseded session can never overwrite a newer result.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};

use crate::api::{self, SharedProvider};
use crate::error::{Error, Result};
use crate::models::{CoinSeries, Interval};

mod debounce;
mod merge;
mod state;

pub use debounce::Debouncer;
pub use merge::{merge_series, MergeStrategy};
pub use state::{
    DashboardState, FetchError, FetchStatus, COIN_NOT_FOUND_MESSAGE, FETCH_FAILED_MESSAGE,
    RATE_LIMITED_MESSAGE,
};

/// What to fetch: one coin (price + history) or several (histories only).
///
/// Only constructible through [`FetchSpec::new`], so every value that
/// reaches [`FetchOrchestrator::start_fetch`] has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    coins: Vec<String>,
    range_days: u32,
    interval: Interval,
}

impl FetchSpec {
    /// Normalizes coin ids (trimmed, lowercase, blanks dropped) and rejects
    /// an empty selection or a zero-day range.
    pub fn new<I, S>(coins: I, range_days: u32, interval: Interval) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let coins: Vec<String> = coins
            .into_iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        if coins.is_empty() {
            return Err(Error::ValidationError("at least one coin is required".into()));
        }
        if range_days == 0 {
            return Err(Error::ValidationError("range must be at least one day".into()));
        }

        Ok(Self {
            coins,
            range_days,
            interval,
        })
    }

    pub fn coins(&self) -> &[String] {
        &self.coins
    }

    pub fn range_days(&self) -> u32 {
        self.range_days
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn is_single(&self) -> bool {
        self.coins.len() == 1
    }
}

/// Handle for one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSession {
    generation: u64,
}

impl RequestSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct FetchOutcome {
    price: Option<f64>,
    series: CoinSeries,
}

struct Inner {
    provider: SharedProvider,
    merge: MergeStrategy,
    state: watch::Sender<DashboardState>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
}

#[derive(Clone)]
pub struct FetchOrchestrator {
    inner: Arc<Inner>,
}

impl FetchOrchestrator {
    pub fn new(provider: SharedProvider, merge: MergeStrategy) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                merge,
                state,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> DashboardState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    pub fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Supersedes whatever is in flight and starts fetching `spec` on a new
    /// task. Returns without waiting for the previous session to stop.
    pub async fn start_fetch(&self, spec: FetchSpec) -> JoinHandle<()> {
        let mut in_flight = self.inner.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        let session = self.begin_session();
        info!(
            "Session {}: fetching {} ({} days, {})",
            session.generation,
            spec.coins.join(","),
            spec.range_days,
            spec.interval
        );

        let this = self.clone();
        let handle = tokio::spawn(async move { this.run_session(session, spec).await });
        *in_flight = Some(handle.abort_handle());
        handle
    }

    /// Aborts the in-flight session, if any, and returns to idle without
    /// touching the displayed data.
    pub async fn cancel(&self) {
        let mut in_flight = self.inner.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }
        self.inner.state.send_if_modified(|state| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            let was_loading = state.is_loading();
            state.status = FetchStatus::Idle;
            was_loading
        });
    }

    fn begin_session(&self) -> RequestSession {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.status = FetchStatus::Loading;
            state.error = None;
        });
        RequestSession { generation }
    }

    fn is_current(&self, session: &RequestSession) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == session.generation
    }

    fn ensure_current(&self, session: &RequestSession) -> Result<()> {
        if self.is_current(session) {
            Ok(())
        } else {
            Err(Error::Canceled)
        }
    }

    /// Applies `update` only if `session` is still the latest one.
    fn commit<F>(&self, session: &RequestSession, update: F) -> bool
    where
        F: FnOnce(&mut DashboardState),
    {
        self.inner.state.send_if_modified(|state| {
            if !self.is_current(session) {
                return false;
            }
            update(state);
            true
        })
    }

    async fn run_session(&self, session: RequestSession, spec: FetchSpec) {
        let result = self.fetch(&session, &spec).await;

        match result {
            Ok(outcome) => {
                let rows = merge_series(&outcome.series, self.inner.merge);
                let row_count = rows.len();
                let committed = self.commit(&session, |state| {
                    state.status = FetchStatus::Idle;
                    state.error = None;
                    state.price = outcome.price;
                    state.series = outcome.series;
                    state.rows = rows;
                });
                if committed {
                    info!("Session {}: {} rows ready", session.generation, row_count);
                } else {
                    debug!("Session {}: superseded before commit", session.generation);
                }
            }
            Err(Error::Canceled) => {
                debug!("Session {}: canceled", session.generation);
            }
            Err(err) => {
                let Some(kind) = FetchError::classify(&err) else {
                    return;
                };
                let committed = self.commit(&session, |state| {
                    state.status = FetchStatus::Idle;
                    state.error = Some(kind);
                    state.clear_data();
                });
                if committed {
                    warn!("Session {}: fetch failed: {}", session.generation, err);
                } else {
                    debug!("Session {}: superseded after error: {}", session.generation, err);
                }
            }
        }
    }

    async fn fetch(&self, session: &RequestSession, spec: &FetchSpec) -> Result<FetchOutcome> {
        let provider = self.inner.provider.as_ref();

        let mut price = None;
        if let [coin] = spec.coins.as_slice() {
            let lookup = provider.current_price(coin).await;
            self.ensure_current(session)?;
            match lookup? {
                Some(p) => price = Some(p),
                None => return Err(Error::CoinNotFound(coin.clone())),
            }
        }

        // One coin at a time to stay under the upstream rate limit.
        let mut series = CoinSeries::new();
        for coin in &spec.coins {
            let history = api::price_history(provider, coin, spec.range_days, spec.interval).await;
            self.ensure_current(session)?;
            series.insert(coin.clone(), history?);
        }

        Ok(FetchOutcome { price, series })
    }
}
