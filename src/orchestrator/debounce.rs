use log::debug;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{FetchOrchestrator, FetchSpec};

/// Delays fetches until the selection has been quiet for `quiet`.
///
/// Independent of session cancellation: dropping a pending timer never
/// touches a fetch that has already started.
pub struct Debouncer {
    quiet: Duration,
    orchestrator: FetchOrchestrator,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(orchestrator: FetchOrchestrator, quiet: Duration) -> Self {
        Self {
            quiet,
            orchestrator,
            pending: Mutex::new(None),
        }
    }

    /// (Re)starts the timer; `spec` is fetched once it expires.
    pub async fn schedule(&self, spec: FetchSpec) {
        let mut pending = self.pending.lock().await;
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let orchestrator = self.orchestrator.clone();
        let quiet = self.quiet;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            orchestrator.start_fetch(spec).await;
        }));
    }

    /// Drops a pending timer. Returns whether one was waiting.
    pub async fn cancel_pending(&self) -> bool {
        match self.pending.lock().await.take() {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                debug!("Dropped pending debounced fetch");
                true
            }
            _ => false,
        }
    }

    /// Skips the quiet period and fetches `spec` right away.
    pub async fn fire_now(&self, spec: FetchSpec) -> JoinHandle<()> {
        self.cancel_pending().await;
        self.orchestrator.start_fetch(spec).await
    }
}
