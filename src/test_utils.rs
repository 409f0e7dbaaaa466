//! Test utilities for common test setup.
//!
//! This module provides shared test helpers used across multiple test modules.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::app::Signal;
use crate::error::TransportError;
use crate::sources::{FetchResult, PackageSource};

/// Serialises tests that touch process environment variables.
static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// What: Lock guarding environment mutation across tests.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Pending transport calls, resolved by the test in any order.
type Gates = Mutex<Vec<Option<oneshot::Sender<FetchResult>>>>;

/// What: Transport whose calls stay pending until the test resolves them.
///
/// Details:
/// - Every `fetch_*` call registers a gate; `resolve_*(i, ..)` completes the
///   i-th call of that kind. Unresolved gates dropped by the test fail with
///   `TransportError::Worker`.
#[derive(Default)]
pub struct GatedSource {
    /// Gates for list calls.
    list: Gates,
    /// Gates for search calls.
    search: Gates,
}

impl GatedSource {
    /// Number of list calls issued so far.
    pub fn list_calls(&self) -> usize {
        self.list.lock().map_or(0, |g| g.len())
    }

    /// Number of search calls issued so far.
    pub fn search_calls(&self) -> usize {
        self.search.lock().map_or(0, |g| g.len())
    }

    /// Complete the `idx`-th list call.
    pub fn resolve_list(&self, idx: usize, result: FetchResult) {
        Self::resolve(&self.list, idx, result);
    }

    /// Complete the `idx`-th search call.
    pub fn resolve_search(&self, idx: usize, result: FetchResult) {
        Self::resolve(&self.search, idx, result);
    }

    /// Shared resolve logic.
    fn resolve(gates: &Gates, idx: usize, result: FetchResult) {
        let tx = gates
            .lock()
            .expect("gates lock")
            .get_mut(idx)
            .and_then(Option::take)
            .expect("call was issued and not yet resolved");
        let _ = tx.send(result);
    }

    /// Register a gate and return the future waiting on it.
    fn gate(gates: &Gates) -> BoxFuture<'static, FetchResult> {
        let (tx, rx) = oneshot::channel();
        gates.lock().expect("gates lock").push(Some(tx));
        async move {
            rx.await
                .unwrap_or_else(|_| Err(TransportError::Worker("gate dropped".into())))
        }
        .boxed()
    }
}

impl PackageSource for GatedSource {
    fn fetch_list(&self) -> BoxFuture<'static, FetchResult> {
        Self::gate(&self.list)
    }

    fn fetch_search(&self, _query: &str) -> BoxFuture<'static, FetchResult> {
        Self::gate(&self.search)
    }
}

/// What: Collect every signal already queued on `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Signal>) -> Vec<Signal> {
    let mut out = Vec::new();
    while let Ok(s) = rx.try_recv() {
        out.push(s);
    }
    out
}
