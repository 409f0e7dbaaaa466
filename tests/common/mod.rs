//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use pkgcollection as crate_root;
use tokio::sync::{mpsc, oneshot};

use crate_root::app::{Collection, CollectionConfig, Signal};
use crate_root::error::TransportError;
use crate_root::index::{MemoryOfflineCache, OfflineCache};
use crate_root::sources::{FetchResult, PackageSource};
use crate_root::state::{InstallState, PackageOrigin, PackageRecord};

/// Pending calls of one kind.
type Gates = Mutex<Vec<Option<oneshot::Sender<FetchResult>>>>;

/// What: Fake registry whose calls complete only when the test releases them.
///
/// Details:
/// - Call `i` of each kind is released with `release_list(i, ..)` /
///   `release_search(i, ..)`, in any order.
#[derive(Default)]
pub struct FakeRegistry {
    /// Outstanding list calls.
    list: Gates,
    /// Outstanding search calls.
    search: Gates,
    /// Queries received by `fetch_search`.
    queries: Mutex<Vec<String>>,
}

impl FakeRegistry {
    /// Shared handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// List calls issued so far.
    pub fn list_calls(&self) -> usize {
        self.list.lock().expect("lock").len()
    }

    /// Search calls issued so far.
    pub fn search_calls(&self) -> usize {
        self.search.lock().expect("lock").len()
    }

    /// Queries seen by search calls.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("lock").clone()
    }

    /// Release list call `idx`.
    pub fn release_list(&self, idx: usize, result: FetchResult) {
        release(&self.list, idx, result);
    }

    /// Release search call `idx`.
    pub fn release_search(&self, idx: usize, result: FetchResult) {
        release(&self.search, idx, result);
    }
}

/// Complete the `idx`-th gate.
fn release(gates: &Gates, idx: usize, result: FetchResult) {
    let tx = gates
        .lock()
        .expect("lock")
        .get_mut(idx)
        .and_then(Option::take)
        .expect("call issued and not yet released");
    let _ = tx.send(result);
}

/// Register a gate and wait on it.
fn gate(gates: &Gates) -> BoxFuture<'static, FetchResult> {
    let (tx, rx) = oneshot::channel();
    gates.lock().expect("lock").push(Some(tx));
    async move {
        rx.await
            .unwrap_or_else(|_| Err(TransportError::Worker("released without result".into())))
    }
    .boxed()
}

impl PackageSource for FakeRegistry {
    fn fetch_list(&self) -> BoxFuture<'static, FetchResult> {
        gate(&self.list)
    }

    fn fetch_search(&self, query: &str) -> BoxFuture<'static, FetchResult> {
        self.queries.lock().expect("lock").push(query.to_string());
        gate(&self.search)
    }
}

/// Record with a display name and version.
pub fn record(name: &str, display: &str, version: &str) -> PackageRecord {
    PackageRecord {
        name: name.into(),
        display_name: display.into(),
        version: version.into(),
        ..PackageRecord::default()
    }
}

/// Installed record of `origin`.
pub fn installed(name: &str, version: &str, origin: PackageOrigin) -> PackageRecord {
    PackageRecord {
        origin,
        install_state: InstallState::Installed,
        ..record(name, name, version)
    }
}

/// Collection over `source` with an offline cache holding `cached`.
pub fn collection_with_cache(
    source: &Arc<FakeRegistry>,
    cached: Vec<PackageRecord>,
) -> (Collection, Arc<MemoryOfflineCache>) {
    let cache = Arc::new(MemoryOfflineCache::with_records(cached));
    let c = Collection::new(
        Arc::clone(source) as Arc<dyn PackageSource>,
        Arc::clone(&cache) as Arc<dyn OfflineCache>,
        CollectionConfig::default(),
    );
    (c, cache)
}

/// Every signal queued on `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Signal>) -> Vec<Signal> {
    let mut out = Vec::new();
    while let Ok(s) = rx.try_recv() {
        out.push(s);
    }
    out
}

/// Settle `c`, failing the test instead of hanging.
pub async fn settle(c: &mut Collection) {
    tokio::time::timeout(Duration::from_secs(5), c.settle())
        .await
        .expect("collection settles");
}

/// Names in display order.
pub fn names(c: &Collection) -> Vec<String> {
    c.packages().iter().map(|p| p.name.clone()).collect()
}
