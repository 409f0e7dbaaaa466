//! Collection orchestrator: owns the store, the trackers and the filter.

use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use super::operation::{OperationKind, OperationTracker, StartOutcome};
use super::signals::{Signal, SignalBus, SignalKind, Subscription};
use crate::error::TransportError;
use crate::index::{OfflineCache, PackageStore};
use crate::logic::filter;
use crate::sources::{FetchResult, PackageSource};
use crate::state::{Filter, Package, PackageError};

/// Per-instance collection settings, fixed at construction.
#[derive(Clone, Debug)]
pub struct CollectionConfig {
    /// Query sent with registry searches; empty lists everything.
    pub search_query: String,
    /// Write the store through the offline cache after server merges that changed it.
    pub save_offline_cache: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            save_offline_cache: true,
        }
    }
}

/// A finished transport call routed back to the owning task.
#[derive(Debug)]
pub struct Completion {
    /// Operation that finished.
    pub kind: OperationKind,
    /// Generation the request was started with.
    pub generation: u64,
    /// Transport result.
    pub outcome: FetchResult,
}

/// What: Reconcile list, search and offline-cache fetches into one filtered view.
///
/// Inputs:
/// - Transport and offline-cache collaborators plus a [`CollectionConfig`].
///
/// Output:
/// - Signals on [`Collection::bus`] for every meaningful state transition.
///
/// Details:
/// - Fetches run as spawned tokio tasks; their completions come back over an
///   mpsc channel and are applied one at a time by whoever owns the
///   collection (`process_completion`), so the store needs no locking.
/// - Fetch entry points must be called from within a tokio runtime.
pub struct Collection {
    /// Authoritative merged store.
    store: PackageStore,
    /// Active view criteria.
    filter: Filter,
    /// Last computed view.
    view: Arc<[Package]>,
    /// Remote list tracker.
    list: OperationTracker,
    /// Offline cache tracker.
    list_offline: OperationTracker,
    /// Registry search tracker.
    search: OperationTracker,
    /// Time of the last successful server merge.
    last_update_time: Option<DateTime<Local>>,
    /// Whether any current start has completed (successfully or not).
    loaded_once: bool,
    /// Transport collaborator.
    source: Arc<dyn PackageSource>,
    /// Offline cache collaborator.
    offline_cache: Arc<dyn OfflineCache>,
    /// Settings.
    config: CollectionConfig,
    /// Observer bus.
    bus: SignalBus,
    /// Completion channel (sender cloned into every spawned fetch).
    completion_tx: mpsc::UnboundedSender<Completion>,
    /// Completion channel (receiving side).
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Collection {
    /// What: Build an empty collection.
    ///
    /// Details:
    /// - Nothing is fetched yet; the owner decides when to hydrate from the
    ///   offline cache and when to hit the network.
    pub fn new(
        source: Arc<dyn PackageSource>,
        offline_cache: Arc<dyn OfflineCache>,
        config: CollectionConfig,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            store: PackageStore::new(),
            filter: Filter::default(),
            view: Arc::from(Vec::new()),
            list: OperationTracker::new(OperationKind::List),
            list_offline: OperationTracker::new(OperationKind::ListOffline),
            search: OperationTracker::new(OperationKind::Search),
            last_update_time: None,
            loaded_once: false,
            source,
            offline_cache,
            config,
            bus: SignalBus::new(),
            completion_tx,
            completion_rx,
        }
    }

    /// Observer bus of this collection.
    #[must_use]
    pub const fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Shorthand for `bus().subscribe(kinds)`.
    #[must_use]
    pub fn subscribe(&self, kinds: &[SignalKind]) -> (Subscription, mpsc::UnboundedReceiver<Signal>) {
        self.bus.subscribe(kinds)
    }

    /// Authoritative store (read-only).
    #[must_use]
    pub const fn store(&self) -> &PackageStore {
        &self.store
    }

    /// Active filter.
    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Current displayed view.
    #[must_use]
    pub fn packages(&self) -> Arc<[Package]> {
        Arc::clone(&self.view)
    }

    /// Whether the store holds any package.
    #[must_use]
    pub fn has_packages(&self) -> bool {
        !self.store.is_empty()
    }

    /// Whether at least one fetch has completed since construction.
    #[must_use]
    pub const fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    /// Time of the last successful server merge.
    #[must_use]
    pub const fn last_update_time(&self) -> Option<DateTime<Local>> {
        self.last_update_time
    }

    /// Tracker for `kind`.
    #[must_use]
    pub const fn tracker(&self, kind: OperationKind) -> &OperationTracker {
        match kind {
            OperationKind::List => &self.list,
            OperationKind::ListOffline => &self.list_offline,
            OperationKind::Search => &self.search,
        }
    }

    /// Mutable tracker for `kind`.
    const fn tracker_mut(&mut self, kind: OperationKind) -> &mut OperationTracker {
        match kind {
            OperationKind::List => &mut self.list,
            OperationKind::ListOffline => &mut self.list_offline,
            OperationKind::Search => &mut self.search,
        }
    }

    /// Whether `kind` is in flight.
    #[must_use]
    pub fn is_ongoing(&self, kind: OperationKind) -> bool {
        self.tracker(kind).is_ongoing()
    }

    /// Whether any operation is in flight.
    #[must_use]
    pub fn any_ongoing(&self) -> bool {
        OperationKind::ALL.iter().any(|&k| self.is_ongoing(k))
    }

    /// What: Replace the active filter.
    ///
    /// Output:
    /// - `true` when the filter differed; emits `FilterChanged` then `PackagesChanged`.
    pub fn set_filter(&mut self, filter: Filter) -> bool {
        if filter == self.filter {
            return false;
        }
        tracing::debug!(group = %filter.group, search = %filter.search_text, preview = filter.include_preview, "[Collection] filter changed");
        self.filter = filter;
        self.bus.publish(&Signal::FilterChanged(self.filter.clone()));
        self.refresh_view();
        self.emit_packages_changed();
        true
    }

    /// Fetch the remote package list.
    pub fn fetch_list_cache(&mut self, force: bool) -> StartOutcome {
        self.fetch(OperationKind::List, force)
    }

    /// Hydrate from the offline cache.
    pub fn fetch_list_offline_cache(&mut self, force: bool) -> StartOutcome {
        self.fetch(OperationKind::ListOffline, force)
    }

    /// Fetch registry search results.
    pub fn fetch_search_cache(&mut self, force: bool) -> StartOutcome {
        self.fetch(OperationKind::Search, force)
    }

    /// What: Start or join the operation for `kind`.
    ///
    /// Details:
    /// - Emits `OperationStateChanged(kind, true)` only when the tracker goes
    ///   from not-ongoing to ongoing; a forced restart keeps it ongoing.
    fn fetch(&mut self, kind: OperationKind, force: bool) -> StartOutcome {
        let was_ongoing = self.is_ongoing(kind);
        let outcome = self.tracker_mut(kind).start(force);
        if let StartOutcome::Started(generation) = outcome {
            tracing::info!(kind = %kind, generation, force, "[Collection] fetch started");
            if !was_ongoing {
                self.bus.publish(&Signal::OperationStateChanged {
                    kind,
                    ongoing: true,
                });
            }
            self.spawn_request(kind, generation);
        }
        outcome
    }

    /// Build the transport future for `kind`.
    fn request(&self, kind: OperationKind) -> BoxFuture<'static, FetchResult> {
        match kind {
            OperationKind::List => self.source.fetch_list(),
            OperationKind::Search => self.source.fetch_search(&self.config.search_query),
            OperationKind::ListOffline => {
                let cache = Arc::clone(&self.offline_cache);
                async move {
                    tokio::task::spawn_blocking(move || cache.load())
                        .await
                        .map_err(|e| TransportError::Worker(e.to_string()))?
                        .map_err(TransportError::from)
                }
                .boxed()
            }
        }
    }

    /// Run the request on the runtime and route its completion back.
    fn spawn_request(&self, kind: OperationKind, generation: u64) {
        let fut = self.request(kind);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = fut.await;
            let _ = tx.send(Completion {
                kind,
                generation,
                outcome,
            });
        });
    }

    /// Wait for the next completion of any spawned request.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// What: Apply every completion that has already arrived, without waiting.
    ///
    /// Output:
    /// - Number of completions processed (stale ones included).
    pub fn process_ready(&mut self) -> usize {
        let mut n = 0;
        while let Ok(c) = self.completion_rx.try_recv() {
            self.process_completion(c);
            n += 1;
        }
        n
    }

    /// What: Process completions until no operation is ongoing.
    ///
    /// Details:
    /// - A transport that never resolves keeps this pending; wrap it in a
    ///   timeout if that matters to the caller.
    pub async fn settle(&mut self) {
        while self.any_ongoing() {
            let Some(c) = self.next_completion().await else {
                break;
            };
            self.process_completion(c);
        }
    }

    /// What: Apply one completion.
    ///
    /// Inputs:
    /// - `completion`: Result of a spawned request.
    ///
    /// Details:
    /// - Stale completions (superseded by a forced start) are dropped silently.
    /// - Success: merge; emit `PackagesChanged` when the changed set is non-empty;
    ///   server sources advance the update time and may refresh the offline cache.
    /// - Failure: store untouched; the status observers learn about it through
    ///   `OperationFinished`.
    /// - Always ends with `OperationStateChanged(kind, false)` and `OperationFinished`.
    pub fn process_completion(&mut self, completion: Completion) {
        let Completion {
            kind,
            generation,
            outcome,
        } = completion;
        let Some(outcome) = self.tracker_mut(kind).finish(generation, outcome) else {
            return;
        };
        self.loaded_once = true;
        let error = match outcome {
            Ok(records) => {
                let received = records.len();
                let changed = self.store.merge(records);
                tracing::info!(
                    kind = %kind,
                    generation,
                    received,
                    changed = changed.len(),
                    total = self.store.len(),
                    "[Collection] fetch merged"
                );
                if !changed.is_empty() {
                    self.refresh_view();
                    self.emit_packages_changed();
                }
                if kind.is_server() {
                    let now = Local::now();
                    self.last_update_time = Some(now);
                    self.bus.publish(&Signal::UpdateTimeChanged(now));
                    if !changed.is_empty() && self.config.save_offline_cache {
                        self.save_offline_cache();
                    }
                }
                None
            }
            Err(e) => {
                tracing::warn!(kind = %kind, generation, error = %e, "[Collection] fetch failed");
                Some(e)
            }
        };
        self.bus.publish(&Signal::OperationStateChanged {
            kind,
            ongoing: false,
        });
        self.bus.publish(&Signal::OperationFinished { kind, error });
    }

    /// Write the store through the offline cache; failures are logged only.
    fn save_offline_cache(&self) {
        if let Err(e) = self.offline_cache.save(&self.store.records()) {
            tracing::warn!(error = %e, "[Persist] Failed to write offline cache");
        }
    }

    /// What: Recompute the view without a network round trip.
    ///
    /// Inputs:
    /// - `refetch_details`: Emit even when the view is unchanged so detail
    ///   panes re-read the selected package.
    ///
    /// Output:
    /// - `true` when `PackagesChanged` was emitted.
    pub fn update_package_collection(&mut self, refetch_details: bool) -> bool {
        let changed = self.refresh_view();
        if changed || refetch_details {
            self.emit_packages_changed();
            return true;
        }
        false
    }

    /// Re-emit `PackagesChanged` for the current view.
    pub fn trigger_packages_changed(&self) {
        self.emit_packages_changed();
    }

    /// What: Attach an error to a package and publish the updated view.
    ///
    /// Output:
    /// - `false` (and no signal) when the package is unknown.
    pub fn add_package_error(&mut self, name: &str, error: PackageError) -> bool {
        if !self.store.add_error(name, error) {
            tracing::warn!(package = name, "[Collection] error for unknown package ignored");
            return false;
        }
        self.refresh_view();
        self.emit_packages_changed();
        true
    }

    /// What: Clear all errors of a package and publish the updated view.
    ///
    /// Output:
    /// - `false` (and no signal) when there was nothing to clear.
    pub fn remove_package_errors(&mut self, name: &str) -> bool {
        if !self.store.remove_errors(name) {
            return false;
        }
        self.refresh_view();
        self.emit_packages_changed();
        true
    }

    /// What: Uninstall flow for local packages: drop the record entirely.
    ///
    /// Output:
    /// - `true` when the package existed; emits `PackagesChanged`.
    pub fn remove_package(&mut self, name: &str) -> bool {
        if self.store.remove(name).is_none() {
            return false;
        }
        tracing::info!(package = name, "[Collection] package removed");
        self.refresh_view();
        self.emit_packages_changed();
        true
    }

    /// Recompute the view; returns whether it differs from the previous one.
    fn refresh_view(&mut self) -> bool {
        let view: Arc<[Package]> = filter::apply(&self.store, &self.filter).into();
        let changed = *view != *self.view;
        self.view = view;
        changed
    }

    /// Publish the current view.
    fn emit_packages_changed(&self) {
        self.bus.publish(&Signal::PackagesChanged {
            filter: self.filter.clone(),
            packages: Arc::clone(&self.view),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::index::MemoryOfflineCache;
    use crate::state::PackageRecord;
    use crate::test_utils::{GatedSource, drain};

    fn collection(source: &Arc<GatedSource>) -> Collection {
        Collection::new(
            Arc::clone(source) as Arc<dyn PackageSource>,
            Arc::new(MemoryOfflineCache::default()),
            CollectionConfig::default(),
        )
    }

    async fn next(c: &mut Collection) -> Completion {
        tokio::time::timeout(Duration::from_secs(2), c.next_completion())
            .await
            .ok()
            .flatten()
            .expect("completion arrives")
    }

    #[tokio::test]
    /// What: Non-forced fetch while ongoing joins; forced restart discards the old result.
    ///
    /// Inputs:
    /// - `fetch_list_cache(false)` twice, then `fetch_list_cache(true)`.
    ///
    /// Output:
    /// - Two transport calls total; the first call's late result never reaches the store.
    async fn join_and_forced_restart() {
        let source = Arc::new(GatedSource::default());
        let mut c = collection(&source);

        assert_eq!(c.fetch_list_cache(false), StartOutcome::Started(1));
        assert_eq!(c.fetch_list_cache(false), StartOutcome::Joined);
        assert_eq!(source.list_calls(), 1);

        assert_eq!(c.fetch_list_cache(true), StartOutcome::Started(2));
        assert_eq!(source.list_calls(), 2);

        source.resolve_list(0, Ok(vec![PackageRecord::named("stale")]));
        let first = next(&mut c).await;
        c.process_completion(first);
        assert!(c.store().is_empty());
        assert!(c.is_ongoing(OperationKind::List));

        source.resolve_list(1, Ok(vec![PackageRecord::named("fresh")]));
        let second = next(&mut c).await;
        c.process_completion(second);
        assert!(c.store().contains("fresh"));
        assert!(!c.store().contains("stale"));
        assert!(!c.any_ongoing());
    }

    #[tokio::test]
    /// What: Re-delivering identical data does not re-emit `PackagesChanged`.
    ///
    /// Inputs:
    /// - Two list fetches resolving with the same records.
    ///
    /// Output:
    /// - Exactly one `PackagesChanged`; update time advances on both.
    async fn identical_merge_emits_once() {
        let source = Arc::new(GatedSource::default());
        let mut c = collection(&source);
        let (_sub, mut rx) = c.subscribe(&[SignalKind::PackagesChanged, SignalKind::UpdateTimeChanged]);

        for i in 0..2 {
            c.fetch_list_cache(false);
            source.resolve_list(i, Ok(vec![PackageRecord::named("a")]));
            c.settle().await;
        }
        let signals = drain(&mut rx);
        let packages_changed = signals
            .iter()
            .filter(|s| s.kind() == SignalKind::PackagesChanged)
            .count();
        let time_changed = signals
            .iter()
            .filter(|s| s.kind() == SignalKind::UpdateTimeChanged)
            .count();
        assert_eq!(packages_changed, 1);
        assert_eq!(time_changed, 2);
    }

    #[tokio::test]
    /// What: Offline hydration merges without advancing the update time.
    async fn offline_hydration_keeps_update_time() {
        let source = Arc::new(GatedSource::default());
        let cache = Arc::new(MemoryOfflineCache::with_records(vec![PackageRecord::named(
            "cached",
        )]));
        let mut c = Collection::new(
            Arc::clone(&source) as Arc<dyn PackageSource>,
            cache,
            CollectionConfig::default(),
        );
        c.fetch_list_offline_cache(false);
        c.settle().await;
        assert!(c.store().contains("cached"));
        assert!(c.last_update_time().is_none());
        assert!(c.has_loaded());
    }

    #[tokio::test]
    /// What: Transport failure leaves the store unchanged and reports the error.
    ///
    /// Output:
    /// - `OperationStateChanged(List, false)` then `OperationFinished` with the error.
    async fn failure_reports_and_keeps_store() {
        let source = Arc::new(GatedSource::default());
        let mut c = collection(&source);
        let (_sub, mut rx) = c.subscribe(&[
            SignalKind::OperationStateChanged,
            SignalKind::OperationFinished,
            SignalKind::PackagesChanged,
        ]);
        c.fetch_list_cache(false);
        source.resolve_list(0, Err(TransportError::Decode("bad".into())));
        c.settle().await;

        let signals = drain(&mut rx);
        assert!(matches!(
            signals.as_slice(),
            [
                Signal::OperationStateChanged { kind: OperationKind::List, ongoing: true },
                Signal::OperationStateChanged { kind: OperationKind::List, ongoing: false },
                Signal::OperationFinished { kind: OperationKind::List, error: Some(_) },
            ]
        ));
        assert!(c.store().is_empty());
        assert!(c.last_update_time().is_none());
    }

    #[tokio::test]
    /// What: Successful server merge writes through the offline cache.
    async fn server_merge_saves_offline_cache() {
        let source = Arc::new(GatedSource::default());
        let cache = Arc::new(MemoryOfflineCache::default());
        let mut c = Collection::new(
            Arc::clone(&source) as Arc<dyn PackageSource>,
            Arc::clone(&cache) as Arc<dyn OfflineCache>,
            CollectionConfig::default(),
        );
        c.fetch_search_cache(false);
        source.resolve_search(0, Ok(vec![PackageRecord::named("s")]));
        c.settle().await;
        let saved = cache.load().expect("load");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "s");
    }

    #[test]
    /// What: Setting the same filter twice emits once; a new filter emits both signals.
    fn set_filter_emits_on_change_only() {
        let source = Arc::new(GatedSource::default());
        let mut c = collection(&source);
        let (_sub, mut rx) = c.subscribe(&[SignalKind::FilterChanged, SignalKind::PackagesChanged]);
        let f = Filter {
            search_text: "x".into(),
            ..Filter::default()
        };
        assert!(c.set_filter(f.clone()));
        assert!(!c.set_filter(f));
        let kinds: Vec<SignalKind> = drain(&mut rx).iter().map(Signal::kind).collect();
        assert_eq!(kinds, vec![SignalKind::FilterChanged, SignalKind::PackagesChanged]);
    }
}
