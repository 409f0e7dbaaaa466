//! Selection tracking that survives reloads, including a pending selection
//! for packages that have not arrived yet.

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::app::{Collection, OperationKind, Signal, SignalBus, SignalKind, Subscription};

/// What: Track the selected package identity across reloads.
///
/// Inputs:
/// - `PackagesChanged` and `OperationStateChanged` from the collection it is attached to.
///
/// Output:
/// - `SelectionChanged` on the collection's bus, once per actual change.
///
/// Details:
/// - A request for an identity that is not displayed yet is kept as *pending*
///   and resolved by the first view that contains it.
/// - A pending identity still missing once no operation is ongoing any more is
///   dropped silently.
/// - Selection is independent of the list contents until re-validated by
///   [`SelectionManager::trigger_new_selection`].
#[derive(Debug, Default)]
pub struct SelectionManager {
    /// Currently selected identity.
    selected: Option<String>,
    /// Requested identity waiting to appear in the view.
    pending: Option<String>,
    /// Identities of the last view seen; `None` before the first one.
    view_ids: Option<HashSet<String>>,
    /// Operations currently in flight.
    ongoing: HashSet<OperationKind>,
    /// Bus used to publish `SelectionChanged`.
    bus: Option<SignalBus>,
    /// Registration on the collection's bus.
    subscription: Option<Subscription>,
    /// Incoming collection signals.
    rx: Option<mpsc::UnboundedReceiver<Signal>>,
}

impl SelectionManager {
    /// Manager with nothing selected and no collection attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Seed the selection from persisted window state.
    ///
    /// Details:
    /// - No signal: observers are wired after restoration.
    /// - The identity is also kept pending, so it survives the empty views
    ///   published before the store is reloaded.
    #[must_use]
    pub fn restored(selected: Option<String>) -> Self {
        Self {
            pending: selected.clone(),
            selected,
            ..Self::default()
        }
    }

    /// What: Attach to `collection`, replacing any previous attachment.
    ///
    /// Details:
    /// - Subscribes to `PackagesChanged` and `OperationStateChanged`; the old
    ///   subscription is dropped (and thereby unsubscribed).
    /// - Seeds the view and the in-flight set from the collection's current state.
    pub fn set_collection(&mut self, collection: &Collection) {
        let (sub, rx) = collection.subscribe(&[
            SignalKind::PackagesChanged,
            SignalKind::OperationStateChanged,
        ]);
        self.subscription = Some(sub);
        self.rx = Some(rx);
        self.bus = Some(collection.bus().clone());
        self.ongoing = OperationKind::ALL
            .into_iter()
            .filter(|&k| collection.is_ongoing(k))
            .collect();
        if collection.has_loaded() || collection.has_packages() {
            self.view_ids = Some(collection.packages().iter().map(|p| p.name.clone()).collect());
        }
    }

    /// Selected identity.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Identity waiting to become available.
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Whether `name` is in the last view seen.
    fn in_view(&self, name: &str) -> bool {
        self.view_ids.as_ref().is_some_and(|ids| ids.contains(name))
    }

    /// What: Select `name`, or clear the selection with `None`.
    ///
    /// Details:
    /// - An identity not in the current view becomes pending; the current
    ///   selection is left as is until it resolves.
    pub fn set_selection(&mut self, name: Option<&str>) {
        match name {
            None => {
                self.pending = None;
                self.change_to(None);
            }
            Some(n) if self.in_view(n) => {
                self.pending = None;
                self.change_to(Some(n.to_string()));
            }
            Some(n) => {
                tracing::debug!(package = n, "[Selection] deferred until package is loaded");
                self.pending = Some(n.to_string());
            }
        }
    }

    /// What: Re-validate against the latest view.
    ///
    /// Details:
    /// - Resolves a pending identity that is now displayed.
    /// - Clears a selection whose identity is no longer displayed, unless it
    ///   is still pending.
    pub fn trigger_new_selection(&mut self) {
        if self.view_ids.is_none() {
            return;
        }
        if let Some(p) = self.pending.take() {
            if self.in_view(&p) {
                self.change_to(Some(p));
                return;
            }
            self.pending = Some(p);
        }
        if let Some(sel) = self.selected.as_deref()
            && !self.in_view(sel)
            && self.pending.as_deref() != Some(sel)
        {
            self.change_to(None);
        }
    }

    /// What: React to one collection signal.
    pub fn handle(&mut self, signal: &Signal) {
        match signal {
            Signal::PackagesChanged { packages, .. } => {
                self.view_ids = Some(packages.iter().map(|p| p.name.clone()).collect());
                self.trigger_new_selection();
            }
            Signal::OperationStateChanged { kind, ongoing } => {
                if *ongoing {
                    self.ongoing.insert(*kind);
                } else {
                    self.ongoing.remove(kind);
                    if self.ongoing.is_empty() {
                        self.drop_unresolved_pending();
                    }
                }
            }
            _ => {}
        }
    }

    /// What: Apply every collection signal queued since the last call.
    ///
    /// Output:
    /// - Number of signals handled.
    pub fn process_signals(&mut self) -> usize {
        let Some(mut rx) = self.rx.take() else {
            return 0;
        };
        let mut n = 0;
        while let Ok(signal) = rx.try_recv() {
            self.handle(&signal);
            n += 1;
        }
        self.rx = Some(rx);
        n
    }

    /// Loading finished: forget a pending identity that never showed up.
    fn drop_unresolved_pending(&mut self) {
        let Some(p) = self.pending.take() else {
            return;
        };
        if self.in_view(&p) {
            self.change_to(Some(p));
            return;
        }
        tracing::debug!(package = %p, "[Selection] pending selection never loaded; dropped");
        if self.selected.as_deref() == Some(p.as_str()) {
            self.change_to(None);
        }
    }

    /// Update the selection and publish when it actually changed.
    fn change_to(&mut self, next: Option<String>) {
        if next == self.selected {
            return;
        }
        self.selected = next;
        if let Some(bus) = &self.bus {
            bus.publish(&Signal::SelectionChanged(self.selected.clone()));
        }
    }
}
