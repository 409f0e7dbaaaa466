//! Status-bar model fed by collection signals.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use super::collection::Collection;
use super::operation::OperationKind;
use super::signals::{Signal, SignalKind, Subscription};
use crate::error::TransportError;

/// What: Text shown in the window's status bar.
///
/// Details:
/// - Only server operations (list, search) drive the loading and error
///   states; offline hydration is silent.
/// - Errors are kept per operation; only a later success of the same
///   operation clears its error.
#[derive(Debug, Default)]
pub struct StatusLine {
    /// Server operations in flight.
    loading: HashSet<OperationKind>,
    /// Errors of failed server operations, by operation.
    errors: BTreeMap<OperationKind, TransportError>,
    /// Last successful server merge.
    last_update: Option<DateTime<Local>>,
    /// Registration on the collection bus.
    _subscription: Option<Subscription>,
    /// Incoming signals.
    rx: Option<mpsc::UnboundedReceiver<Signal>>,
}

impl StatusLine {
    /// What: Observe `collection`, seeded from its current state.
    #[must_use]
    pub fn attach(collection: &Collection) -> Self {
        let (sub, rx) = collection.subscribe(&[
            SignalKind::OperationStateChanged,
            SignalKind::OperationFinished,
            SignalKind::UpdateTimeChanged,
        ]);
        Self {
            loading: OperationKind::ALL
                .into_iter()
                .filter(|k| k.is_server() && collection.is_ongoing(*k))
                .collect(),
            errors: BTreeMap::new(),
            last_update: collection.last_update_time(),
            _subscription: Some(sub),
            rx: Some(rx),
        }
    }

    /// What: React to one collection signal.
    pub fn handle(&mut self, signal: &Signal) {
        match signal {
            Signal::OperationStateChanged { kind, ongoing } if kind.is_server() => {
                if *ongoing {
                    self.loading.insert(*kind);
                } else {
                    self.loading.remove(kind);
                }
            }
            Signal::OperationFinished { kind, error } if kind.is_server() => match error {
                Some(e) => {
                    self.errors.insert(*kind, e.clone());
                }
                None => {
                    self.errors.remove(kind);
                }
            },
            Signal::UpdateTimeChanged(t) => self.last_update = Some(*t),
            _ => {}
        }
    }

    /// Apply every queued signal.
    pub fn process_signals(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        while let Ok(signal) = rx.try_recv() {
            self.handle(&signal);
        }
        self.rx = Some(rx);
    }

    /// Whether a server operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.loading.is_empty()
    }

    /// Error of a failed server operation that has not succeeded since.
    #[must_use]
    pub fn last_error(&self) -> Option<&TransportError> {
        self.errors.values().next()
    }

    /// What: Render the status text.
    ///
    /// Output:
    /// - Loading message, error message, last update time, or an empty string.
    #[must_use]
    pub fn text(&self) -> String {
        if self.is_loading() {
            return "Loading packages...".to_string();
        }
        if let Some(e) = self.last_error() {
            return format!("Cannot reach the package registry: {e}");
        }
        self.last_update
            .map(|t| format!("Last update {}", t.format("%H:%M")))
            .unwrap_or_default()
    }
}
