//! Typed publish/subscribe bus connecting the collection to its observers.
//!
//! Observers register for the signal kinds they care about and receive them on
//! an unbounded channel. Registration returns a [`Subscription`]; dropping it
//! (or calling [`Subscription::unsubscribe`]) removes the observer, so a closed
//! window never leaves a dangling listener behind.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use super::operation::OperationKind;
use crate::error::TransportError;
use crate::state::{Filter, Package};

/// Discriminant used when subscribing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// See [`Signal::PackagesChanged`].
    PackagesChanged,
    /// See [`Signal::FilterChanged`].
    FilterChanged,
    /// See [`Signal::SelectionChanged`].
    SelectionChanged,
    /// See [`Signal::UpdateTimeChanged`].
    UpdateTimeChanged,
    /// See [`Signal::OperationStateChanged`].
    OperationStateChanged,
    /// See [`Signal::OperationFinished`].
    OperationFinished,
}

impl SignalKind {
    /// Every kind, for observers that want the full stream.
    pub const ALL: [Self; 6] = [
        Self::PackagesChanged,
        Self::FilterChanged,
        Self::SelectionChanged,
        Self::UpdateTimeChanged,
        Self::OperationStateChanged,
        Self::OperationFinished,
    ];
}

/// A state transition published to observers.
#[derive(Clone, Debug)]
pub enum Signal {
    /// The displayed view was recomputed.
    PackagesChanged {
        /// Filter the view was computed with.
        filter: Filter,
        /// Read-only displayed packages, in display order.
        packages: Arc<[Package]>,
    },
    /// The active filter was replaced.
    FilterChanged(Filter),
    /// The selected identity changed.
    SelectionChanged(Option<String>),
    /// A server merge succeeded at this time.
    UpdateTimeChanged(DateTime<Local>),
    /// A tracker entered or left the Ongoing state.
    OperationStateChanged {
        /// Which operation.
        kind: OperationKind,
        /// New ongoing flag.
        ongoing: bool,
    },
    /// The current start of an operation completed.
    OperationFinished {
        /// Which operation.
        kind: OperationKind,
        /// `None` on success.
        error: Option<TransportError>,
    },
}

impl Signal {
    /// Kind of this signal.
    #[must_use]
    pub const fn kind(&self) -> SignalKind {
        match self {
            Self::PackagesChanged { .. } => SignalKind::PackagesChanged,
            Self::FilterChanged(_) => SignalKind::FilterChanged,
            Self::SelectionChanged(_) => SignalKind::SelectionChanged,
            Self::UpdateTimeChanged(_) => SignalKind::UpdateTimeChanged,
            Self::OperationStateChanged { .. } => SignalKind::OperationStateChanged,
            Self::OperationFinished { .. } => SignalKind::OperationFinished,
        }
    }
}

/// One registered observer.
struct Subscriber {
    /// Kinds forwarded to this observer.
    kinds: Vec<SignalKind>,
    /// Delivery channel.
    tx: mpsc::UnboundedSender<Signal>,
}

/// Shared registration table.
#[derive(Default)]
struct BusInner {
    /// Next registration id.
    next_id: u64,
    /// Live observers by registration id (ordered for deterministic delivery).
    subscribers: BTreeMap<u64, Subscriber>,
}

/// Cloneable handle to a signal bus.
#[derive(Clone, Default)]
pub struct SignalBus {
    /// Registration table shared by all handles.
    inner: Arc<Mutex<BusInner>>,
}

impl SignalBus {
    /// Fresh bus with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Register an observer for `kinds`.
    ///
    /// Output:
    /// - The unsubscribe handle and the receiving end of the observer's channel.
    ///
    /// Details:
    /// - Signals are only delivered while the handle is alive.
    #[must_use]
    pub fn subscribe(&self, kinds: &[SignalKind]) -> (Subscription, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.lock().map_or(u64::MAX, |mut g| {
            let id = g.next_id;
            g.next_id += 1;
            g.subscribers.insert(
                id,
                Subscriber {
                    kinds: kinds.to_vec(),
                    tx,
                },
            );
            id
        });
        (
            Subscription {
                id,
                bus: Arc::downgrade(&self.inner),
            },
            rx,
        )
    }

    /// What: Deliver `signal` to every observer registered for its kind.
    ///
    /// Details:
    /// - Observers whose receiver was dropped are pruned.
    pub fn publish(&self, signal: &Signal) {
        let kind = signal.kind();
        let Ok(mut g) = self.inner.lock() else {
            return;
        };
        g.subscribers.retain(|_, s| {
            if s.kinds.contains(&kind) {
                s.tx.send(signal.clone()).is_ok()
            } else {
                !s.tx.is_closed()
            }
        });
    }

    /// Number of live observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map_or(0, |g| g.subscribers.len())
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Unsubscribe handle returned by [`SignalBus::subscribe`].
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    /// Registration id.
    id: u64,
    /// Bus the observer is registered on.
    bus: Weak<Mutex<BusInner>>,
}

impl Subscription {
    /// Stop receiving signals.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade()
            && let Ok(mut g) = inner.lock()
        {
            g.subscribers.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Observers only see the kinds they registered for.
    ///
    /// Inputs:
    /// - One observer for `FilterChanged`, one for everything.
    ///
    /// Output:
    /// - A selection signal reaches only the catch-all observer.
    fn delivery_is_keyed_by_kind() {
        let bus = SignalBus::new();
        let (_filter_sub, mut filter_rx) = bus.subscribe(&[SignalKind::FilterChanged]);
        let (_all_sub, mut all_rx) = bus.subscribe(&SignalKind::ALL);

        bus.publish(&Signal::SelectionChanged(Some("a".into())));
        bus.publish(&Signal::FilterChanged(Filter::default()));

        assert!(matches!(filter_rx.try_recv(), Ok(Signal::FilterChanged(_))));
        assert!(filter_rx.try_recv().is_err());
        assert!(matches!(all_rx.try_recv(), Ok(Signal::SelectionChanged(Some(_)))));
        assert!(matches!(all_rx.try_recv(), Ok(Signal::FilterChanged(_))));
    }

    #[test]
    /// What: Dropping or explicitly unsubscribing removes the observer.
    fn unsubscribe_removes_observer() {
        let bus = SignalBus::new();
        let (sub_a, _rx_a) = bus.subscribe(&[SignalKind::FilterChanged]);
        let (sub_b, mut rx_b) = bus.subscribe(&[SignalKind::FilterChanged]);
        assert_eq!(bus.subscriber_count(), 2);

        sub_a.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(sub_b);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(&Signal::FilterChanged(Filter::default()));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    /// What: Observers whose receiver is gone are pruned on the next publish.
    fn closed_receivers_are_pruned() {
        let bus = SignalBus::new();
        let (_sub, rx) = bus.subscribe(&[SignalKind::FilterChanged]);
        drop(rx);
        bus.publish(&Signal::FilterChanged(Filter::default()));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
