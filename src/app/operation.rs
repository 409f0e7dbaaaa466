//! Operation tracker: one asynchronous fetch as a deduplicated, restartable unit.

use std::fmt;

/// The fetches a collection can run. One tracker exists per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    /// Remote "list installed/available" call.
    List,
    /// Local offline-cache hydration.
    ListOffline,
    /// Remote registry search.
    Search,
}

impl OperationKind {
    /// Every kind, in the order the collection reports them.
    pub const ALL: [Self; 3] = [Self::List, Self::ListOffline, Self::Search];

    /// Whether results come from a server (and therefore advance the update time).
    #[must_use]
    pub const fn is_server(self) -> bool {
        matches!(self, Self::List | Self::Search)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::ListOffline => "list-offline",
            Self::Search => "search",
        })
    }
}

/// Lifecycle of a tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperationState {
    /// Never started.
    #[default]
    Idle,
    /// A start is in flight.
    Ongoing,
    /// Last current start succeeded.
    Completed,
    /// Last current start failed.
    Failed,
}

/// Result of [`OperationTracker::start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new transport call must be issued, tagged with this generation.
    Started(u64),
    /// An operation is already ongoing; the caller will observe its completion.
    Joined,
}

/// What: State of one fetch kind with stale-completion detection.
///
/// Details:
/// - `generation` increases on every accepted start. A completion carrying an
///   older generation belongs to a superseded start and is discarded.
/// - Holds no I/O; the collection spawns the actual request.
#[derive(Clone, Debug)]
pub struct OperationTracker {
    /// Kind tracked.
    kind: OperationKind,
    /// Current state.
    state: OperationState,
    /// Generation of the latest accepted start (0 = never started).
    generation: u64,
}

impl OperationTracker {
    /// Idle tracker for `kind`.
    #[must_use]
    pub const fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            state: OperationState::Idle,
            generation: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> OperationState {
        self.state
    }

    /// Generation of the latest accepted start.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a start is in flight.
    #[must_use]
    pub fn is_ongoing(&self) -> bool {
        self.state == OperationState::Ongoing
    }

    /// What: Request a fetch.
    ///
    /// Inputs:
    /// - `force`: Start a fresh request even when one is ongoing.
    ///
    /// Output:
    /// - `Started(generation)` when the caller must issue a transport call;
    ///   `Joined` when an ongoing request will deliver the completion instead.
    ///
    /// Details:
    /// - Forcing supersedes the in-flight request cooperatively: it keeps
    ///   running but its completion will be reported stale by [`Self::finish`].
    pub fn start(&mut self, force: bool) -> StartOutcome {
        if self.is_ongoing() && !force {
            tracing::debug!(kind = %self.kind, generation = self.generation, "[Operation] joining ongoing request");
            return StartOutcome::Joined;
        }
        if self.is_ongoing() {
            tracing::debug!(kind = %self.kind, superseded = self.generation, "[Operation] superseding ongoing request");
        }
        self.generation += 1;
        self.state = OperationState::Ongoing;
        StartOutcome::Started(self.generation)
    }

    /// What: Accept or discard a completion.
    ///
    /// Inputs:
    /// - `generation`: Generation the completing request was started with.
    /// - `outcome`: Transport result.
    ///
    /// Output:
    /// - `Some(outcome)` for the current start (state moves to Completed/Failed);
    ///   `None` for a stale completion, leaving the state untouched.
    pub fn finish<T, E>(&mut self, generation: u64, outcome: Result<T, E>) -> Option<Result<T, E>> {
        if generation != self.generation || !self.is_ongoing() {
            tracing::debug!(
                kind = %self.kind,
                generation,
                current = self.generation,
                "[Operation] discarding stale completion"
            );
            return None;
        }
        self.state = if outcome.is_ok() {
            OperationState::Completed
        } else {
            OperationState::Failed
        };
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: A second non-forced start joins the ongoing one.
    ///
    /// Inputs:
    /// - `start(false)` twice on an idle tracker.
    ///
    /// Output:
    /// - First starts generation 1; second joins without bumping the generation.
    fn start_without_force_joins() {
        let mut t = OperationTracker::new(OperationKind::List);
        assert_eq!(t.start(false), StartOutcome::Started(1));
        assert_eq!(t.start(false), StartOutcome::Joined);
        assert_eq!(t.generation(), 1);
        assert!(t.is_ongoing());
    }

    #[test]
    /// What: Forcing supersedes; the old completion is stale, the new one accepted.
    ///
    /// Inputs:
    /// - `start(false)`, then `start(true)`, then completions for gen 1 and gen 2.
    ///
    /// Output:
    /// - Gen 1 discarded while the tracker stays ongoing; gen 2 completes it.
    fn forced_start_discards_previous_completion() {
        let mut t = OperationTracker::new(OperationKind::Search);
        assert_eq!(t.start(false), StartOutcome::Started(1));
        assert_eq!(t.start(true), StartOutcome::Started(2));

        assert!(t.finish::<u8, ()>(1, Ok(1)).is_none());
        assert!(t.is_ongoing());

        assert_eq!(t.finish::<u8, ()>(2, Ok(2)), Some(Ok(2)));
        assert_eq!(t.state(), OperationState::Completed);
    }

    #[test]
    /// What: Failures are returned as values and leave the tracker restartable.
    fn failure_is_a_value_and_restartable() {
        let mut t = OperationTracker::new(OperationKind::List);
        let StartOutcome::Started(g) = t.start(false) else {
            panic!("expected start");
        };
        assert_eq!(t.finish::<(), &str>(g, Err("offline")), Some(Err("offline")));
        assert_eq!(t.state(), OperationState::Failed);
        assert!(!t.is_ongoing());
        assert_eq!(t.start(false), StartOutcome::Started(g + 1));
    }

    #[test]
    /// What: A duplicate completion for an already finished generation is ignored.
    fn duplicate_completion_is_ignored() {
        let mut t = OperationTracker::new(OperationKind::ListOffline);
        let StartOutcome::Started(g) = t.start(true) else {
            panic!("expected start");
        };
        assert!(t.finish::<(), ()>(g, Ok(())).is_some());
        assert!(t.finish::<(), ()>(g, Ok(())).is_none());
    }
}
