//! Cross-window coordination: the shared fetch policy and the window registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

/// What: Process-wide fetch switches shared by every window.
///
/// Details:
/// - Injected as `Arc<FetchPolicy>`; there is no global instance.
#[derive(Debug, Default)]
pub struct FetchPolicy {
    /// When set, `WindowRegistry::fetch_offline_cache_for_all` is a no-op.
    skip_fetch_for_all_windows: AtomicBool,
}

impl FetchPolicy {
    /// Policy with nothing skipped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether all-window offline refreshes are currently suppressed.
    #[must_use]
    pub fn skip_fetch_for_all_windows(&self) -> bool {
        self.skip_fetch_for_all_windows.load(Ordering::Acquire)
    }

    /// Suppress or re-enable all-window offline refreshes.
    pub fn set_skip_fetch_for_all_windows(&self, skip: bool) {
        self.skip_fetch_for_all_windows.store(skip, Ordering::Release);
    }
}

/// Request sent to a registered window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowCommand {
    /// Re-read the offline cache, superseding any read already in flight.
    RefreshOfflineCache,
}

/// Shared registration table.
#[derive(Default)]
struct RegistryInner {
    /// Next registration id.
    next_id: u64,
    /// Live windows by registration id.
    windows: BTreeMap<u64, mpsc::UnboundedSender<WindowCommand>>,
}

/// What: Set of live windows that can be told to refresh together.
///
/// Details:
/// - Cloneable handle; registration returns a [`WindowHandle`] that
///   deregisters on drop.
#[derive(Clone, Default)]
pub struct WindowRegistry {
    /// Registration table.
    inner: Arc<Mutex<RegistryInner>>,
    /// Shared fetch switches.
    policy: Arc<FetchPolicy>,
}

impl WindowRegistry {
    /// Empty registry bound to `policy`.
    #[must_use]
    pub fn new(policy: Arc<FetchPolicy>) -> Self {
        Self {
            inner: Arc::default(),
            policy,
        }
    }

    /// Shared fetch policy.
    #[must_use]
    pub const fn policy(&self) -> &Arc<FetchPolicy> {
        &self.policy
    }

    /// What: Register a window.
    ///
    /// Output:
    /// - The deregistration handle and the command receiver for the window.
    #[must_use]
    pub fn register(&self) -> (WindowHandle, mpsc::UnboundedReceiver<WindowCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.lock().map_or(u64::MAX, |mut g| {
            let id = g.next_id;
            g.next_id += 1;
            g.windows.insert(id, tx);
            id
        });
        tracing::debug!(window = id, "[Registry] window registered");
        (
            WindowHandle {
                id,
                registry: Arc::downgrade(&self.inner),
            },
            rx,
        )
    }

    /// Number of registered windows.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.inner.lock().map_or(0, |g| g.windows.len())
    }

    /// What: Ask every registered window to re-read the offline cache.
    ///
    /// Output:
    /// - Number of windows the command reached; `0` when the policy skips.
    pub fn fetch_offline_cache_for_all(&self) -> usize {
        if self.policy.skip_fetch_for_all_windows() {
            tracing::debug!("[Registry] offline refresh for all windows skipped");
            return 0;
        }
        let Ok(mut g) = self.inner.lock() else {
            return 0;
        };
        g.windows
            .retain(|_, tx| tx.send(WindowCommand::RefreshOfflineCache).is_ok());
        tracing::info!(windows = g.windows.len(), "[Registry] offline refresh requested");
        g.windows.len()
    }
}

impl std::fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRegistry")
            .field("windows", &self.window_count())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Registration handle; dropping it removes the window from the registry.
#[must_use = "dropping the handle deregisters the window"]
pub struct WindowHandle {
    /// Registration id.
    id: u64,
    /// Registry the window is part of.
    registry: Weak<Mutex<RegistryInner>>,
}

impl Drop for WindowHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade()
            && let Ok(mut g) = inner.lock()
        {
            g.windows.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowHandle").field("id", &self.id).finish()
    }
}
