//! Headless package window: lifecycle, UI handlers and the event pump.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::collection::Collection;
use super::operation::{OperationKind, OperationState};
use super::registry::{FetchPolicy, WindowCommand, WindowHandle, WindowRegistry};
use super::status::StatusLine;
use crate::error::StoreError;
use crate::logic::SelectionManager;
use crate::prefs::{self, Preferences};
use crate::state::{Filter, Package, PackageError, PackageGroup};

/// Per-window settings.
#[derive(Clone, Debug, Default)]
pub struct WindowConfig {
    /// Skip the offline/list/search fetches normally started by `enable`.
    pub suppress_initial_fetch: bool,
    /// Where the window state (filter, selection) is persisted on `disable`.
    pub state_path: Option<PathBuf>,
}

/// State that survives closing and reopening the window.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WindowState {
    /// Filter active when the window was disabled.
    #[serde(default)]
    pub filter: Filter,
    /// Selected identity when the window was disabled.
    #[serde(default)]
    pub selected: Option<String>,
}

impl WindowState {
    /// What: Read persisted state from `path`.
    ///
    /// Output:
    /// - `Ok(None)` when nothing was persisted yet.
    ///
    /// # Errors
    /// Returns [`StoreError`] for unreadable files or malformed JSON.
    pub fn load(path: &Path) -> Result<Option<Self>, StoreError> {
        match fs::read_to_string(path) {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// What: Write the state to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns [`StoreError`] when serialisation or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// What: Window driving one [`Collection`] with its selection and status bar.
///
/// Inputs:
/// - The collection, a preferences store, window settings, and the registry
///   the window joins for cross-window refreshes.
///
/// Details:
/// - Observers (selection, status) consume collection signals lazily; every
///   public entry point syncs them before returning.
/// - Must be driven from within a tokio runtime once enabled.
pub struct PackageWindow {
    /// Core orchestrator.
    collection: Collection,
    /// Selected / pending identity.
    selection: SelectionManager,
    /// Status bar model.
    status: StatusLine,
    /// Last used filter storage.
    prefs: Box<dyn Preferences>,
    /// Settings.
    config: WindowConfig,
    /// Shared cross-window switches.
    policy: Arc<FetchPolicy>,
    /// Registry membership; dropped with the window.
    _handle: WindowHandle,
    /// Commands broadcast by the registry.
    commands: mpsc::UnboundedReceiver<WindowCommand>,
    /// Filter restored from window state, applied on the next `enable`.
    restored_filter: Option<Filter>,
    /// Whether the toolbar accepts input.
    toolbar_enabled: bool,
    /// Between `enable` and `disable`.
    enabled: bool,
}

impl PackageWindow {
    /// What: Create a fresh window; nothing is fetched until [`Self::enable`].
    pub fn new(
        collection: Collection,
        prefs: Box<dyn Preferences>,
        config: WindowConfig,
        registry: &WindowRegistry,
    ) -> Self {
        Self::with_selection(collection, prefs, config, registry, SelectionManager::new(), None)
    }

    /// What: Recreate a window from its persisted state.
    ///
    /// Details:
    /// - Filter and selection come from `config.state_path`; a missing or
    ///   unreadable state file yields a fresh window (the error is logged).
    pub fn restore(
        collection: Collection,
        prefs: Box<dyn Preferences>,
        config: WindowConfig,
        registry: &WindowRegistry,
    ) -> Self {
        let state = match config.state_path.as_deref().map(WindowState::load) {
            Some(Ok(state)) => state,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "[Window] failed to read window state");
                None
            }
            None => None,
        };
        let (filter, selected) = state.map_or((None, None), |s| (Some(s.filter), s.selected));
        tracing::info!(selected = ?selected, "[Window] restored");
        Self::with_selection(
            collection,
            prefs,
            config,
            registry,
            SelectionManager::restored(selected),
            filter,
        )
    }

    /// Shared constructor.
    fn with_selection(
        collection: Collection,
        prefs: Box<dyn Preferences>,
        config: WindowConfig,
        registry: &WindowRegistry,
        mut selection: SelectionManager,
        restored_filter: Option<Filter>,
    ) -> Self {
        selection.set_collection(&collection);
        let status = StatusLine::attach(&collection);
        let (handle, commands) = registry.register();
        Self {
            collection,
            selection,
            status,
            prefs,
            config,
            policy: Arc::clone(registry.policy()),
            _handle: handle,
            commands,
            restored_filter,
            toolbar_enabled: false,
            enabled: false,
        }
    }

    /// What: Bring the window on screen.
    ///
    /// Details:
    /// - Applies the restored or last used filter.
    /// - A reopened collection re-emits its view so details are re-read.
    /// - Unless suppressed, starts offline, list and search fetches; each
    ///   one forces a fresh start unless it is already ongoing, in which
    ///   case it joins.
    pub fn enable(&mut self) {
        let filter = self
            .restored_filter
            .take()
            .or_else(|| prefs::last_used_filter(self.prefs.as_ref()))
            .unwrap_or_default();
        self.collection.set_filter(filter);
        if self.collection.has_loaded() || self.collection.has_packages() {
            self.collection.update_package_collection(true);
        }
        self.toolbar_enabled = self.collection.has_packages();

        if self.config.suppress_initial_fetch {
            tracing::debug!("[Window] initial fetch suppressed");
        } else {
            let force = !self.collection.is_ongoing(OperationKind::ListOffline);
            self.collection.fetch_list_offline_cache(force);
            let force = !self.collection.is_ongoing(OperationKind::List);
            self.collection.fetch_list_cache(force);
            let force = !self.collection.is_ongoing(OperationKind::Search);
            self.collection.fetch_search_cache(force);
        }
        self.collection.trigger_packages_changed();
        self.enabled = true;
        self.sync();
        tracing::info!(toolbar = self.toolbar_enabled, "[Window] enabled");
    }

    /// What: Take the window off screen and persist what must survive.
    ///
    /// Details:
    /// - Writes the filter to preferences and the window state to
    ///   `state_path`; failures are logged and otherwise ignored.
    pub fn disable(&mut self) {
        self.sync();
        let filter = self.collection.filter().clone();
        if let Err(e) = prefs::set_last_used_filter(self.prefs.as_mut(), &filter) {
            tracing::warn!(error = %e, "[Window] failed to store last used filter");
        }
        if let Some(path) = &self.config.state_path {
            let state = WindowState {
                filter,
                selected: self.selection.selected().map(str::to_string),
            };
            if let Err(e) = state.save(path) {
                tracing::warn!(error = %e, path = %path.display(), "[Window] failed to save window state");
            }
        }
        self.enabled = false;
        tracing::info!("[Window] disabled");
    }

    /// User picked another group.
    pub fn on_filter_change(&mut self, group: PackageGroup) {
        let filter = Filter {
            group,
            ..self.collection.filter().clone()
        };
        self.collection.set_filter(filter);
        self.sync();
    }

    /// User edited the search box.
    pub fn on_search_change(&mut self, text: &str) {
        let filter = Filter {
            search_text: text.to_string(),
            ..self.collection.filter().clone()
        };
        self.collection.set_filter(filter);
        self.sync();
    }

    /// User toggled preview packages.
    pub fn on_toggle_preview(&mut self, include_preview: bool) {
        let filter = Filter {
            include_preview,
            ..self.collection.filter().clone()
        };
        self.collection.set_filter(filter);
        self.sync();
    }

    /// An install/remove operation on `name` failed with `message`.
    pub fn on_operation_error(&mut self, name: &str, message: &str) {
        self.collection
            .add_package_error(name, PackageError::new(name, message));
        self.sync();
    }

    /// User dismissed the errors shown for `name`.
    pub fn on_close_error(&mut self, name: &str) {
        self.collection.remove_package_errors(name);
        self.sync();
    }

    /// A package was uninstalled and must leave the list.
    pub fn on_package_removed(&mut self, name: &str) {
        self.collection.remove_package(name);
        self.sync();
    }

    /// What: Retry after the user fixed their connection.
    ///
    /// Details:
    /// - Forces both server fetches; late results of the previous attempts
    ///   are discarded.
    pub fn on_check_internet_reachability(&mut self) {
        self.collection.fetch_search_cache(true);
        self.collection.fetch_list_cache(true);
        self.sync();
    }

    /// User clicked a row (or cleared the selection).
    pub fn select(&mut self, name: Option<&str>) {
        self.sync();
        self.selection.set_selection(name);
    }

    /// What: Open the window focused on `name`.
    ///
    /// Details:
    /// - Re-allows all-window offline refreshes.
    /// - Selects immediately when `name` is displayed, otherwise remembers it
    ///   as pending until it shows up or loading ends.
    pub fn show_with_context(&mut self, name: &str) {
        self.policy.set_skip_fetch_for_all_windows(false);
        self.select(Some(name));
    }

    /// What: Wait for one completion or registry command and apply it.
    ///
    /// Output:
    /// - `false` once the command channel is closed and nothing is ongoing.
    ///
    /// Details:
    /// - Waits indefinitely while idle with an open registry.
    pub async fn pump(&mut self) -> bool {
        let idle = !self.collection.any_ongoing();
        tokio::select! {
            Some(c) = self.collection.next_completion(), if !idle => {
                self.collection.process_completion(c);
            }
            Some(cmd) = self.commands.recv() => self.handle_command(cmd),
            else => return false,
        }
        self.sync();
        true
    }

    /// What: Drive the window until no operation is ongoing.
    ///
    /// Details:
    /// - Registry commands queued in between are applied too.
    pub async fn settle(&mut self) {
        loop {
            self.process_commands();
            if !self.collection.any_ongoing() {
                break;
            }
            self.collection.settle().await;
        }
        self.sync();
    }

    /// Apply every registry command already queued.
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            self.handle_command(cmd);
        }
    }

    /// Apply one registry command.
    fn handle_command(&mut self, cmd: WindowCommand) {
        if !self.enabled {
            tracing::debug!(command = ?cmd, "[Window] command ignored while disabled");
            return;
        }
        match cmd {
            WindowCommand::RefreshOfflineCache => {
                self.collection.fetch_list_offline_cache(true);
            }
        }
    }

    /// Feed queued signals to the observers and update the toolbar.
    fn sync(&mut self) {
        self.selection.process_signals();
        self.status.process_signals();
        if !self.toolbar_enabled {
            let finished = [OperationKind::List, OperationKind::Search]
                .into_iter()
                .any(|k| {
                    matches!(
                        self.collection.tracker(k).state(),
                        OperationState::Completed | OperationState::Failed
                    )
                });
            if finished || self.collection.has_packages() {
                self.toolbar_enabled = true;
                tracing::debug!("[Window] toolbar enabled");
            }
        }
    }

    /// Underlying collection.
    #[must_use]
    pub const fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Displayed packages.
    #[must_use]
    pub fn packages(&self) -> Arc<[Package]> {
        self.collection.packages()
    }

    /// Selected identity.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selection.selected()
    }

    /// Identity waiting to be displayed.
    #[must_use]
    pub fn pending_selection(&self) -> Option<&str> {
        self.selection.pending()
    }

    /// Status bar text.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.status.text()
    }

    /// Whether the toolbar accepts input.
    #[must_use]
    pub const fn toolbar_enabled(&self) -> bool {
        self.toolbar_enabled
    }

    /// Whether the window is between `enable` and `disable`.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Preferences store (read-only).
    #[must_use]
    pub fn prefs(&self) -> &dyn Preferences {
        self.prefs.as_ref()
    }
}
