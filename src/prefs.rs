//! Preferences collaborator: a small persisted key/value store.
//!
//! The file format follows the usual `settings.conf` conventions: one
//! `key = value` per line, `#` and `//` comments, keys normalised to
//! lower-case with `.`, `-` and spaces mapped to `_`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::state::{Filter, PackageGroup};
use crate::util::strip_inline_comment;

/// Key for the last used filter group.
pub const KEY_FILTER_GROUP: &str = "last_filter_group";
/// Key for the last used search text.
pub const KEY_FILTER_SEARCH: &str = "last_filter_search";
/// Key for the last used preview toggle.
pub const KEY_FILTER_PREVIEW: &str = "last_filter_include_preview";

/// Read/write key-value preferences.
pub trait Preferences: Send {
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Normalise a settings key.
fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(['.', '-', ' '], "_")
}

/// Parse a boolean settings value.
fn parse_bool(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// What: Read the last used filter.
///
/// Output:
/// - `None` when no group was ever stored; unparsable values fall back to defaults.
pub fn last_used_filter(prefs: &dyn Preferences) -> Option<Filter> {
    let group = prefs.get(KEY_FILTER_GROUP)?;
    Some(Filter {
        group: PackageGroup::from_config_key(&group).unwrap_or_default(),
        search_text: prefs.get(KEY_FILTER_SEARCH).unwrap_or_default(),
        include_preview: prefs
            .get(KEY_FILTER_PREVIEW)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false),
    })
}

/// What: Persist `filter` as the last used filter.
///
/// # Errors
/// Returns the first [`StoreError`] raised by the backing store.
pub fn set_last_used_filter(prefs: &mut dyn Preferences, filter: &Filter) -> Result<(), StoreError> {
    prefs.set(KEY_FILTER_GROUP, filter.group.as_config_key())?;
    prefs.set(KEY_FILTER_SEARCH, &filter.search_text)?;
    prefs.set(
        KEY_FILTER_PREVIEW,
        if filter.include_preview { "true" } else { "false" },
    )
}

/// In-memory preferences (tests, or when no config directory is available).
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferences {
    /// Stored values.
    values: BTreeMap<String, String>,
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&normalize_key(key)).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(normalize_key(key), value.to_string());
        Ok(())
    }
}

/// What: `settings.conf` backed preferences.
///
/// Details:
/// - Loaded once on construction; every `set` rewrites the file, keeping
///   keys sorted so the output is stable.
/// - Unknown keys already present in the file are preserved.
#[derive(Clone, Debug)]
pub struct FilePreferences {
    /// Backing file.
    path: PathBuf,
    /// Parsed values.
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// What: Load preferences from `path`; a missing or unreadable file yields an empty set.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut values = BTreeMap::new();
        if let Ok(content) = fs::read_to_string(&path) {
            for line in content.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
                    continue;
                }
                let Some((raw_key, raw_val)) = trimmed.split_once('=') else {
                    continue;
                };
                values.insert(
                    normalize_key(raw_key),
                    strip_inline_comment(raw_val.trim()).to_string(),
                );
            }
        } else {
            tracing::debug!(path = %path.display(), "[Prefs] no settings file yet");
        }
        Self { path, values }
    }

    /// Default location: `<config>/settings.conf`.
    #[must_use]
    pub fn default_location() -> Self {
        Self::load(crate::util::config_dir().join("settings.conf"))
    }

    /// Rewrite the backing file from `values`.
    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut body = String::from("# pkgcollection preferences\n");
        for (k, v) in &self.values {
            body.push_str(k);
            body.push_str(" = ");
            body.push_str(v);
            body.push('\n');
        }
        fs::write(&self.path, body)?;
        Ok(())
    }
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&normalize_key(key)).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(normalize_key(key), value.trim().to_string());
        self.flush()
    }
}
