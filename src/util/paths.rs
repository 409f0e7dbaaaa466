//! Per-user config and cache directory resolution honouring XDG variables.

use std::env;
use std::path::{Path, PathBuf};

/// Application directory name under the config base.
const APP_DIR: &str = "pkgcollection";

/// Resolve an XDG base directory from environment or default to `$HOME` + segments.
///
/// Inputs:
/// - `var`: Environment variable to check (e.g., `XDG_CONFIG_HOME`).
/// - `home_default`: Fallback path segments relative to `$HOME` if `var` is unset/empty.
///
/// Output: Resolved base directory path.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let mut base = PathBuf::from(home);
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

/// Return `$HOME/.config/pkgcollection`, ensuring it exists.
///
/// Output: `Some(PathBuf)` when HOME is set and directory can be created; `None` otherwise.
fn home_config_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        let dir = Path::new(&home).join(".config").join(APP_DIR);
        if std::fs::create_dir_all(&dir).is_ok() {
            return Some(dir);
        }
    }
    None
}

/// Config directory (ensured to exist).
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(dir) = home_config_dir() {
        return dir;
    }
    let base = xdg_base_dir("XDG_CONFIG_HOME", &[".config"]);
    let dir = base.join(APP_DIR);
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Logs directory under config: "$HOME/.config/pkgcollection/logs" (ensured to exist)
#[must_use]
pub fn logs_dir() -> PathBuf {
    let dir = config_dir().join("logs");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Cache directory: `$XDG_CACHE_HOME/pkgcollection` or `$HOME/.cache/pkgcollection` (ensured to exist)
#[must_use]
pub fn cache_dir() -> PathBuf {
    let dir = xdg_base_dir("XDG_CACHE_HOME", &[".cache"]).join(APP_DIR);
    let _ = std::fs::create_dir_all(&dir);
    dir
}

#[cfg(test)]
mod tests {
    #[test]
    /// What: Cache dir honours `XDG_CACHE_HOME` and is created on demand.
    fn cache_dir_uses_xdg_cache_home() {
        let _guard = crate::test_utils::env_lock();
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let orig = std::env::var_os("XDG_CACHE_HOME");
        unsafe { std::env::set_var("XDG_CACHE_HOME", tmp.path()) };
        let dir = super::cache_dir();
        assert!(dir.starts_with(tmp.path()));
        assert!(dir.ends_with("pkgcollection"));
        assert!(dir.is_dir());
        unsafe {
            if let Some(v) = orig {
                std::env::set_var("XDG_CACHE_HOME", v);
            } else {
                std::env::remove_var("XDG_CACHE_HOME");
            }
        }
    }
}
