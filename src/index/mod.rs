//! Authoritative package store, its merge algorithm and offline persistence.
//!
//! The store is owned by exactly one [`crate::app::Collection`]; observers only
//! ever see cloned snapshots produced by [`crate::logic::filter::apply`].

use std::collections::HashMap;

use crate::state::{Package, PackageError, PackageRecord};

/// Merge algorithm and changed-set reporting.
mod merge;
/// Offline cache collaborator.
mod persist;

pub use merge::{ChangedSet, metadata_precedence};
pub use persist::{JsonOfflineCache, MemoryOfflineCache, OfflineCache};

/// What: Mapping from package identity to its merged record.
///
/// Inputs:
/// - Populated only through [`PackageStore::merge`]; errors through
///   [`PackageStore::add_error`] / [`PackageStore::remove_errors`].
///
/// Output:
/// - Read via `get`, `iter` and `records`.
///
/// Details:
/// - `name_to_idx` is derived from `pkgs` and kept in sync on every insert and removal.
/// - Equality ignores insertion order so stores built by merges in different
///   orders compare equal when their contents match.
#[derive(Clone, Debug, Default)]
pub struct PackageStore {
    /// Entries in insertion order.
    pkgs: Vec<Package>,
    /// Identity to position in `pkgs`.
    name_to_idx: HashMap<String, usize>,
}

impl PackageStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pkgs.len()
    }

    /// Whether no package has been merged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pkgs.is_empty()
    }

    /// Whether `name` is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_idx.contains_key(name)
    }

    /// Look up one package by identity.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.name_to_idx.get(name).and_then(|&i| self.pkgs.get(i))
    }

    /// Mutable lookup, kept private so only store operations mutate entries.
    fn get_mut(&mut self, name: &str) -> Option<&mut Package> {
        let idx = *self.name_to_idx.get(name)?;
        self.pkgs.get_mut(idx)
    }

    /// Iterate over all packages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.pkgs.iter()
    }

    /// Insert a brand-new entry. Callers check `contains` first.
    fn insert_new(&mut self, pkg: Package) {
        self.name_to_idx.insert(pkg.name.clone(), self.pkgs.len());
        self.pkgs.push(pkg);
    }

    /// What: Rebuild `name_to_idx` from the current `pkgs` Vec.
    ///
    /// Details:
    /// - Called after removals, which shift positions.
    fn rebuild_name_index(&mut self) {
        self.name_to_idx.clear();
        self.name_to_idx.reserve(self.pkgs.len());
        for (i, pkg) in self.pkgs.iter().enumerate() {
            self.name_to_idx.insert(pkg.name.clone(), i);
        }
    }

    /// What: Append an error to a package.
    ///
    /// Inputs:
    /// - `name`: Package identity.
    /// - `error`: Error to attach; its `package` field is normalised to `name`.
    ///
    /// Output:
    /// - `true` when the package exists and the error was attached.
    pub fn add_error(&mut self, name: &str, mut error: PackageError) -> bool {
        let Some(pkg) = self.get_mut(name) else {
            return false;
        };
        error.package = pkg.name.clone();
        pkg.errors.push(error);
        true
    }

    /// What: Clear every error attached to `name`.
    ///
    /// Output:
    /// - `true` when at least one error was removed.
    pub fn remove_errors(&mut self, name: &str) -> bool {
        self.get_mut(name).is_some_and(|pkg| {
            let had = !pkg.errors.is_empty();
            pkg.errors.clear();
            had
        })
    }

    /// What: Drop a package entirely (uninstall of a local package).
    ///
    /// Output:
    /// - The removed entry, if it existed.
    pub fn remove(&mut self, name: &str) -> Option<Package> {
        let idx = self.name_to_idx.remove(name)?;
        let removed = self.pkgs.remove(idx);
        self.rebuild_name_index();
        Some(removed)
    }

    /// Snapshot the store as fetch records (errors are not persisted).
    #[must_use]
    pub fn records(&self) -> Vec<PackageRecord> {
        self.pkgs.iter().map(Package::to_record).collect()
    }
}

impl PartialEq for PackageStore {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .pkgs
                .iter()
                .all(|p| other.get(&p.name).is_some_and(|o| o == p))
    }
}

impl Eq for PackageStore {}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            ..PackageRecord::default()
        }
    }

    #[test]
    /// What: Removing a package keeps lookups for the remaining ones intact.
    ///
    /// Inputs:
    /// - Store with `a`, `b`, `c`; remove `a`.
    ///
    /// Output:
    /// - `b` and `c` still resolve via the name index; `a` is gone.
    fn remove_rebuilds_name_index() {
        let mut store = PackageStore::new();
        store.merge(vec![rec("a"), rec("b"), rec("c")]);
        assert!(store.remove("a").is_some());
        assert!(store.get("a").is_none());
        assert_eq!(store.get("b").map(|p| p.name.as_str()), Some("b"));
        assert_eq!(store.get("c").map(|p| p.name.as_str()), Some("c"));
        assert_eq!(store.len(), 2);
        assert!(store.remove("a").is_none());
    }

    #[test]
    /// What: Errors attach only to known packages and clear all at once.
    ///
    /// Inputs:
    /// - Two errors on `a`, one attempt on unknown `zz`.
    ///
    /// Output:
    /// - `a` carries both errors until `remove_errors`; unknown ids are rejected.
    fn errors_attach_and_clear() {
        let mut store = PackageStore::new();
        store.merge(vec![rec("a")]);
        assert!(store.add_error("a", PackageError::new("a", "install failed")));
        assert!(store.add_error("a", PackageError::new("other", "second")));
        assert!(!store.add_error("zz", PackageError::new("zz", "nope")));

        let errs = &store.get("a").expect("a present").errors;
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().all(|e| e.package == "a"));

        assert!(store.remove_errors("a"));
        assert!(!store.remove_errors("a"));
        assert!(store.get("a").expect("a present").errors.is_empty());
    }

    #[test]
    /// What: Store equality ignores insertion order.
    fn equality_is_order_insensitive() {
        let mut left = PackageStore::new();
        left.merge(vec![rec("a"), rec("b")]);
        let mut right = PackageStore::new();
        right.merge(vec![rec("b"), rec("a")]);
        assert_eq!(left, right);
    }
}
