//! Lattice-join merge of fetched records into the store.
//!
//! Versions are unioned, install state only rises, and metadata follows the
//! newest version; every merge reports the identities it changed.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::PackageStore;
use crate::state::{Package, PackageMetadata, PackageRecord};
use crate::util::compare_versions;

/// What: Identities whose visible fields changed during a merge.
///
/// Details:
/// - Empty when a merge only re-delivered data the store already had.
/// - Sorted, so logs and tests are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedSet {
    /// Changed identities.
    names: BTreeSet<String>,
}

impl ChangedSet {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of changed identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether `name` changed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Changed identities in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// What: Total order deciding which metadata wins when two sources disagree.
///
/// Inputs:
/// - `a`, `b`: Candidate metadata for the same identity.
///
/// Output:
/// - `Greater` when `a` should be displayed instead of `b`.
///
/// Details:
/// - Newer version wins; equal versions fall back to the derived `Ord` so the
///   choice never depends on which source arrived first.
#[must_use]
pub fn metadata_precedence(a: &PackageMetadata, b: &PackageMetadata) -> Ordering {
    compare_versions(&a.version, &b.version).then_with(|| a.cmp(b))
}

/// Join `incoming` into `existing`; returns whether a visible field changed.
fn join_into(existing: &mut Package, incoming: Package) -> bool {
    let mut changed = false;
    for v in incoming.versions {
        changed |= existing.versions.insert(v);
    }
    if incoming.install_state > existing.install_state {
        existing.install_state = incoming.install_state;
        changed = true;
    }
    if metadata_precedence(&incoming.metadata, &existing.metadata) == Ordering::Greater {
        existing.metadata = incoming.metadata;
        changed = true;
    }
    changed
}

impl PackageStore {
    /// What: Upsert fetched records by identity.
    ///
    /// Inputs:
    /// - `source`: Records from one fetch result, in any order.
    ///
    /// Output:
    /// - [`ChangedSet`] of identities inserted or visibly updated.
    ///
    /// Details:
    /// - Per identity the store keeps the join of every record seen: version
    ///   union, strongest install state, highest-precedence metadata. The join
    ///   is idempotent and commutative, so re-merging a result reports nothing
    ///   and completion order does not affect the final contents.
    /// - Attached errors are never touched.
    /// - Records with a blank identity are skipped.
    pub fn merge<I>(&mut self, source: I) -> ChangedSet
    where
        I: IntoIterator<Item = PackageRecord>,
    {
        let mut changed = ChangedSet::default();
        for rec in source {
            if rec.name.trim().is_empty() {
                tracing::debug!("[Store] skipping record without identity");
                continue;
            }
            let incoming = Package::from(rec);
            if let Some(existing) = self.get_mut(&incoming.name) {
                let name = incoming.name.clone();
                if join_into(existing, incoming) {
                    changed.names.insert(name);
                }
            } else {
                changed.names.insert(incoming.name.clone());
                self.insert_new(incoming);
            }
        }
        changed
    }
}
