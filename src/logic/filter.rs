//! Filter predicates and the derivation of the filtered view.

use crate::index::PackageStore;
use crate::state::{Filter, Package, PackageGroup, PackageOrigin};
use crate::util::contains_ignore_case;

/// What: Decide whether `pkg` belongs to `group`.
///
/// Details:
/// - `All` matches everything; `Installed` matches direct and dependency installs.
#[must_use]
pub fn matches_group(pkg: &Package, group: PackageGroup) -> bool {
    match group {
        PackageGroup::All => true,
        PackageGroup::Installed => pkg.is_installed(),
        PackageGroup::BuiltIn => pkg.metadata.origin == PackageOrigin::BuiltIn,
        PackageGroup::InDevelopment => pkg.metadata.origin == PackageOrigin::InDevelopment,
    }
}

/// What: Full predicate chain for one package.
///
/// Inputs:
/// - `pkg`: Candidate package.
/// - `filter`: Active criteria.
/// - `needle_lower`: `filter.search_text` trimmed and lower-cased once by the caller.
fn is_visible(pkg: &Package, filter: &Filter, needle_lower: &str) -> bool {
    matches_group(pkg, filter.group)
        && (filter.include_preview || !pkg.is_preview())
        && (contains_ignore_case(&pkg.name, needle_lower)
            || contains_ignore_case(pkg.display_name(), needle_lower))
}

/// What: Produce the displayed subset of `store` for `filter`.
///
/// Inputs:
/// - `store`: Authoritative package store.
/// - `filter`: Group, preview toggle and search text.
///
/// Output:
/// - Cloned packages that pass all predicates, ordered by display name
///   (case-insensitive) and then identity.
///
/// Details:
/// - Predicates run in order: group, preview inclusion, search text.
/// - Pure: no hidden state, so two calls with equal inputs return equal sequences.
#[must_use]
pub fn apply(store: &PackageStore, filter: &Filter) -> Vec<Package> {
    let needle = filter.search_text.trim().to_lowercase();
    let mut out: Vec<Package> = store
        .iter()
        .filter(|p| is_visible(p, filter, &needle))
        .cloned()
        .collect();
    out.sort_by(|a, b| {
        a.display_name()
            .to_lowercase()
            .cmp(&b.display_name().to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}
