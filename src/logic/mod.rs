//! Pure view logic (filter evaluation) and selection tracking.

/// Filter predicates and view derivation.
pub mod filter;
/// Selected and pending package tracking.
pub mod selection;

pub use selection::SelectionManager;
