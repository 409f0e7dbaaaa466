//! Value types shared across the crate.

/// Records, packages, filters and errors.
pub mod types;

pub use types::{
    ErrorSeverity, Filter, InstallState, Package, PackageError, PackageGroup, PackageMetadata,
    PackageOrigin, PackageRecord,
};
