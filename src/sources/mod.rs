//! Transport collaborators: where fetched package lists come from.

use futures::future::BoxFuture;

use crate::error::TransportError;
use crate::state::PackageRecord;

/// HTTP registry client.
mod registry;

pub use registry::HttpRegistry;

/// Result type every transport call resolves to.
pub type FetchResult = Result<Vec<PackageRecord>, TransportError>;

/// What: Opaque asynchronous source of package lists.
///
/// Details:
/// - Each call returns an owned, `Send` future so the collection can spawn it
///   on the runtime and keep serving the UI while it is pending.
/// - Timeouts and retries, if any, belong to the implementation; the
///   collection never retries on its own.
pub trait PackageSource: Send + Sync {
    /// Installed and available packages for the current project.
    fn fetch_list(&self) -> BoxFuture<'static, FetchResult>;

    /// Registry search; an empty `query` lists everything the registry offers.
    fn fetch_search(&self, query: &str) -> BoxFuture<'static, FetchResult>;
}
