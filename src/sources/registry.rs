//! HTTP package registry client backed by reqwest.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{FetchResult, PackageSource};
use crate::error::TransportError;
use crate::state::{InstallState, PackageOrigin, PackageRecord};
use crate::util::percent_encode;

/// Registry responses come either as a bare array or wrapped in `{"packages": [...]}`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RegistryResponse {
    /// Bare array.
    List(Vec<RegistryEntry>),
    /// Wrapped array.
    Wrapped {
        /// Entries.
        #[serde(default)]
        packages: Vec<RegistryEntry>,
    },
}

/// One package as the registry serves it.
#[derive(serde::Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RegistryEntry {
    /// Identity.
    name: String,
    /// Latest (display) version.
    version: String,
    /// Every published version.
    versions: Vec<String>,
    /// Display name.
    display_name: String,
    /// Description.
    description: String,
    /// Origin.
    origin: Option<PackageOrigin>,
    /// Explicit preview flag; derived from the version when absent.
    preview: Option<bool>,
    /// Install state, for list responses.
    install_state: Option<InstallState>,
}

impl From<RegistryEntry> for PackageRecord {
    fn from(e: RegistryEntry) -> Self {
        let preview = e
            .preview
            .unwrap_or_else(|| e.version.to_ascii_lowercase().contains("-preview"));
        Self {
            name: e.name,
            version: e.version,
            versions: e.versions,
            display_name: e.display_name,
            description: e.description,
            origin: e.origin.unwrap_or_default(),
            preview,
            install_state: e.install_state.unwrap_or_default(),
        }
    }
}

/// What: HTTP/JSON registry transport.
///
/// Details:
/// - `GET {base}/packages` lists installed and available packages.
/// - `GET {base}/search?q=<text>` searches the registry.
/// - Connection pooling comes from the shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpRegistry {
    /// Base URL without trailing slash.
    base_url: String,
    /// Pooled client.
    client: reqwest::Client,
}

impl HttpRegistry {
    /// What: Build a transport for `base_url`.
    ///
    /// # Errors
    /// Returns [`TransportError::Http`] when the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(30))
            .user_agent(format!("pkgcollection/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL of the list endpoint.
    #[must_use]
    pub fn list_url(&self) -> String {
        format!("{}/packages", self.base_url)
    }

    /// URL of the search endpoint for `query`.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.base_url, percent_encode(query.trim()))
    }
}

/// Fetch and decode one registry endpoint.
async fn get_records(client: reqwest::Client, url: String) -> FetchResult {
    tracing::debug!(url = %url, "[Registry] request");
    let resp = client.get(&url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            url,
            status: status.as_u16(),
        });
    }
    let body: RegistryResponse = resp.json().await?;
    let entries = match body {
        RegistryResponse::List(v) | RegistryResponse::Wrapped { packages: v } => v,
    };
    tracing::debug!(url = %url, count = entries.len(), "[Registry] response decoded");
    Ok(entries.into_iter().map(PackageRecord::from).collect())
}

impl PackageSource for HttpRegistry {
    fn fetch_list(&self) -> BoxFuture<'static, FetchResult> {
        get_records(self.client.clone(), self.list_url()).boxed()
    }

    fn fetch_search(&self, query: &str) -> BoxFuture<'static, FetchResult> {
        get_records(self.client.clone(), self.search_url(query)).boxed()
    }
}
