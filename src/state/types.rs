//! Core value types shared by the store, filter, selection and signals.

use std::collections::BTreeSet;
use std::fmt;

/// Where a package comes from.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PackageOrigin {
    /// Published on the remote registry.
    #[default]
    Registry,
    /// Shipped with the editor itself.
    BuiltIn,
    /// Local package under development (embedded or path-referenced).
    InDevelopment,
}

/// Installation state of a package in the current project.
///
/// The derived ordering is used by the merge join: `Installed` wins over
/// `InstalledAsDependency`, which wins over `NotInstalled`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    /// Available but not part of the project.
    #[default]
    NotInstalled,
    /// Pulled in by another package.
    InstalledAsDependency,
    /// Explicitly installed.
    Installed,
}

/// Category used by the toolbar filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageGroup {
    /// Every known package.
    #[default]
    All,
    /// Packages installed directly or as a dependency.
    Installed,
    /// Packages bundled with the editor.
    BuiltIn,
    /// Local packages under development.
    InDevelopment,
}

impl PackageGroup {
    /// Return the string key used in settings files for this group.
    #[must_use]
    pub const fn as_config_key(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Installed => "installed",
            Self::BuiltIn => "built_in",
            Self::InDevelopment => "in_development",
        }
    }

    /// Parse a group from its settings key (case-insensitive, `-`/`_` agnostic).
    #[must_use]
    pub fn from_config_key(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" => Some(Self::All),
            "installed" | "local" => Some(Self::Installed),
            "built_in" | "builtin" | "modules" => Some(Self::BuiltIn),
            "in_development" | "indevelopment" | "dev" => Some(Self::InDevelopment),
            _ => None,
        }
    }
}

impl fmt::Display for PackageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_config_key())
    }
}

/// Active view criteria applied to the package store.
///
/// Replacing the filter on a collection emits `FilterChanged`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Filter {
    /// Category restriction.
    #[serde(default)]
    pub group: PackageGroup,
    /// Case-insensitive substring matched against name and display name.
    #[serde(default)]
    pub search_text: String,
    /// Whether preview-only packages are shown.
    #[serde(default)]
    pub include_preview: bool,
}

/// Severity attached to a [`PackageError`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Informational problem; the package is still usable.
    Warning,
    /// Operation on the package failed.
    #[default]
    Error,
}

/// A semantic error tied to one package (e.g. a failed install).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PackageError {
    /// Identity of the package the error belongs to.
    pub package: String,
    /// Human-readable message shown in the details view.
    pub message: String,
    /// Severity.
    #[serde(default)]
    pub severity: ErrorSeverity,
}

impl PackageError {
    /// Build an `Error`-severity entry for `package`.
    pub fn new(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
        }
    }
}

/// One package as delivered by a fetch (registry list, search or offline cache).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PackageRecord {
    /// Unique identity, e.g. `com.example.tween`.
    pub name: String,
    /// Version the metadata below describes (usually the latest).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Every version the source knows about.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    /// Name shown in lists; falls back to `name` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Short description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Origin of the package.
    #[serde(default)]
    pub origin: PackageOrigin,
    /// Preview-only package (hidden unless the filter includes previews).
    #[serde(default)]
    pub preview: bool,
    /// Installation state reported by the source.
    #[serde(default)]
    pub install_state: InstallState,
}

impl PackageRecord {
    /// Minimal record carrying only an identity; handy for tests and fixtures.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Display metadata of a package, tagged with the version it describes.
///
/// The derived `Ord` is the tie-break used when two sources disagree on
/// metadata for the same version string; see `index::merge`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PackageMetadata {
    /// Version this metadata was published with.
    pub version: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Origin.
    pub origin: PackageOrigin,
    /// Preview-only flag.
    pub preview: bool,
}

/// Authoritative store entry for one package.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Package {
    /// Unique identity.
    pub name: String,
    /// Winning display metadata.
    pub metadata: PackageMetadata,
    /// Union of all versions seen across sources.
    pub versions: BTreeSet<String>,
    /// Strongest installation state seen across sources.
    pub install_state: InstallState,
    /// Attached errors, oldest first. Only cleared explicitly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PackageError>,
}

impl Package {
    /// Name used for display and ordering.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.metadata.display_name.is_empty() {
            &self.name
        } else {
            &self.metadata.display_name
        }
    }

    /// Whether the package is only available as a preview.
    #[must_use]
    pub const fn is_preview(&self) -> bool {
        self.metadata.preview
    }

    /// Whether any version is installed in the project.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.install_state != InstallState::NotInstalled
    }

    /// Compare everything observers render, ignoring errors.
    #[must_use]
    pub fn same_visible_fields(&self, other: &Self) -> bool {
        self.name == other.name
            && self.metadata == other.metadata
            && self.versions == other.versions
            && self.install_state == other.install_state
    }

    /// Project the entry back into a record for the offline cache.
    #[must_use]
    pub fn to_record(&self) -> PackageRecord {
        PackageRecord {
            name: self.name.clone(),
            version: self.metadata.version.clone(),
            versions: self.versions.iter().cloned().collect(),
            display_name: self.metadata.display_name.clone(),
            description: self.metadata.description.clone(),
            origin: self.metadata.origin,
            preview: self.metadata.preview,
            install_state: self.install_state,
        }
    }
}

impl From<PackageRecord> for Package {
    fn from(rec: PackageRecord) -> Self {
        let mut versions: BTreeSet<String> = rec.versions.into_iter().collect();
        if !rec.version.is_empty() {
            versions.insert(rec.version.clone());
        }
        Self {
            name: rec.name,
            metadata: PackageMetadata {
                version: rec.version,
                display_name: rec.display_name,
                description: rec.description,
                origin: rec.origin,
                preview: rec.preview,
            },
            versions,
            install_state: rec.install_state,
            errors: Vec::new(),
        }
    }
}
