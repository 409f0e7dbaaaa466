//! Command-line argument definition.

use std::path::PathBuf;

use clap::Parser;

use crate::state::PackageGroup;

/// pkgcollection - browse a package registry merged with the local offline cache
#[derive(Parser, Debug)]
#[command(name = "pkgcollection")]
#[command(version)]
#[command(about = "Browse a package registry merged with the local offline cache", long_about = None)]
pub struct Args {
    /// Base URL of the package registry
    #[arg(long, default_value = "http://localhost:8080")]
    pub registry: String,

    /// Offline cache file (default: ~/.cache/pkgcollection/packages.json)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Search text applied to the displayed list
    #[arg(short, long)]
    pub search: Option<String>,

    /// Package group to display (all, installed, built-in, in-development)
    #[arg(short, long, value_parser = parse_group)]
    pub group: Option<PackageGroup>,

    /// Include preview packages
    #[arg(long)]
    pub preview: bool,

    /// Open focused on this package
    #[arg(long)]
    pub select: Option<String>,

    /// Only read the offline cache; never contact the registry
    #[arg(long)]
    pub offline: bool,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// What: clap value parser for `--group`.
///
/// # Errors
/// Returns a message listing the accepted values.
pub fn parse_group(s: &str) -> Result<PackageGroup, String> {
    PackageGroup::from_config_key(s)
        .ok_or_else(|| format!("unknown group '{s}' (expected all, installed, built-in, in-development)"))
}
