//! pkgcollection binary: opens one headless package window, loads it and
//! prints the resulting view.

use std::fmt;
use std::sync::{Arc, OnceLock};

use clap::Parser;
use pkgcollection::app::{
    Collection, CollectionConfig, FetchPolicy, PackageWindow, WindowConfig, WindowRegistry,
};
use pkgcollection::args::Args;
use pkgcollection::error::TransportError;
use pkgcollection::index::{JsonOfflineCache, OfflineCache};
use pkgcollection::prefs::FilePreferences;
use pkgcollection::sources::{HttpRegistry, PackageSource};
use pkgcollection::util;

/// Log line timestamp in local time.
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        w.write_str(&chrono::Local::now().format("%Y-%m-%d-T %H:%M:%S").to_string())
    }
}

/// Keeps the non-blocking log writer flushing for the whole process.
static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// What: Initialise tracing to `<config>/logs/pkgcollection.log`, or stderr on failure.
///
/// Inputs:
/// - `level`: Default filter when `RUST_LOG` is unset.
fn init_logging(level: &str) {
    let log_path = util::logs_dir().join("pkgcollection.log");
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(LocalTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

/// What: Build the window from `args`, load it, print the view and close it.
///
/// # Errors
/// Returns [`TransportError`] when the registry client cannot be built.
async fn run(args: Args) -> Result<(), TransportError> {
    let source: Arc<dyn PackageSource> = Arc::new(HttpRegistry::new(&args.registry)?);
    let cache: Arc<dyn OfflineCache> = Arc::new(
        args.cache
            .clone()
            .map_or_else(JsonOfflineCache::default_location, JsonOfflineCache::new),
    );
    let collection = Collection::new(
        source,
        cache,
        CollectionConfig {
            search_query: String::new(),
            save_offline_cache: !args.offline,
        },
    );
    let registry = WindowRegistry::new(Arc::new(FetchPolicy::new()));
    let mut window = PackageWindow::restore(
        collection,
        Box::new(FilePreferences::default_location()),
        WindowConfig {
            suppress_initial_fetch: args.offline,
            state_path: Some(util::config_dir().join("window.json")),
        },
        &registry,
    );

    window.enable();
    if args.offline {
        registry.fetch_offline_cache_for_all();
    }
    if let Some(group) = args.group {
        window.on_filter_change(group);
    }
    if let Some(text) = &args.search {
        window.on_search_change(text);
    }
    if args.preview {
        window.on_toggle_preview(true);
    }
    if let Some(name) = &args.select {
        window.show_with_context(name);
    }
    window.settle().await;

    for pkg in window.packages().iter() {
        let marker = if window.selected() == Some(pkg.name.as_str()) {
            '>'
        } else {
            ' '
        };
        println!(
            "{marker} {:<40} {:<16} {}",
            pkg.name,
            pkg.metadata.version,
            pkg.display_name()
        );
        for err in &pkg.errors {
            println!("    ! {}", err.message);
        }
    }
    let status = window.status_text();
    if !status.is_empty() {
        println!("{status}");
    }
    window.disable();
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);
    tracing::info!(registry = %args.registry, offline = args.offline, "pkgcollection starting");
    if let Err(err) = run(args).await {
        tracing::error!(error = %err, "Application error");
        eprintln!("pkgcollection: {err}");
        std::process::exit(1);
    }
    tracing::info!("pkgcollection exited");
}
