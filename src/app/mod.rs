//! Application layer: operation tracking, the signal bus, the collection
//! orchestrator and the headless window driving it.

/// Collection orchestrator.
mod collection;
/// Per-kind operation trackers.
mod operation;
/// Cross-window registry and fetch policy.
mod registry;
/// Typed publish/subscribe bus.
mod signals;
/// Status bar model.
mod status;
/// Window lifecycle and event pump.
mod window;

pub use collection::{Collection, CollectionConfig, Completion};
pub use operation::{OperationKind, OperationState, OperationTracker, StartOutcome};
pub use registry::{FetchPolicy, WindowCommand, WindowHandle, WindowRegistry};
pub use signals::{Signal, SignalBus, SignalKind, Subscription};
pub use status::StatusLine;
pub use window::{PackageWindow, WindowConfig, WindowState};
