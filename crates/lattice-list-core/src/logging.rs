//! Logging and tracing facilities for Lattice List.
//!
//! Lattice List uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("lattice_list::mutation=debug")
//!         .init();
//! }
//! ```
//!
//! The constants in [`targets`] and [`span_names`] name every subsystem so
//! `EnvFilter` directives can select exactly the diagnostics of interest.

/// Span names used throughout Lattice List for tracing.
pub mod span_names {
    /// Full rebuild of the cumulative-offset index.
    pub const INDEX_REBUILD: &str = "lattice_list::index_rebuild";
    /// Application of a structured diff.
    pub const DIFF_APPLY: &str = "lattice_list::diff_apply";
    /// Filtering a provider against a constraint.
    pub const FILTER: &str = "lattice_list::filter";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Composition root and provider bookkeeping.
    pub const ADAPTER: &str = "lattice_list::adapter";
    /// Structural mutation pipeline.
    pub const MUTATION: &str = "lattice_list::mutation";
    /// Extension registry.
    pub const EXTENSION: &str = "lattice_list::extension";
    /// Selection state.
    pub const SELECTION: &str = "lattice_list::selection";
    /// Expand/collapse state.
    pub const EXPAND: &str = "lattice_list::expand";
    /// Click, long-click, and touch routing.
    pub const EVENT: &str = "lattice_list::event";
    /// Signal emission.
    pub const SIGNAL: &str = "lattice_list::signal";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "lattice_list::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level log under the mutation target.
#[macro_export]
macro_rules! list_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "lattice_list::mutation", $($arg)*)
    };
}

/// Debug-level log under the mutation target.
#[macro_export]
macro_rules! list_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "lattice_list::mutation", $($arg)*)
    };
}

/// Warn-level log under the mutation target.
#[macro_export]
macro_rules! list_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "lattice_list::mutation", $($arg)*)
    };
}
