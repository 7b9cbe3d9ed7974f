//! Core primitives for Lattice List.
//!
//! This crate provides the small set of building blocks the list engine is
//! assembled from:
//!
//! - **Signal/Slot System**: Type-safe, synchronous observer notifications
//! - **Logging**: Target and span names for `tracing` based diagnostics
//!
//! # Signal Example
//!
//! ```
//! use lattice_list_core::Signal;
//!
//! let inserted = Signal::<(usize, usize)>::new();
//!
//! let conn_id = inserted.connect(|(position, count)| {
//!     println!("{count} items inserted at {position}");
//! });
//!
//! inserted.emit((3, 2));
//! inserted.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
