#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! This crate is the verbosity and diagnostics layer shared by the rest of
//! the dirstate-v2 workspace. It plays the same role `logging` plays for a
//! transfer tool's `--debug=FLAG[LEVEL]`/`--info=FLAG[LEVEL]` system, but the
//! flags name this crate's own subsystems: docket parsing, node decoding,
//! tree traversal, overlay bookkeeping, writer commits, status comparisons,
//! ignore hashing, and mmap lifecycle (see [`DebugFlag`] and [`InfoFlag`]).
//!
//! # Design
//!
//! Configuration lives in a thread-local cell rather than a process-global
//! static. Tests in this workspace call [`init`] to install a configuration
//! and then assert on emitted [`DiagnosticEvent`]s; a process-global would
//! make those assertions race under `cargo test`'s default parallel
//! execution. Production embedders that want cross-thread configuration can
//! call [`init`] once per worker thread with the same [`VerbosityConfig`].
//!
//! # Examples
//!
//! ```
//! use logging::{debug_log, drain_events, init, DebugFlag, VerbosityConfig};
//!
//! let mut config = VerbosityConfig::default();
//! config.debug.set(DebugFlag::Docket, 1);
//! init(config);
//!
//! debug_log!(DebugFlag::Docket, 1, "opened docket at generation {}", 7);
//! let events = drain_events();
//! assert_eq!(events.len(), 1);
//! ```

mod config;
mod event;
mod flags;
mod macros;

use std::cell::RefCell;

pub use config::{DebugConfig, InfoConfig, VerbosityConfig};
pub use event::DiagnosticEvent;
pub use flags::{DebugFlag, InfoFlag};

thread_local! {
    static CONFIG: RefCell<VerbosityConfig> = RefCell::new(VerbosityConfig::default());
    static EVENTS: RefCell<Vec<DiagnosticEvent>> = const { RefCell::new(Vec::new()) };
}

/// Installs `config` as the active verbosity configuration for the calling
/// thread and clears any previously queued events.
pub fn init(config: VerbosityConfig) {
    CONFIG.with(|cell| *cell.borrow_mut() = config);
    EVENTS.with(|cell| cell.borrow_mut().clear());
}

/// Returns `true` when `flag` is enabled at `level` or higher on the calling
/// thread.
#[must_use]
pub fn debug_gte(flag: DebugFlag, level: u8) -> bool {
    CONFIG.with(|cell| cell.borrow().debug.level(flag) >= level)
}

/// Returns `true` when `flag` is enabled at `level` or higher on the calling
/// thread.
#[must_use]
pub fn info_gte(flag: InfoFlag, level: u8) -> bool {
    CONFIG.with(|cell| cell.borrow().info.level(flag) >= level)
}

/// Applies a single `--debug`-style token (e.g. `"docket"` or `"docket2"`)
/// to the calling thread's active configuration.
///
/// # Errors
///
/// Returns an error describing the problem when the token is empty, names
/// an unknown flag, or has a malformed level suffix.
pub fn apply_debug_flag(token: &str) -> Result<(), String> {
    CONFIG.with(|cell| cell.borrow_mut().debug.apply_flag(token))
}

/// Applies a single `--info`-style token (e.g. `"commit"` or `"commit2"`)
/// to the calling thread's active configuration.
///
/// # Errors
///
/// Returns an error describing the problem when the token is empty, names
/// an unknown flag, or has a malformed level suffix.
pub fn apply_info_flag(token: &str) -> Result<(), String> {
    CONFIG.with(|cell| cell.borrow_mut().info.apply_flag(token))
}

/// Pushes `event` onto the calling thread's event queue.
///
/// Called by [`debug_log!`] and [`info_log!`]; exposed directly for
/// embedders that build their own log sites on top of [`debug_gte`] and
/// [`info_gte`].
pub fn push_event(event: DiagnosticEvent) {
    EVENTS.with(|cell| cell.borrow_mut().push(event));
}

/// Drains and returns every event queued on the calling thread since the
/// last [`init`] or [`drain_events`] call.
pub fn drain_events() -> Vec<DiagnosticEvent> {
    EVENTS.with(|cell| std::mem::take(&mut *cell.borrow_mut()))
}
