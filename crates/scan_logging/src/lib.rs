#![deny(missing_docs)]
//! Shared logging utilities for the scanwatch workspace.
//!
//! This crate provides the `scan_*` logging macros used across the codebase,
//! a per-thread tag naming the scan currently being observed, and a minimal
//! test initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Thread-local storage for the id of the scan the event loop observes.
    static OBSERVED_SCAN: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the observed scan tag for the current thread.
/// The event loop calls this whenever the observed scan changes.
pub fn set_observed_scan(scan_id: Option<&str>) {
    OBSERVED_SCAN.with(|slot| *slot.borrow_mut() = scan_id.map(ToOwned::to_owned));
}

/// Returns the observed scan tag for the current thread, or `"-"` if unset.
pub fn observed_scan_label() -> String {
    OBSERVED_SCAN.with(|slot| slot.borrow().clone().unwrap_or_else(|| "-".to_string()))
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! scan_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! scan_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! scan_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! scan_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! scan_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
