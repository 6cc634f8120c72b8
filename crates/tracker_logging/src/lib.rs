#![deny(missing_docs)]
//! Shared logging utilities for the tracker workspace.
//!
//! This crate provides the `tracker_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro accepts an optional `job = <id>;` prefix which tags the line
//! with the tracked job, so interleaved output from the push and poll channels
//! can be told apart:
//!
//! ```ignore
//! tracker_info!(job = job_id; "push channel open");
//! tracker_warn!("poll request failed: {}", err);
//! ```

/// Log target used for lines tagged with a job id.
pub const JOB_TARGET: &str = "tracker::job";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! tracker_trace {
    (job = $job:expr; $($arg:tt)*) => {{
        log::trace!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! tracker_debug {
    (job = $job:expr; $($arg:tt)*) => {{
        log::debug!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! tracker_info {
    (job = $job:expr; $($arg:tt)*) => {{
        log::info!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! tracker_warn {
    (job = $job:expr; $($arg:tt)*) => {{
        log::warn!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! tracker_error {
    (job = $job:expr; $($arg:tt)*) => {{
        log::error!(target: $crate::JOB_TARGET, "[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Trace in debug builds so dropped updates show up in failing test output.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Trace
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
