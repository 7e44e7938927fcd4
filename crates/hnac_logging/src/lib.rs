#![deny(missing_docs)]
//! Shared logging utilities for the crawler workspace.
//!
//! This crate provides the `hnac_*` logging macros used across the codebase,
//! a per-task job scope that tags log lines with the running job's id, and
//! a minimal test initializer for the global logger.

use std::future::Future;

tokio::task_local! {
    /// Id of the job the current task is running, if any.
    static JOB_SCOPE: String;
}

/// Runs `fut` with every log line it emits tagged with `job_id`.
///
/// The scope belongs to the task polling `fut`: other tasks on the same
/// thread, including futures joined next to it, stay untagged.
pub async fn in_job_scope<F>(job_id: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    JOB_SCOPE.scope(job_id.into(), fut).await
}

/// Synchronous variant of [`in_job_scope`].
pub fn in_job_scope_sync<R>(job_id: impl Into<String>, f: impl FnOnce() -> R) -> R {
    JOB_SCOPE.sync_scope(job_id.into(), f)
}

/// Retrieves the id of the job the current task is running.
/// Returns `None` outside of a job scope.
pub fn current_job() -> Option<String> {
    JOB_SCOPE.try_with(|job_id| job_id.clone()).ok()
}

#[doc(hidden)]
pub use log;

#[doc(hidden)]
pub fn __log(target: &str, level: log::Level, args: std::fmt::Arguments<'_>) {
    let scoped = JOB_SCOPE.try_with(|job_id| {
        log::log!(target: target, level, "[job {}] {}", job_id, args);
    });
    if scoped.is_err() {
        log::log!(target: target, level, "{}", args);
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! hnac_trace {
    ($($arg:tt)*) => {{
        $crate::__log(module_path!(), $crate::log::Level::Trace, format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! hnac_info {
    ($($arg:tt)*) => {{
        $crate::__log(module_path!(), $crate::log::Level::Info, format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! hnac_debug {
    ($($arg:tt)*) => {{
        $crate::__log(module_path!(), $crate::log::Level::Debug, format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! hnac_warn {
    ($($arg:tt)*) => {{
        $crate::__log(module_path!(), $crate::log::Level::Warn, format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! hnac_error {
    ($($arg:tt)*) => {{
        $crate::__log(module_path!(), $crate::log::Level::Error, format_args!($($arg)*));
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
