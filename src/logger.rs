//! Structured console logging with visual formatting.
//!
//! Console output uses Unicode box drawing characters so that a block of related
//! lines (a schedule install, an actuation, a startup report) reads as one unit
//! in `journalctl` or a terminal. This is operator-facing output only; the audit
//! trail of what actually ran lives in [`crate::event_log`].
//!
//! The logger supports runtime enable/disable for quiet operation during
//! one-shot commands and tests, and an optional wall-clock prefix for running
//! under a service manager that does not stamp lines itself.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static TIMESTAMPS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// - **`log_block_start!`**: begins a new conceptual block (schedule install,
///   startup, shutdown). Prints an empty pipe `┃` for spacing, then `┣ message`.
/// - **`log_decorated!`**: a line belonging to the current block, `┣ message`.
/// - **`log_indented!`**: nested detail under the previous line, `┃   message`.
/// - **`log_pipe!`**: an empty `┃` line, used before a semantic log that starts
///   a block of its own.
/// - **`log_version!`** / **`log_end!`**: header printed once at startup and the
///   final `╹` marker printed once at shutdown.
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`,
///   `log_critical!`**: semantic lines with a colored `[LEVEL]` tag.
pub struct Log;

impl Log {
    /// Enable or disable logging.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Prefix every line with the current wall-clock time.
    pub fn set_timestamps(enabled: bool) {
        TIMESTAMPS_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Timestamp prefix for the current line, or an empty string.
    ///
    /// Public for macro access.
    pub fn get_timestamp_prefix() -> String {
        if TIMESTAMPS_ENABLED.load(Ordering::SeqCst) {
            let now = crate::time_source::now().with_timezone(&chrono::Local);
            format!("[{}] ", now.format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

// Public function that routes output (needed by macros)
pub fn write_output(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

/// Shared body of every logging macro: `$head` is written after the timestamp
/// prefix and before the message; `$lead` (if any) is a full line emitted first.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    (@emit $lead:expr, $head:expr, $message:expr) => {{
        let prefix = $crate::logger::Log::get_timestamp_prefix();
        let lead: &str = $lead;
        let formatted = if lead.is_empty() {
            format!("{prefix}{}{}\n", $head, $message)
        } else {
            format!("{prefix}{lead}\n{prefix}{}{}\n", $head, $message)
        };
        $crate::logger::write_output(&formatted);
    }};
    ($lead:expr, $head:expr, $fmt:literal $($arg:tt)*) => {{
        if $crate::logger::Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            $crate::__log_line!(@emit $lead, $head, message);
        }
    }};
    ($lead:expr, $head:expr, $expr:expr) => {{
        if $crate::logger::Log::is_enabled() {
            let message = $expr;
            $crate::__log_line!(@emit $lead, $head, message);
        }
    }};
}

/// Log a decorated message, typically as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => { $crate::__log_line!("", "┣ ", $($arg)+) };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => { $crate::__log_line!("", "┃   ", $($arg)+) };
}

/// Log a block start message, initiating a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => { $crate::__log_line!("┃", "┣ ", $($arg)+) };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let prefix = $crate::logger::Log::get_timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}┃\n"));
        }
    }};
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let prefix = $crate::logger::Log::get_timestamp_prefix();
            let version = env!("CARGO_PKG_VERSION");
            $crate::logger::write_output(&format!("{prefix}┏ coopd v{version} ━━╸\n"));
        }
    }};
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let prefix = $crate::logger::Log::get_timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}╹\n"));
        }
    }};
}

/// Log a warning message with pipe prefix and yellow-colored tag.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => { $crate::__log_line!("", "┣[\x1b[33mWARNING\x1b[0m] ", $($arg)+) };
}

/// Log an error message with pipe prefix and red-colored tag.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { $crate::__log_line!("", "┣[\x1b[31mERROR\x1b[0m] ", $($arg)+) };
}

/// Log an informational message with pipe prefix and green-colored tag.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { $crate::__log_line!("", "┣[\x1b[32mINFO\x1b[0m] ", $($arg)+) };
}

/// Log a debug/operational message with pipe prefix and green-colored tag.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => { $crate::__log_line!("", "┣[\x1b[32mDEBUG\x1b[0m] ", $($arg)+) };
}

/// Log a critical message with pipe prefix and red-colored tag.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => { $crate::__log_line!("", "┣[\x1b[31mCRITICAL\x1b[0m] ", $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_logger_is_silent() {
        Log::set_enabled(false);
        assert!(!Log::is_enabled());
        // Both macro arms must expand and stay quiet while disabled
        log_info!("value = {}", 42);
        log_decorated!(String::from("expression arm"));
        log_block_start!("block {}", "start");
        Log::set_enabled(true);
        assert!(Log::is_enabled());
    }

    #[test]
    fn test_timestamp_prefix_toggle() {
        Log::set_timestamps(false);
        assert!(Log::get_timestamp_prefix().is_empty());
        Log::set_timestamps(true);
        let prefix = Log::get_timestamp_prefix();
        Log::set_timestamps(false);
        assert!(prefix.starts_with('[') && prefix.ends_with("] "));
        assert_eq!(prefix.len(), "[00:00:00] ".len());
    }
}
