//! Logging macros for the runtime.
//!
//! Runtime diagnostics go to the window console of the [`Mx`](crate::Mx)
//! context they concern, so skipped directives and swaps can be inspected from
//! tests, and are mirrored to `tracing` under the `mx` target.
//!
//! ## Macro Overview
//!
//! | Macro | Feature Required | Sink |
//! |-------|------------------|------|
//! | `debug_log!` | `debug-hooks` | `tracing::debug!` |
//! | `info_log!` | None | `console.info` |
//! | `warn_log!` | None | `console.warn` |
//! | `error_log!` | None | `console.error` |
//!
//! ## Example
//!
//! ```ignore
//! use mx_pages::{debug_log, warn_log};
//!
//! debug_log!("hydrating {} elements", count);
//! warn_log!(mx, "component '{}' is not registered", name);
//! ```

/// Logs a debug message (requires the `debug-hooks` feature)
#[macro_export]
#[cfg(feature = "debug-hooks")]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		tracing::debug!(target: "mx", $($arg)*);
	}};
}

/// No-op debug_log when `debug-hooks` is disabled
#[macro_export]
#[cfg(not(feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message on the console of `$mx`
///
/// # Example
///
/// ```ignore
/// info_log!(mx, "hydrated {} components", count);
/// ```
#[macro_export]
macro_rules! info_log {
	($mx:expr, $($arg:tt)*) => {{
		($mx).console().info(format!($($arg)*));
	}};
}

/// Logs a warning on the console of `$mx`
#[macro_export]
macro_rules! warn_log {
	($mx:expr, $($arg:tt)*) => {{
		($mx).console().warn(format!($($arg)*));
	}};
}

/// Logs an error on the console of `$mx`
#[macro_export]
macro_rules! error_log {
	($mx:expr, $($arg:tt)*) => {{
		($mx).console().error(format!($($arg)*));
	}};
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	// Import macros from crate root
	use crate::{Mx, debug_log, error_log, info_log, warn_log};

	#[rstest]
	fn test_logging_macros_record_on_console() {
		let mx = Mx::new();
		debug_log!("Debug message: {}", 42);
		info_log!(mx, "Info message: {}", "test");
		warn_log!(mx, "Warning message: {:?}", vec![1, 2, 3]);
		error_log!(&mx, "Error message: {}", "error");

		assert_eq!(mx.console().entries().len(), 3);
		assert_eq!(mx.console().warnings(), vec!["Warning message: [1, 2, 3]"]);
		assert_eq!(mx.console().errors(), vec!["Error message: error"]);
	}
}
