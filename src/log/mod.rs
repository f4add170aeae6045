//! Structured logging for the coroutine core.
//!
//! Every fiber/context state transition logs at `trace`; every error raised
//! from the error-handling design logs at `debug` before being returned to
//! the caller. Thin wrapper over the `log` crate's facade, with a `target:`
//! form that accepts a pointer-like value so a running `Fiber` can tag its
//! own log lines with its address.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Arguments;
use std::panic::Location;

pub use log::{Level, LevelFilter, max_level as get_max_level, set_max_level};

pub mod internal;
#[cfg(feature = "logger")]
mod logger;

macro_rules! get_thread_name {
	($var:ident) => {
		let thread = ::std::thread::current();
		let $var = thread.name().unwrap_or("<unnamed>");
	};
}

pub fn print_backtrace() {
	get_thread_name!(thread_name);

	internal::print_backtrace(thread_name);
}

pub fn print_fatal(fmt: Arguments<'_>) {
	get_thread_name!(thread_name);

	internal::print_fatal(thread_name, fmt);
}

#[track_caller]
pub fn print_panic(location: Option<&Location<'_>>, fmt: Arguments<'_>) {
	get_thread_name!(thread_name);

	let location = location.unwrap_or_else(Location::caller);

	internal::print_fatal(
		thread_name,
		format_args!("panic at {location}:\n>> {fmt}")
	);

	let backtrace = Backtrace::capture();

	if backtrace.status() == BacktraceStatus::Captured {
		internal::print_fatal(thread_name, format_args!("\nback trace:\n{backtrace}"));
	}
}

/// Logs `$args` at `$level`, tagging the line with `target`'s address and
/// type name instead of a module path. Guarded by `log_enabled!` so the
/// address/type-name formatting in `log_target` is skipped entirely when
/// the level isn't active.
#[macro_export]
macro_rules! log {
	(target: $target: expr, $level: expr, $($arg: tt)+) => {
		if $crate::opt::unlikely($crate::log::internal::log_enabled!($level)) {
			$crate::log::internal::log_target($level, $crate::pointer::Ptr::from($target), format_args!($($arg)+))
		}
	};

	($level: expr, $($arg: tt)+) => {
		$crate::log::internal::log!($level, $($arg)+)
	};
}

pub use log;

macro_rules! level_macro {
	($name:ident, $level:ident) => {
		#[macro_export]
		macro_rules! $name {
			($($arg: tt)+) => {
				$crate::log!($crate::log::Level::$level, $($arg)+)
			}
		}

		pub use $name;
	};
}

level_macro!(error, Error);
level_macro!(warn, Warn);
level_macro!(info, Info);
level_macro!(debug, Debug);
level_macro!(trace, Trace);
