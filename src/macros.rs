//! Small helper macros shared across the crate, kept as plain
//! `macro_rules!` rather than pulling in a proc-macro crate for
//! mechanical boilerplate.

/// Declares `mod x64;` / `mod arm64;` and re-exports the one matching
/// `target_arch` under a private `platform` alias.
macro_rules! import_sysdeps {
	() => {
		#[cfg(any(target_arch = "aarch64", doc))]
		mod arm64;
		#[cfg(any(target_arch = "x86_64", doc))]
		mod x64;

		mod platform {
			#[cfg(target_arch = "aarch64")]
			#[allow(unused_imports)]
			pub use super::arm64::*;
			#[cfg(target_arch = "x86_64")]
			#[allow(unused_imports)]
			pub use super::x64::*;
		}

		#[allow(unused_imports)]
		use platform::*;
	};
}

pub(crate) use import_sysdeps;

/// Panics without unwinding through the stack we may be in the middle of
/// rewriting (see `stack::restore_padded`). Unwinding across a restored
/// machine-stack image would walk frames that no longer match any live
/// landing pad.
macro_rules! panic_nounwind {
	($($arg: tt)*) => {
		$crate::runtime::panic_nounwind(::std::format_args!($($arg)*))
	}
}

pub(crate) use panic_nounwind;

/// Debug-checked precondition. In release builds this degrades to an
/// optimizer hint via `assume`-like reasoning rather than a branch.
macro_rules! assert_unsafe_precondition {
	($condition:expr) => {
		$crate::macros::assert_unsafe_precondition!($condition, ::std::stringify!($condition))
	};

	($condition:expr, $($arg: tt)*) => {{
		#[cfg(debug_assertions)]
		if !$condition {
			$crate::macros::panic_nounwind!(
				"unsafe precondition violated: {}",
				::std::format_args!($($arg)*)
			);
		}
	}};
}

pub(crate) use assert_unsafe_precondition;
