//! Branch and unreachable-code hints.
//!
//! Kept separate from `std::hint` so that debug builds can turn an
//! `unreachable_unchecked` into a loud panic instead of silently
//! invoking undefined behavior.

#[inline(always)]
#[cold]
fn cold() {}

#[inline(always)]
pub fn likely(cond: bool) -> bool {
	if !cond {
		cold();
	}

	cond
}

#[inline(always)]
pub fn unlikely(cond: bool) -> bool {
	if cond {
		cold();
	}

	cond
}

/// # Safety
/// See [`std::hint::unreachable_unchecked`]
#[inline(always)]
pub unsafe fn unreachable_unchecked(msg: &str) -> ! {
	#[cfg(debug_assertions)]
	panic!("entered unreachable code: {msg}");

	#[cfg(not(debug_assertions))]
	{
		let _ = msg;

		/* Safety: guaranteed by caller */
		unsafe { std::hint::unreachable_unchecked() }
	}
}
