//! Non-local jump primitive: the platform-specific half of a `Context`.
//!
//! Arch-split (`jmp/x64.rs`, `jmp/arm64.rs`) `global_asm!`-based context
//! switch. A full coroutine stack swap saves callee-saved registers for
//! both sides of the switch in one asm routine; this crate only ever
//! needs the weaker, classic
//! `setjmp`/`longjmp` pair — save the callee-saved registers and the
//! stack/instruction pointer once, jump back into them arbitrarily many
//! times (continuations are multi-shot) — so [`set`] and [`jump`] below
//! are two free functions rather than a single `switch`.
//!
//! Unlike `setjmp(3)`, this does not save or restore the signal mask;
//! this subsystem has nothing to do with signal dispatch.

crate::macros::import_sysdeps!();

pub use platform::JumpBuf;

/// Captures the calling frame's register state into `buf`.
///
/// Returns `0` on the direct call. A later [`jump`] on the same `buf`
/// makes this same call site return again, this time yielding whatever
/// nonzero `value` was passed to `jump` (never `0`, matching
/// `setjmp`/`longjmp`'s convention so callers can tell the two returns
/// apart).
///
/// # Safety
/// `buf` must be valid for writes for the lifetime of the returned jump
/// target, i.e. until the last `jump` that will ever target it. The
/// stack frame live at the call site must still be live (or its machine
/// stack image restored, see [`crate::stack`]) at the time of any
/// matching `jump`.
#[inline(always)]
pub unsafe fn set(buf: *mut JumpBuf) -> i32 {
	/* Safety: guaranteed by caller */
	unsafe { jmp_set(buf) }
}

/// Transfers control to the matching [`set`] call site, which then
/// returns `value` (coerced to a nonzero value if `0` was passed).
///
/// # Safety
/// `buf` must have been produced by a `set` whose call frame is still
/// live on the current machine stack — i.e. called only after
/// [`crate::stack::MachineStack::copy_back`] (or the frame truly never
/// left) has made that true.
#[inline(always)]
pub unsafe fn jump(buf: *const JumpBuf, value: i32) -> ! {
	/* Safety: guaranteed by caller */
	unsafe { jmp_jump(buf, value) }
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn set_returns_zero_directly() {
		let mut buf = JumpBuf::new();

		// Safety: `buf` lives for the whole test, never jumped to.
		let rc = unsafe { set(std::ptr::addr_of_mut!(buf)) };

		assert_eq!(rc, 0);
	}
}
