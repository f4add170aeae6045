//! Bit-exact capture and restore of a slice of the machine stack.
//!
//! This is the primitive the rest of the crate is built on: a `Context`
//! doesn't know anything about frames or return addresses, it just owns a
//! byte-for-byte copy of a stack range and a source address to copy it
//! back to. The padding scheme below uses a fixed scratch array rather
//! than `alloca`/VLAs, which this crate never assumes are available.

use std::ops::Range;
use std::sync::OnceLock;

/// Scratch words burned per recursion level while padding the stack past
/// a restore target when the platform has no dynamic-sized stack
/// allocation available to `restore_padded`.
pub const STACK_PAD_WORDS: usize = 1024;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
	/// Higher addresses are called first; a callee's locals sit at a
	/// *lower* address than its caller's.
	Descending,
	/// A callee's locals sit at a *higher* address than its caller's.
	Ascending
}

static DIRECTION: OnceLock<Direction> = OnceLock::new();

#[inline(never)]
fn probe(caller_local: *const usize) -> Direction {
	let callee_local = 0usize;

	if std::ptr::addr_of!(callee_local) as usize > caller_local as usize {
		Direction::Ascending
	} else {
		Direction::Descending
	}
}

/// Detects which way this platform's call stack grows, once, and caches
/// the result. Every capture and restore in the process uses this same
/// cached value.
pub fn direction() -> Direction {
	*DIRECTION.get_or_init(|| {
		let caller_local = 0usize;

		probe(std::ptr::addr_of!(caller_local))
	})
}

/// A hook for platforms with a separate register-backing store (e.g. the
/// historical ia64 RSE) that also needs flushing before a capture is
/// consistent. No architecture this crate targets (x86-64, aarch64) has
/// one, so this is a documented no-op kept for symmetry with the
/// original `FLUSH_REGISTER_WINDOWS`.
#[inline(always)]
pub fn flush_register_windows() {}

/// An owned, byte-for-byte copy of a range of the machine stack.
pub struct MachineStack {
	buf: Box<[usize]>,
	/// Address the buffer was copied from, and must be copied back to.
	source: *mut usize,
	len: usize
}

// Safety note: `source` only dereferences during `restore`, which is
// only ever called back on the thread that produced the snapshot
// (enforced by the caller checking `HostThread` identity first).
unsafe impl Send for MachineStack where usize: Send {}

impl MachineStack {
	/// Computes the direction-aware `[low, high)` range covering `bounds`
	/// and copies it into a fresh owned buffer.
	///
	/// `bounds` is `(stack_start, current_frame_address)`, in whichever
	/// order matches this platform's growth direction; the order doesn't
	/// matter, only the pair of endpoints does.
	///
	/// # Safety
	/// Both ends of `bounds` must point into the same, currently live
	/// machine stack.
	#[must_use]
	pub unsafe fn capture(bounds: Range<*mut usize>) -> Self {
		flush_register_windows();

		let (a, b) = (bounds.start as usize, bounds.end as usize);
		let (low, high) = if a <= b { (a, b) } else { (b, a) };
		let len = (high - low) / std::mem::size_of::<usize>();
		let source = low as *mut usize;

		/* Safety: caller guarantees `[low, high)` is live stack memory */
		let buf = unsafe { std::slice::from_raw_parts(source, len) }.to_vec().into_boxed_slice();

		Self { buf, source, len }
	}

	#[must_use]
	pub const fn len(&self) -> usize {
		self.len
	}

	#[must_use]
	pub const fn is_empty(&self) -> bool {
		self.len == 0
	}

	#[must_use]
	pub const fn source(&self) -> *mut usize {
		self.source
	}

	/// Copies the saved image back to its source address.
	///
	/// # Safety
	/// The caller must be running on the same host thread that produced
	/// this capture, with nothing currently live in `[source, source +
	/// len)` that the copy would corrupt except frames about to be
	/// discarded by the matching jump.
	pub unsafe fn copy_back(&self) {
		if self.len == 0 {
			return;
		}

		/* Safety: guaranteed by caller */
		unsafe {
			std::ptr::copy_nonoverlapping(self.buf.as_ptr(), self.source, self.len);
		}
	}

	/// True once the active stack pointer has moved past this capture's
	/// range in the growth direction, i.e. it's now safe to `copy_back`
	/// without clobbering the frame currently executing the restore.
	#[must_use]
	pub fn is_clear_of(&self, current: *const usize) -> bool {
		let current = current as usize;
		let low = self.source as usize;
		let high = low + self.len * std::mem::size_of::<usize>();

		match direction() {
			Direction::Descending => current < low,
			Direction::Ascending => current >= high
		}
	}
}

/// Consumes machine stack, recursing through a fixed-size padding array,
/// until the active frame is clear of `target`'s captured range, then
/// calls `land`. `land` must perform the copy-back and non-local jump; it
/// never returns, so neither does this.
///
/// This is the "padding recursion" of the capture/restore protocol: Rust
/// has no `alloca`, so every level burns a full `STACK_PAD_WORDS` array
/// rather than growing one word at a time.
pub fn restore_padded<'a>(target: &MachineStack, land: impl FnOnce() -> ! + 'a) -> ! {
	#[allow(clippy::large_stack_arrays)]
	let pad: [usize; STACK_PAD_WORDS] = [0; STACK_PAD_WORDS];
	let here = std::ptr::addr_of!(pad);

	if target.is_clear_of(here.cast()) {
		land()
	} else {
		// Box the continuation so the recursive call's own frame doesn't
		// shrink the padding we just consumed.
		let land: Box<dyn FnOnce() -> ! + 'a> = Box::new(land);

		restore_padded_boxed(target, land)
	}
}

fn restore_padded_boxed(target: &MachineStack, land: Box<dyn FnOnce() -> ! + '_>) -> ! {
	#[allow(clippy::large_stack_arrays)]
	let pad: [usize; STACK_PAD_WORDS] = [0; STACK_PAD_WORDS];
	let here = std::ptr::addr_of!(pad);

	if target.is_clear_of(here.cast()) {
		land()
	} else {
		restore_padded_boxed(target, land)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn direction_is_cached() {
		assert_eq!(direction(), direction());
	}

	#[test]
	fn capture_round_trips() {
		let mut words = [1usize, 2, 3, 4];
		let ptr = words.as_mut_ptr();

		// Safety: `words` is live for the whole test.
		let saved = unsafe { MachineStack::capture(ptr..ptr.wrapping_add(words.len())) };

		assert_eq!(saved.len(), 4);

		words = [9, 9, 9, 9];

		// Safety: `source` still points at `words`, nothing else touches it.
		unsafe { saved.copy_back() };

		assert_eq!(words, [1, 2, 3, 4]);
	}
}
