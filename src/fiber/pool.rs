//! Reuses a terminated fiber's node allocation for the next
//! `new_fiber`/`new_fiber_with_stack` instead of freeing and
//! reallocating.
//!
//! Grounded on the host's `fiber::Pool`, minus the `Mutex`: a
//! `Scheduler` and everything it owns is single-threaded by
//! construction (see the module doc comment on [`super::Scheduler`]), so
//! there's no concurrent access here to guard against.

use super::Inner;
use crate::host::HostThread;
use crate::pointer::MutPtr;

pub struct Pool<H: HostThread> {
	free: Vec<MutPtr<Inner<H>>>
}

impl<H: HostThread> Pool<H> {
	#[must_use]
	pub const fn new() -> Self {
		Self { free: Vec::new() }
	}

	const fn calculate_ideal(live_count: usize) -> usize {
		const RATIO: usize = 20;

		live_count * RATIO / 100 + 16
	}

	pub(super) fn take(&mut self) -> Option<MutPtr<Inner<H>>> {
		let ptr = self.free.pop();

		if ptr.is_some() {
			crate::trace!("fiber pool: reusing node");
		}

		ptr
	}

	pub(super) fn give(&mut self, ptr: MutPtr<Inner<H>>, live_count: usize) {
		let ideal = Self::calculate_ideal(live_count);

		if ideal > self.free.len() && self.free.try_reserve(1).is_ok() {
			crate::trace!("fiber pool: keeping node");

			self.free.push(ptr);
		} else {
			crate::trace!("fiber pool: dropping node");

			// Safety: `reclaim` only hands us a node after unlinking it
			// from the ring, so nothing else can reach it.
			drop(unsafe { Box::from_raw(ptr.as_mut_ptr()) });
		}
	}
}

impl<H: HostThread> Default for Pool<H> {
	fn default() -> Self {
		Self::new()
	}
}

impl<H: HostThread> Drop for Pool<H> {
	fn drop(&mut self) {
		for ptr in self.free.drain(..) {
			// Safety: nodes on the free list are owned solely by the
			// pool and were never relinked into a ring.
			drop(unsafe { Box::from_raw(ptr.as_mut_ptr()) });
		}
	}
}
