//! Shared test double used across the integration suite: a toy host
//! thread just capable enough to drive [`coro_core::fiber`] and
//! [`coro_core::continuation`] without an actual interpreter behind it.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use coro_core::context::ValueStack;
use coro_core::fiber::Scheduler;
use coro_core::host::HostThread;

#[derive(Clone, Copy)]
pub struct Snapshot {
	len: usize
}

pub struct TestHost {
	stack_start: *mut u8,
	values: RefCell<Vec<i64>>,
	tag_chain_root: Cell<u64>
}

impl TestHost {
	/// # Safety
	/// `stack_start` must point at (or above, in the growth direction) a
	/// local declared at the top of the caller's own frame, live for as
	/// long as this host is used to capture or restore a context.
	pub unsafe fn new(stack_start: *mut u8) -> Self {
		Self { stack_start, values: RefCell::new(Vec::new()), tag_chain_root: Cell::new(0) }
	}

	pub fn set_tag_chain_root(&self, root: u64) {
		self.tag_chain_root.set(root);
	}
}

impl HostThread for TestHost {
	type Snapshot = Snapshot;
	type Value = i64;

	fn snapshot(&self) -> Snapshot {
		Snapshot { len: self.values.borrow().len() }
	}

	fn restore(&self, snapshot: Snapshot) {
		self.values.borrow_mut().truncate(snapshot.len);
	}

	fn tag_chain_root(&self) -> u64 {
		self.tag_chain_root.get()
	}

	fn spill_registers(&self) {}

	fn capture_value_stack(&self) -> ValueStack<i64> {
		ValueStack::Full(self.values.borrow().clone().into_boxed_slice())
	}

	fn restore_value_stack(&self, stack: &ValueStack<i64>) {
		let values = match stack {
			ValueStack::Full(buf) => buf.to_vec(),
			ValueStack::Split { prefix, suffix } => {
				let mut values = prefix.to_vec();

				values.extend_from_slice(suffix);
				values
			}
		};

		*self.values.borrow_mut() = values;
	}

	fn stack_start(&self) -> *mut u8 {
		self.stack_start
	}

	fn new_fiber_snapshot(&self, _stack_words: usize) -> Snapshot {
		Snapshot { len: 0 }
	}

	fn pack_args(&self, args: &[i64]) -> i64 {
		match args {
			[] => 0,
			[only] => *only,
			rest => rest.iter().sum()
		}
	}

	fn trace_value(&self, _value: &i64, _mark: &mut dyn FnMut(usize)) {}

	fn trace_snapshot(&self, _snapshot: &Snapshot, _mark: &mut dyn FnMut(usize)) {}
}

thread_local! {
	static WORLD: RefCell<Option<(*mut Scheduler<TestHost>, *const TestHost)>> = const { RefCell::new(None) };
}

/// Installs `scheduler`/`host` so fiber bodies running under `body` can
/// reach back into them via [`with_world`], the same way a real host
/// would locate "my current scheduler" from thread-local state rather
/// than threading it through every fiber entry closure.
pub fn with_installed<R>(scheduler: &mut Scheduler<TestHost>, host: &TestHost, body: impl FnOnce() -> R) -> R {
	WORLD.with(|cell| *cell.borrow_mut() = Some((scheduler as *mut Scheduler<TestHost>, host as *const TestHost)));

	struct Guard;

	impl Drop for Guard {
		fn drop(&mut self) {
			WORLD.with(|cell| *cell.borrow_mut() = None);
		}
	}

	let _guard = Guard;

	body()
}

/// Reaches back into the scheduler/host installed by [`with_installed`].
/// Only valid to call from within its `body`, or from a fiber body
/// running somewhere underneath it.
pub fn with_world<R>(f: impl FnOnce(&mut Scheduler<TestHost>, &TestHost) -> R) -> R {
	WORLD.with(|cell| {
		let (scheduler_ptr, host_ptr) = cell.borrow().expect("no world installed on this thread");

		// Safety: `with_installed` only clears this slot after `body`
		// returns, and a fiber body can only run within that call.
		let scheduler = unsafe { &mut *scheduler_ptr };
		let host = unsafe { &*host_ptr };

		f(scheduler, host)
	})
}
