//! Capture/invoke mechanics and invocation-time validation of
//! [`coro_core::continuation`], driven through a toy host.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use coro_core::continuation::{self, CaptureOutcome, Continuation};
use coro_core::error::ErrorKind;

use common::TestHost;

/// Moves a handle across a thread boundary despite it not being `Send`,
/// for the one test below that needs to exercise a *runtime*
/// thread-affinity check rather than relying on the type system to
/// refuse the crossing outright. Sound here: the pointee is
/// heap-allocated (so valid from any thread in this process), and the
/// originating thread never touches it again once it hands it off.
struct ForceSend<T>(T);

// Safety: see the struct doc comment.
unsafe impl<T> Send for ForceSend<T> {}

#[test]
fn fresh_capture_reports_fresh() {
	let stack_base = 0usize;
	// Safety: `stack_base` is declared at the top of this test's frame.
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };

	// Safety: called directly here, with an unbroken caller chain back
	// to `host.stack_start()`.
	let outcome = unsafe { continuation::capture(&host, None) };

	assert!(matches!(outcome, CaptureOutcome::Fresh(_)));
}

#[test]
fn destroy_frees_without_invoking() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };

	let outcome = unsafe { continuation::capture(&host, None) };

	let CaptureOutcome::Fresh(k) = outcome else {
		panic!("first pass through capture is always Fresh");
	};

	// Safety: `k` is the only handle to this capture and it's never
	// invoked.
	unsafe { k.destroy() };
}

/// The flagship round trip: capture a point in this function, keep
/// running, then invoke the saved continuation from further down the
/// same call chain. Each invocation truly re-enters the original
/// `capture` call via a non-local jump, so only state kept outside the
/// captured stack range (here, the `Rc<Cell<_>>` counter) survives
/// across a round; anything stack-resident is reverted to its
/// capture-time image, which is why the loop count lives on the heap.
#[test]
fn invoke_restarts_capture_point() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };

	let counter = Rc::new(Cell::new(0i64));
	let saved: Rc<RefCell<Option<Continuation<TestHost>>>> = Rc::new(RefCell::new(None));

	// Safety: called directly here, with an unbroken caller chain back
	// to `host.stack_start()`.
	let outcome = unsafe { continuation::capture(&host, None) };

	if let CaptureOutcome::Fresh(k) = outcome {
		*saved.borrow_mut() = Some(k);
	}

	counter.set(counter.get() + 1);

	if counter.get() < 3 {
		let k = saved.borrow().expect("continuation was captured above");

		k.invoke(&host, None, &[counter.get()]);
		unreachable!("a successful invoke never returns");
	}

	assert_eq!(counter.get(), 3);
}

#[test]
fn cross_tag_barrier_invoke_is_rejected() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };

	host.set_tag_chain_root(1);

	let outcome = unsafe { continuation::capture(&host, None) };

	let CaptureOutcome::Fresh(k) = outcome else {
		panic!("first pass through capture is always Fresh");
	};

	host.set_tag_chain_root(2);

	let err = k.invoke(&host, None, &[]);

	assert_eq!(err.kind(), ErrorKind::CrossTagBarrier);
}

#[test]
fn cross_fiber_invoke_is_rejected() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };

	let outcome = unsafe { continuation::capture(&host, Some(7)) };

	let CaptureOutcome::Fresh(k) = outcome else {
		panic!("first pass through capture is always Fresh");
	};

	let err = k.invoke(&host, Some(8), &[]);

	assert_eq!(err.kind(), ErrorKind::CrossFiberContinuation);
}

#[test]
fn cross_thread_invoke_is_rejected() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };

	let outcome = unsafe { continuation::capture(&host, None) };

	let CaptureOutcome::Fresh(k) = outcome else {
		panic!("first pass through capture is always Fresh");
	};

	let sendable = ForceSend((k, host));

	let err = std::thread::spawn(move || {
		let ForceSend((k, host)) = sendable;

		k.invoke(&host, None, &[])
	})
	.join()
	.expect("spawned thread didn't panic");

	assert_eq!(err.kind(), ErrorKind::CrossThreadTransfer);
}
