//! Scheduling behavior of [`coro_core::fiber`] driven through a toy host.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use coro_core::error::ErrorKind;
use coro_core::fiber::{Fiber, Scheduler, Status, Transfer};

use common::TestHost;

#[test]
fn ring_len_tracks_live_fibers() {
	let stack_base = 0usize;
	// Safety: `stack_base` is declared at the top of this test's frame.
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };
	let mut scheduler: Scheduler<TestHost> = Scheduler::new(&host);

	assert_eq!(scheduler.ring_len(), 1);

	let fiber = scheduler.new_fiber(|value| Transfer::Returned(value));

	assert_eq!(scheduler.ring_len(), 2);

	scheduler.resume(&host, fiber, &[7]).expect("resume succeeds");

	assert_eq!(scheduler.ring_len(), 1);
}

#[test]
fn yield_from_root_is_rejected() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };
	let mut scheduler: Scheduler<TestHost> = Scheduler::new(&host);

	let err = scheduler.yield_now(&host, &[]).unwrap_err();

	assert_eq!(err.kind(), ErrorKind::YieldFromRoot);
}

/// A fiber entered once, yielding repeatedly back to whoever resumes it,
/// accumulating every value it's handed until handed a negative one
/// (spec's generator idiom). Exercises a fresh first entry (a plain
/// call), then real jump-based suspension and resumption on every
/// subsequent round, and confirms `yield_now` clears `prev` so the same
/// fiber can be resumed again.
#[test]
fn generator_yield_resume_pairing() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };
	let mut scheduler: Scheduler<TestHost> = Scheduler::new(&host);

	let fiber = scheduler.new_fiber(|first| {
		let mut total = first;

		loop {
			let received = common::with_world(|sched, host| sched.yield_now(host, &[total]));

			match received {
				Ok(Transfer::Returned(value)) if value < 0 => break,
				Ok(Transfer::Returned(value)) => total += value,
				_ => break
			}
		}

		Transfer::Returned(total)
	});

	common::with_installed(&mut scheduler, &host, || {
		let r1 = common::with_world(|sched, host| sched.resume(host, fiber, &[10])).expect("resume 1");

		match r1 {
			Transfer::Returned(value) => assert_eq!(value, 10),
			Transfer::Raised(_) => panic!("fiber raised unexpectedly")
		}

		assert_eq!(fiber.status(), Status::Running);

		let r2 = common::with_world(|sched, host| sched.resume(host, fiber, &[5])).expect("resume 2");

		match r2 {
			Transfer::Returned(value) => assert_eq!(value, 15),
			Transfer::Raised(_) => panic!("fiber raised unexpectedly")
		}

		let r3 = common::with_world(|sched, host| sched.resume(host, fiber, &[-1])).expect("resume 3");

		match r3 {
			Transfer::Returned(value) => assert_eq!(value, 15),
			Transfer::Raised(_) => panic!("fiber raised unexpectedly")
		}

		assert_eq!(fiber.status(), Status::Terminated);

		let err = common::with_world(|sched, host| sched.resume(host, fiber, &[0])).unwrap_err();

		assert_eq!(err.kind(), ErrorKind::DeadFiber);
	});
}

/// A fiber that, mid-run (before it has ever yielded, so `prev` is still
/// set), tries to resume itself. The scheduler must reject this as a
/// double resume rather than deadlocking or re-entering.
#[test]
fn resuming_an_already_running_fiber_is_rejected() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };
	let mut scheduler: Scheduler<TestHost> = Scheduler::new(&host);

	let self_handle: Rc<Cell<Option<Fiber<TestHost>>>> = Rc::new(Cell::new(None));
	let self_handle_in_fiber = Rc::clone(&self_handle);

	let observed: Rc<RefCell<Option<ErrorKind>>> = Rc::new(RefCell::new(None));
	let observed_in_fiber = Rc::clone(&observed);

	let fiber = scheduler.new_fiber(move |value| {
		let me = self_handle_in_fiber.get().expect("handle installed before the fiber runs");
		let result = common::with_world(|sched, host| sched.resume(host, me, &[value]));

		if let Err(err) = result {
			*observed_in_fiber.borrow_mut() = Some(err.kind());
		}

		Transfer::Returned(value)
	});

	self_handle.set(Some(fiber));

	common::with_installed(&mut scheduler, &host, || {
		let result = common::with_world(|sched, host| sched.resume(host, fiber, &[42])).expect("outer resume succeeds");

		match result {
			Transfer::Returned(value) => assert_eq!(value, 42),
			Transfer::Raised(_) => panic!("fiber raised unexpectedly")
		}
	});

	assert_eq!(observed.borrow().expect("self-resume was attempted"), ErrorKind::DoubleResume);
}

/// `a` transfers into `b`; `b`, on its own (fresh) first entry,
/// transfers straight back into the point `a` suspended at. Confirms
/// `transfer` is symmetric (no resumer recorded) and that jumping into a
/// context captured mid-`transfer` lands back at that exact call.
#[test]
fn transfer_is_symmetric() {
	let stack_base = 0usize;
	let host = unsafe { TestHost::new(std::ptr::addr_of!(stack_base).cast_mut().cast()) };
	let mut scheduler: Scheduler<TestHost> = Scheduler::new(&host);

	let b_handle: Rc<Cell<Option<Fiber<TestHost>>>> = Rc::new(Cell::new(None));
	let b_handle_in_a = Rc::clone(&b_handle);

	let a = scheduler.new_fiber(move |value| {
		let b = b_handle_in_a.get().expect("b created before a runs");
		let result = common::with_world(|sched, host| sched.transfer(host, b, &[value]));

		match result {
			Ok(Transfer::Returned(value)) => Transfer::Returned(value),
			Ok(Transfer::Raised(value)) => Transfer::Raised(value),
			Err(_) => Transfer::Raised(-1)
		}
	});

	let a_handle: Rc<Cell<Option<Fiber<TestHost>>>> = Rc::new(Cell::new(Some(a)));

	let b = scheduler.new_fiber(move |value| {
		let a = a_handle.get().expect("a handle installed before b runs");

		let _ = common::with_world(|sched, host| sched.transfer(host, a, &[value + 1]));

		unreachable!("transferring back into a's suspend point never returns here");
	});

	b_handle.set(Some(b));

	common::with_installed(&mut scheduler, &host, || {
		let result = common::with_world(|sched, host| sched.resume(host, a, &[41])).expect("resume a");

		match result {
			Transfer::Returned(value) => assert_eq!(value, 42),
			Transfer::Raised(_) => panic!("unexpected raise")
		}
	});

	assert_eq!(a.status(), Status::Terminated);
	assert_eq!(b.status(), Status::Running);
}
