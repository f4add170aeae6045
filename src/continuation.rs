//! First-class, multi-shot continuations ("call with current
//! continuation").
//!
//! Capturing one ([`capture`]) is a `jmp::set` that, like the underlying
//! primitive, "returns twice": once synchronously, handing the caller a
//! fresh [`Continuation`] to do with as it pleases, and — potentially
//! much later, from a completely different point in the call chain, any
//! number of times — again as [`CaptureOutcome::Invoked`], the moment
//! somebody calls [`Continuation::invoke`]. Unlike a fiber switch this is
//! one-way: invoking a continuation never returns to its own call site,
//! it reconstructs the *entire* captured dynamic extent back to the host
//! thread's stack root.
//!
//! A `Continuation` is a cheap, `Copy` pointer, same as [`crate::fiber`]'s
//! handles, for the same reason: the host's collector is what decides how
//! many references exist and when the capture is finally unreachable, not
//! Rust's ownership rules. [`Continuation::destroy`] is how the collector
//! actually frees it.

use crate::context::{Context, ContextKind};
use crate::error::{Error, Result};
use crate::gc::{self, Retained};
use crate::host::HostThread;
use crate::pointer::MutPtr;
use crate::{jmp, stack};

struct Inner<H: HostThread> {
	context: Context<H>
}

/// A captured continuation.
pub struct Continuation<H: HostThread>(MutPtr<Inner<H>>);

impl<H: HostThread> Clone for Continuation<H> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<H: HostThread> Copy for Continuation<H> {}

impl<H: HostThread> PartialEq for Continuation<H> {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl<H: HostThread> Eq for Continuation<H> {}

/// What happened when control reached the point `capture` was called
/// from.
pub enum CaptureOutcome<H: HostThread> {
	/// The ordinary, synchronous return: this is the first time control
	/// has reached here, and `Continuation` is fresh.
	Fresh(Continuation<H>),
	/// Control arrived via [`Continuation::invoke`]. `arg_count == -1`
	/// means the invoker asked for `value` to be raised rather than
	/// returned, mirroring the same convention [`crate::fiber`] uses.
	Invoked { arg_count: i32, value: H::Value }
}

/// Captures the current point in `host`'s call chain, all the way back
/// to its stack root, as a [`Continuation`].
///
/// `current_fiber` is the identity of the fiber this capture happens
/// inside, if any (see [`crate::fiber::Fiber::identity`]) — stamped onto
/// the continuation so a later [`Continuation::invoke`] can enforce the
/// rule that it may only be invoked from the fiber that captured it.
///
/// # Safety
/// Must be called on a frame whose caller chain is unbroken back to
/// `host.stack_start()` (i.e. not from inside code that itself jumped in
/// via a restored, detached machine-stack fragment).
#[must_use]
pub unsafe fn capture<H: HostThread>(host: &H, current_fiber: Option<u64>) -> CaptureOutcome<H> {
	let frontier = 0usize;
	let current_sp = std::ptr::addr_of!(frontier).cast_mut();

	// Safety: guaranteed by caller.
	let ctx = unsafe { Context::capture(host, ContextKind::Continuation, current_sp, current_fiber) };

	let inner_ptr = MutPtr::from(Box::into_raw(Box::new(Inner { context: ctx })));
	let continuation = Continuation(inner_ptr);

	crate::trace!("continuation: captured");

	// Safety: `continuation`'s context was just captured in this frame
	// and its jump buffer hasn't been set yet.
	let rc = unsafe { jmp::set(continuation.inner_mut().context.jmpbuf_mut()) };

	if rc != 0 {
		crate::trace!("continuation: invoked");

		let ctx = &continuation.inner().context;
		let arg_count = ctx.arg_count();
		let value = ctx.value_payload().expect("continuation invoked with no payload");

		return CaptureOutcome::Invoked { arg_count, value };
	}

	CaptureOutcome::Fresh(continuation)
}

impl<H: HostThread> Continuation<H> {
	fn inner(&self) -> &Inner<H> {
		// Safety: a `Continuation` handle is only valid while its
		// allocation is live, i.e. until the host's collector calls
		// `destroy`; a live handle implies the collector hasn't done so
		// yet.
		unsafe { self.0.as_ref() }
	}

	fn inner_mut(&self) -> &mut Inner<H> {
		// Safety: see `inner`.
		unsafe { self.0.as_mut() }
	}

	#[must_use]
	pub fn thread_id(&self) -> std::thread::ThreadId {
		self.inner().context.thread_id()
	}

	#[must_use]
	pub fn captured_fiber(&self) -> Option<u64> {
		self.inner().context.captured_fiber()
	}

	/// Three invocation-time checks: same host thread, same handler-tag
	/// dynamic extent, same fiber (if captured inside one).
	fn validate(&self, host: &H, current_fiber: Option<u64>) -> Result<()> {
		let ctx = &self.inner().context;

		if ctx.thread_id() != std::thread::current().id() {
			return Err(Error::cross_thread_transfer());
		}

		if ctx.tag_chain_root() != host.tag_chain_root() {
			return Err(Error::cross_tag_barrier());
		}

		if let Some(captured) = ctx.captured_fiber() {
			if Some(captured) != current_fiber {
				return Err(Error::cross_fiber_continuation());
			}
		}

		Ok(())
	}

	/// Invokes this continuation with `args`, applying the host's
	/// arity rule ([`HostThread::pack_args`]) to decide what the capture
	/// point sees: no arguments packs to the host's "nil", one argument
	/// passes through unwrapped, more than one is packed into an ordered
	/// sequence. Always diverges on success, jumping all the way back to
	/// the matching [`capture`] call; only returns at all if validation
	/// rejects the call.
	pub fn invoke(&self, host: &H, current_fiber: Option<u64>, args: &[H::Value]) -> Error {
		let value = host.pack_args(args);

		self.invoke_with(host, current_fiber, args.len() as i32, value)
	}

	/// Invokes this continuation, raising `value` at the capture point
	/// instead of returning it. Diverges the same way [`Continuation::invoke`]
	/// does.
	pub fn invoke_raising(&self, host: &H, current_fiber: Option<u64>, value: H::Value) -> Error {
		self.invoke_with(host, current_fiber, -1, value)
	}

	fn invoke_with(&self, host: &H, current_fiber: Option<u64>, arg_count: i32, value: H::Value) -> Error {
		if let Err(err) = self.validate(host, current_fiber) {
			return err;
		}

		self.jump(host, arg_count, value)
	}

	fn jump(&self, host: &H, arg_count: i32, value: H::Value) -> ! {
		let inner = self.inner_mut();

		inner.context.set_payload(arg_count, value);

		let machine_stack = inner.context.machine_stack();

		crate::trace!("continuation: jumping");

		stack::restore_padded(machine_stack, move || {
			// Safety: `restore_padded` only calls us once the active
			// frame is clear of this context's captured range, and
			// `validate` already confirmed we're on its owning thread.
			unsafe { self.inner().context.restore_into(host) };

			let buf = self.inner().context.jmpbuf();

			// Safety: `buf` was populated by the `jmp::set` in `capture`.
			unsafe { jmp::jump(buf, 1) }
		})
	}

	pub fn mark(&self, host: &H, mark_fn: &mut dyn FnMut(usize)) {
		self.inner().context.mark(host, mark_fn);
	}

	/// Frees the captured stacks.
	///
	/// # Safety
	/// No other `Continuation` handle referencing the same capture may
	/// still be reachable anywhere. The host's collector calls this
	/// exactly once, when it determines the capture can never be invoked
	/// again.
	pub unsafe fn destroy(self) {
		// Safety: guaranteed by caller.
		drop(unsafe { Box::from_raw(self.0.as_mut_ptr()) });
	}
}

impl<H: HostThread> gc::Retained for Continuation<H> {
	fn retained_bytes(&self) -> usize {
		self.inner().context.retained_bytes()
	}
}
