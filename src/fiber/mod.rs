//! Cooperative, single-threaded fibers built on top of [`crate::context`]
//! and [`crate::jmp`].
//!
//! A fiber here is never given its own machine stack to switch onto. A
//! brand-new fiber's first entry runs as a perfectly ordinary, synchronous
//! Rust call on top of whatever call chain resumed it (there is no
//! previously-captured stack image to jump into yet); only once a fiber
//! has suspended at least once does switching into it become a real
//! `jmp::jump`, landing back inside the call it suspended from.
//!
//! A [`Scheduler`] owns every [`Fiber`] it creates and is `!Send`/`!Sync`
//! by construction (it holds raw pointers): the whole fiber ring is
//! confined to one host thread for its entire lifetime, which is the
//! crate's answer to the thread-affinity invariant for fibers — there's
//! no runtime check to write because the type system already makes
//! moving a `Scheduler` (and everything reachable from it) to another
//! thread impossible. Continuations, which are values rather than a
//! ring owned by one scheduler, still need a runtime check; see
//! [`crate::continuation`].

use std::cell::Cell;
use std::marker::PhantomData;

use crate::context::{Context, ContextKind};
use crate::error::{Error, Result};
use crate::host::HostThread;
use crate::pointer::MutPtr;
use crate::{gc, jmp, stack};

mod pool;
use pool::Pool;

/// A fiber's lifecycle state: `Created` `->` `Running` `->` `Terminated`,
/// with no transition back out of `Running`. `Running` covers a fiber's entire
/// active lifetime from its first resume/transfer onward, whether or not
/// it's the one actually executing at this instant — "who's executing
/// right now" is tracked separately, by [`Scheduler::current`], and
/// "can this particular fiber be resumed right now" by its `prev` field,
/// not by a fourth status.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
	/// Created, never entered. Has an `entry` to call and no `Context`
	/// yet.
	Created,
	/// Entered at least once; has a `Context` to jump back into once it's
	/// not the currently executing fiber.
	Running,
	/// Ran its entry to completion or had it forward a raise; no longer
	/// resumable.
	Terminated
}

type Entry<H> = Box<dyn FnOnce(<H as HostThread>::Value) -> Transfer<H>>;

struct Inner<H: HostThread> {
	context: Option<Context<H>>,
	entry: Option<Entry<H>>,
	stack_words: usize,
	/// Who to forward termination, or a plain [`Scheduler::yield_now`], to.
	/// Set by [`Scheduler::resume`] just before switching in; left alone
	/// by [`Scheduler::transfer`], which is symmetric and has no implied
	/// return target.
	prev: Option<Fiber<H>>,
	status: Status,
	ring_prev: Fiber<H>,
	ring_next: Fiber<H>
}

/// A cheap, `Copy` handle to a fiber owned by some [`Scheduler`].
///
/// Modeled as a raw pointer rather than `Rc<RefCell<_>>`, for the same
/// reason [`crate::pointer`] gives for existing at all: the ring these
/// handles live in is mutated from callback-like contexts (a resume
/// landing back inside a suspended `yield_now` call) that don't nest into
/// an ordinary borrow scope.
pub struct Fiber<H: HostThread>(MutPtr<Inner<H>>);

impl<H: HostThread> Clone for Fiber<H> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<H: HostThread> Copy for Fiber<H> {}

impl<H: HostThread> PartialEq for Fiber<H> {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl<H: HostThread> Eq for Fiber<H> {}

impl<H: HostThread> Fiber<H> {
	/// Value-stack size handed to [`HostThread::new_fiber_snapshot`] for a
	/// fiber created through [`Scheduler::new_fiber`].
	pub const DEFAULT_STACK_WORDS: usize = 8192;

	fn inner(&self) -> &Inner<H> {
		// Safety: a `Fiber` handle is only ever handed out for the
		// lifetime of the `Scheduler` that allocated its node; the node
		// is freed only by `Pool::give`'s drop branch or
		// `Scheduler::drop`, neither of which can run while this handle
		// is reachable (it would have to have been reclaimed first,
		// which unlinks it from the ring and from anyone's `prev`).
		unsafe { self.0.as_ref() }
	}

	fn inner_mut(&self) -> &mut Inner<H> {
		// Safety: see `inner`.
		unsafe { self.0.as_mut() }
	}

	/// An opaque, stable identity for this fiber — its node's address.
	/// Used by [`Context`] to record "captured inside this fiber" without
	/// `crate::context` depending on `crate::fiber`'s types.
	#[must_use]
	pub fn identity(self) -> u64 {
		self.0.addr() as u64
	}

	#[must_use]
	pub fn status(self) -> Status {
		self.inner().status
	}

	/// Marks everything reachable from this fiber's suspended `Context`,
	/// if it has one (a never-started or currently-running fiber has
	/// nothing captured to trace).
	pub fn mark(self, host: &H, mark_fn: &mut dyn FnMut(usize)) {
		if let Some(ctx) = self.inner().context.as_ref() {
			ctx.mark(host, mark_fn);
		}
	}
}

impl<H: HostThread> gc::Retained for Fiber<H> {
	fn retained_bytes(&self) -> usize {
		self.inner().context.as_ref().map_or(0, gc::Retained::retained_bytes)
	}
}

/// The outcome of a fiber running to completion: either it returned a
/// value normally, or its entry forwarded a host-level raise (the
/// host's own job to catch and wrap, not this crate's).
pub enum Transfer<H: HostThread> {
	Returned(H::Value),
	Raised(H::Value)
}

/// Owns a ring of fibers plus the root (non-fiber) context execution
/// started on. `!Send`/`!Sync` via `_not_send_sync`, on top of already
/// being so through its raw pointers — see the module doc comment.
pub struct Scheduler<H: HostThread> {
	root: Fiber<H>,
	current: Cell<Fiber<H>>,
	pool: Pool<H>,
	_not_send_sync: PhantomData<*const ()>
}

impl<H: HostThread> Scheduler<H> {
	/// Creates a scheduler with just a root fiber, representing the host
	/// thread's own, pre-existing call chain. The root's `Context` isn't
	/// captured here; it's captured lazily, the first time the root
	/// resumes or transfers into something, exactly like any other
	/// fiber suspending.
	#[must_use]
	pub fn new(_host: &H) -> Self {
		let root_ptr: *mut Inner<H> = Box::into_raw(Box::new(Inner {
			context: None,
			entry: None,
			stack_words: 0,
			prev: None,
			status: Status::Running,
			ring_prev: Fiber(MutPtr::null()),
			ring_next: Fiber(MutPtr::null())
		}));

		let root = Fiber(MutPtr::from(root_ptr));

		{
			let inner = root.inner_mut();

			inner.ring_prev = root;
			inner.ring_next = root;
		}

		crate::trace!("scheduler: root fiber created");

		Self { root, current: Cell::new(root), pool: Pool::new(), _not_send_sync: PhantomData }
	}

	#[must_use]
	pub fn root(&self) -> Fiber<H> {
		self.root
	}

	#[must_use]
	pub fn current(&self) -> Fiber<H> {
		self.current.get()
	}

	pub fn pool(&mut self) -> &mut Pool<H> {
		&mut self.pool
	}

	/// Number of fibers in the ring, root included.
	#[must_use]
	pub fn ring_len(&self) -> usize {
		let mut count = 1;
		let mut cur = self.root.inner().ring_next;

		while cur != self.root {
			count += 1;
			cur = cur.inner().ring_next;
		}

		count
	}

	#[must_use]
	pub fn new_fiber(&mut self, entry: impl FnOnce(H::Value) -> Transfer<H> + 'static) -> Fiber<H> {
		self.new_fiber_with_stack(entry, Fiber::<H>::DEFAULT_STACK_WORDS)
	}

	#[must_use]
	pub fn new_fiber_with_stack(
		&mut self, entry: impl FnOnce(H::Value) -> Transfer<H> + 'static, stack_words: usize
	) -> Fiber<H> {
		let ptr = self.pool.take().unwrap_or_else(|| {
			crate::trace!("fiber: allocating new node");

			MutPtr::from(Box::into_raw(Box::new(Inner {
				context: None,
				entry: None,
				stack_words: 0,
				prev: None,
				status: Status::Created,
				ring_prev: self.root,
				ring_next: self.root
			})))
		});

		let fiber = Fiber(ptr);

		{
			let inner = fiber.inner_mut();

			inner.context = None;
			inner.entry = Some(Box::new(entry));
			inner.stack_words = stack_words;
			inner.prev = None;
			inner.status = Status::Created;
		}

		let old_next = self.root.inner().ring_next;

		fiber.inner_mut().ring_prev = self.root;
		fiber.inner_mut().ring_next = old_next;
		self.root.inner_mut().ring_next = fiber;
		old_next.inner_mut().ring_prev = fiber;

		fiber
	}

	fn reclaim(&mut self, fiber: Fiber<H>) {
		let (prev, next) = {
			let inner = fiber.inner();

			(inner.ring_prev, inner.ring_next)
		};

		prev.inner_mut().ring_next = next;
		next.inner_mut().ring_prev = prev;

		let live = self.ring_len();

		self.pool.give(fiber.0, live);
	}

	/// Shared validation for `resume`/`transfer`: the target isn't dead,
	/// isn't being raised into before it's ever been entered, and — if
	/// it's suspended somewhere inside a handler-tag dynamic extent — is
	/// only being switched into from within that same extent.
	fn validate(host: &H, target: Fiber<H>, arg_count: i32) -> Result<()> {
		match target.status() {
			Status::Terminated => return Err(Error::dead_fiber()),
			Status::Created if arg_count == -1 => return Err(Error::dead_fiber()),
			Status::Created | Status::Running => {}
		}

		if let Some(ctx) = target.inner().context.as_ref() {
			if ctx.tag_chain_root() != host.tag_chain_root() {
				return Err(Error::cross_tag_barrier());
			}
		}

		Ok(())
	}

	/// Resumes `target` with `args` (packed through [`HostThread::pack_args`],
	/// same arity rule as [`crate::continuation::Continuation::invoke`]),
	/// recording `current()` as what it should return to when it next
	/// yields or terminates. On top of `transfer`'s validation: a
	/// `target` that's already got a resumer recorded (its `prev` is
	/// non-null) is already live on some other call chain, so re-entering
	/// it here would be a double resume.
	pub fn resume(&mut self, host: &H, target: Fiber<H>, args: &[H::Value]) -> Result<Transfer<H>> {
		let value = host.pack_args(args);

		self.resume_with(host, target, args.len() as i32, value)
	}

	/// Resumes `target`, raising `value` at its suspension point instead
	/// of returning it. Same bookkeeping as [`Scheduler::resume`]
	/// otherwise.
	pub fn resume_raising(&mut self, host: &H, target: Fiber<H>, value: H::Value) -> Result<Transfer<H>> {
		self.resume_with(host, target, -1, value)
	}

	fn resume_with(&mut self, host: &H, target: Fiber<H>, arg_count: i32, value: H::Value) -> Result<Transfer<H>> {
		Self::validate(host, target, arg_count)?;

		if target.inner().prev.is_some() {
			return Err(Error::double_resume());
		}

		target.inner_mut().prev = Some(self.current());

		self.switch_into(host, target, arg_count, value)
	}

	/// Symmetric hand-off to `target` with `args`, packed the same way
	/// [`Scheduler::resume`] packs them: no return target is recorded,
	/// unlike [`Scheduler::resume`].
	pub fn transfer(&mut self, host: &H, target: Fiber<H>, args: &[H::Value]) -> Result<Transfer<H>> {
		let value = host.pack_args(args);

		self.transfer_with(host, target, args.len() as i32, value)
	}

	/// Symmetric hand-off to `target`, raising `value` instead of
	/// returning it.
	pub fn transfer_raising(&mut self, host: &H, target: Fiber<H>, value: H::Value) -> Result<Transfer<H>> {
		self.transfer_with(host, target, -1, value)
	}

	fn transfer_with(&mut self, host: &H, target: Fiber<H>, arg_count: i32, value: H::Value) -> Result<Transfer<H>> {
		Self::validate(host, target, arg_count)?;

		self.switch_into(host, target, arg_count, value)
	}

	/// Suspends the current fiber back to whoever resumed it, with
	/// `args` packed the same way [`Scheduler::resume`] packs them.
	/// Errors if called on the root fiber, which nothing ever resumed
	/// into and so has nowhere to yield to.
	pub fn yield_now(&mut self, host: &H, args: &[H::Value]) -> Result<Transfer<H>> {
		let value = host.pack_args(args);

		self.yield_with(host, args.len() as i32, value)
	}

	/// Suspends the current fiber back to whoever resumed it, raising
	/// `value` instead of returning it.
	pub fn yield_raising(&mut self, host: &H, value: H::Value) -> Result<Transfer<H>> {
		self.yield_with(host, -1, value)
	}

	fn yield_with(&mut self, host: &H, arg_count: i32, value: H::Value) -> Result<Transfer<H>> {
		let current = self.current();

		if current == self.root {
			return Err(Error::yield_from_root());
		}

		let target = current.inner().prev.unwrap_or(self.root);

		// So `current` can be resumed again.
		current.inner_mut().prev = None;

		self.switch_into(host, target, arg_count, value)
	}

	/// The core transfer primitive shared by `resume`/`transfer`/
	/// `yield_now`. Captures the current fiber's `Context` in this exact
	/// frame via `jmp::set`'s "returns twice" trick, then either runs a
	/// never-started `target` as a plain call or jumps into its saved
	/// context.
	fn switch_into(&mut self, host: &H, target: Fiber<H>, arg_count: i32, value: H::Value) -> Result<Transfer<H>> {
		let fresh = target.inner().context.is_none();

		if fresh && arg_count == -1 {
			return Err(Error::dead_fiber());
		}

		let from = self.current();

		let frontier = 0usize;
		let current_sp = std::ptr::addr_of!(frontier).cast_mut();

		// Safety: `current_sp` is the address of a local declared at the
		// top of this frame, so the captured range covers everything
		// this frame and its callers still have live.
		let mut ctx = unsafe { Context::capture(host, ContextKind::Fiber, current_sp, Some(from.identity())) };

		// Safety: `ctx` was just captured in this very frame; nothing has
		// jumped into its buffer yet.
		let rc = unsafe { jmp::set(ctx.jmpbuf_mut()) };

		if rc != 0 {
			// We're back: someone jumped into `from`'s saved context.
			self.current.set(from);

			let ctx = from.inner().context.as_ref().expect("fiber context missing on reentry");
			let arg_count = ctx.arg_count();
			let value = ctx.value_payload().expect("reentry with no payload");

			return Ok(if arg_count == -1 { Transfer::Raised(value) } else { Transfer::Returned(value) });
		}

		from.inner_mut().context = Some(ctx);
		target.inner_mut().status = Status::Running;
		self.current.set(target);

		if fresh {
			self.run_fresh(host, target, arg_count, value)
		} else {
			target
				.inner_mut()
				.context
				.as_mut()
				.expect("checked not fresh above")
				.set_payload(arg_count, value);

			self.jump_into(host, target)
		}
	}

	/// First entry of a never-started fiber: an ordinary synchronous
	/// call, not a jump (there is nothing to jump into yet). Never
	/// returns — once `entry` completes, control is forwarded to
	/// whoever should receive the termination via a real `jmp::jump`,
	/// abandoning this call chain for good. That's harmless: nothing
	/// will ever try to return through these frames.
	fn run_fresh(&mut self, host: &H, target: Fiber<H>, _arg_count: i32, value: H::Value) -> ! {
		let stack_words = target.inner().stack_words;

		host.restore(host.new_fiber_snapshot(stack_words));

		let entry = target.inner_mut().entry.take().expect("fresh fiber missing entry");

		crate::trace!("fiber: starting");

		let result = entry(value);

		target.inner_mut().status = Status::Terminated;

		crate::trace!("fiber: terminated");

		self.forward_termination(host, target, result)
	}

	/// Forwards a fiber's outcome to whoever resumed it, or to root if it
	/// was reached via `transfer`/has no recorded resumer.
	fn forward_termination(&mut self, host: &H, target: Fiber<H>, result: Transfer<H>) -> ! {
		let return_to = target.inner().prev.unwrap_or(self.root);

		self.reclaim(target);

		self.current.set(return_to);

		let (arg_count, payload) = match result {
			Transfer::Returned(value) => (0, value),
			Transfer::Raised(value) => (-1, value)
		};

		return_to
			.inner_mut()
			.context
			.as_mut()
			.expect("return target has never suspended")
			.set_payload(arg_count, payload);

		self.jump_into(host, return_to)
	}

	/// Restores `target`'s saved stacks and thread snapshot, then jumps
	/// into its buffer. Diverges: control never returns here, only ever
	/// into the `jmp::set` call site that produced `target`'s context.
	fn jump_into(&mut self, host: &H, target: Fiber<H>) -> ! {
		let inner = target.inner();
		let ctx = inner.context.as_ref().expect("jump target missing context");
		let machine_stack = ctx.machine_stack();

		stack::restore_padded(machine_stack, move || {
			// Safety: `restore_padded` only calls us once the active
			// frame is clear of `ctx`'s captured range, and we're on the
			// thread that produced it (checked inside `restore_into`).
			unsafe { ctx.restore_into(host) };

			let buf = ctx.jmpbuf();

			// Safety: `buf` was populated by the `jmp::set` that
			// produced `ctx`, in `switch_into`.
			unsafe { jmp::jump(buf, 1) }
		})
	}
}

impl<H: HostThread> Drop for Scheduler<H> {
	fn drop(&mut self) {
		let root = self.root;
		let mut cur = root.inner().ring_next;

		while cur != root {
			let next = cur.inner().ring_next;

			// Safety: a `Scheduler` owns every node in its ring; once
			// it's being dropped, no `Fiber` handle into this ring can
			// still be in use.
			drop(unsafe { Box::from_raw(cur.0.as_mut_ptr()) });

			cur = next;
		}

		// Safety: see above.
		drop(unsafe { Box::from_raw(root.0.as_mut_ptr()) });
	}
}
