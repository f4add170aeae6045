//! The shared capture record underlying both continuations and fibers.
//!
//! A `Context<H>` owns everything a non-local jump needs to land safely:
//! a copy of the live value stack, a copy of the live machine stack, a
//! jump buffer, and the host's own snapshot of its mutable control-flow
//! state. Nothing here is specific to continuations or to fibers; both
//! are built by giving a `Context` a `ContextKind` and, for fibers,
//! wrapping it with scheduling fields (see [`crate::fiber`]).

use crate::host::HostThread;
use crate::{gc, jmp, stack};

/// Whether a `Context` should capture the whole value stack or only the
/// live-data/control-frame split. Exposed as a documented default; a
/// `HostThread` implementation decides for itself which form it's able
/// to produce cheaply and returns the matching [`ValueStack`] variant
/// from [`HostThread::capture_value_stack`].
pub const CAPTURE_JUST_VALID_STACK: bool = true;

/// A captured value stack, in one of two forms a `HostThread` may
/// produce.
pub enum ValueStack<V> {
	/// A copy of the entire value-stack region.
	Full(Box<[V]>),

	/// The live-data prefix `[base, sp + mark_len)` and the live
	/// control-frame suffix `[cfp, stack + size)`, captured and stored
	/// separately. Restoring a `Split` stack copies the suffix to the
	/// *end* of the target stack, not back to its original offset, since
	/// the target may have a different total size than the stack the
	/// split was captured from.
	Split { prefix: Box<[V]>, suffix: Box<[V]> }
}

impl<V> ValueStack<V> {
	#[must_use]
	pub fn len(&self) -> usize {
		match self {
			Self::Full(buf) => buf.len(),
			Self::Split { prefix, suffix } => prefix.len() + suffix.len()
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Which of the three capture-time roles a `Context` plays.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContextKind {
	Continuation,
	Fiber,
	RootFiber
}

/// The full capture record shared by continuations and fibers.
pub struct Context<H: HostThread> {
	kind: ContextKind,

	/// Semantics depend on `kind`: for a continuation re-entry or fiber
	/// transfer, `-1` means "raise `value_payload` as an exception",
	/// otherwise it's the argument count the payload was packed from.
	arg_count: i32,
	value_payload: Option<H::Value>,

	value_stack: ValueStack<H::Value>,
	machine_stack: stack::MachineStack,
	saved_thread: H::Snapshot,

	/// Identity of the handler-tag chain in effect when this was
	/// captured.
	tag_chain_root: u64,

	/// Zeroed until the first `jmp::set` targeting this context actually
	/// runs; a freshly-created fiber context has nothing to jump back to
	/// yet (see [`crate::fiber`]).
	jmpbuf: jmp::JumpBuf,

	/// Host thread identity this context was captured on.
	thread_id: std::thread::ThreadId,

	/// Identity of the fiber running at capture time, if any: a
	/// continuation captured inside a fiber may only be invoked from
	/// that same fiber. Opaque to this module; `fiber` hands these out
	/// and compares them.
	captured_fiber: Option<u64>
}

impl<H: HostThread> Context<H> {
	/// Captures the current value stack and the machine stack between
	/// `host.stack_start()` and `current_sp`.
	///
	/// # Safety
	/// `current_sp` must point at (or above, in the growth direction) a
	/// local variable live in the caller's frame, so the captured range
	/// covers every live frame back to `stack_start`.
	#[must_use]
	pub unsafe fn capture(
		host: &H, kind: ContextKind, current_sp: *mut usize, captured_fiber: Option<u64>
	) -> Self {
		host.spill_registers();

		let start = host.stack_start().cast::<usize>();

		/* Safety: guaranteed by caller */
		let machine_stack = unsafe { stack::MachineStack::capture(start..current_sp) };

		crate::trace!("captured context kind={kind:?} words={}", machine_stack.len());

		Self {
			kind,
			arg_count: 0,
			value_payload: None,
			value_stack: host.capture_value_stack(),
			machine_stack,
			saved_thread: host.snapshot(),
			tag_chain_root: host.tag_chain_root(),
			jmpbuf: jmp::JumpBuf::new(),
			thread_id: std::thread::current().id(),
			captured_fiber
		}
	}

	#[must_use]
	pub const fn kind(&self) -> ContextKind {
		self.kind
	}

	#[must_use]
	pub const fn thread_id(&self) -> std::thread::ThreadId {
		self.thread_id
	}

	#[must_use]
	pub const fn tag_chain_root(&self) -> u64 {
		self.tag_chain_root
	}

	#[must_use]
	pub const fn captured_fiber(&self) -> Option<u64> {
		self.captured_fiber
	}

	#[must_use]
	pub const fn arg_count(&self) -> i32 {
		self.arg_count
	}

	#[must_use]
	pub fn value_payload(&self) -> Option<H::Value> {
		self.value_payload
	}

	/// Stores the payload and arg count a transfer will resume this
	/// context with. `arg_count == -1` means "raise".
	pub fn set_payload(&mut self, arg_count: i32, value: H::Value) {
		self.arg_count = arg_count;
		self.value_payload = Some(value);
	}

	pub(crate) fn jmpbuf_mut(&mut self) -> *mut jmp::JumpBuf {
		std::ptr::addr_of_mut!(self.jmpbuf)
	}

	pub(crate) fn jmpbuf(&self) -> *const jmp::JumpBuf {
		std::ptr::addr_of!(self.jmpbuf)
	}

	pub(crate) const fn machine_stack(&self) -> &stack::MachineStack {
		&self.machine_stack
	}

	/// Copies this context's saved stacks back into the live thread and
	/// restores its thread snapshot. Does not perform the jump itself;
	/// callers pair this with [`crate::jmp::jump`] on
	/// [`Context::jmpbuf`].
	///
	/// # Safety
	/// Must run on `self.thread_id()`, and the active machine-stack
	/// frame must already be clear of `self`'s captured range (see
	/// [`stack::restore_padded`]).
	pub unsafe fn restore_into(&self, host: &H) {
		debug_assert_eq!(std::thread::current().id(), self.thread_id);

		host.restore_value_stack(&self.value_stack);

		/* Safety: guaranteed by caller */
		unsafe { self.machine_stack.copy_back() };

		host.restore(self.saved_thread);

		crate::trace!("restored context kind={:?}", self.kind);
	}
}

impl<H: HostThread> Context<H> {
	/// Marks everything reachable from this context: the value payload,
	/// the saved thread snapshot's reachable fields, and (conceptually)
	/// the live word range of the saved stacks. Takes `host` by
	/// reference rather than implementing a trace trait, because marking
	/// a `Value` requires the host (it's the host that knows which words
	/// in an opaque `Value` are pointers); callers invoke this from
	/// their GC's mark callback, which always has a `&H` on hand.
	pub fn mark(&self, host: &H, mark_fn: &mut dyn FnMut(usize)) {
		if let Some(value) = &self.value_payload {
			host.trace_value(value, mark_fn);
		}

		host.trace_snapshot(&self.saved_thread, mark_fn);
	}
}

impl<H: HostThread> gc::Retained for Context<H> {
	fn retained_bytes(&self) -> usize {
		let value_words = self.value_stack.len();

		self.machine_stack.len() * std::mem::size_of::<usize>()
			+ value_words * std::mem::size_of::<H::Value>()
	}
}
