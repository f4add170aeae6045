//! The boundary between this crate and the embedding evaluator.
//!
//! Everything this crate needs to know about "the interpreter running on
//! top" is expressed as the [`HostThread`] trait instead of hardcoded
//! fields, so the same capture/restore/scheduling machinery serves any
//! evaluator willing to implement it. A `Context`/`Fiber` is generic over
//! one concrete `H: HostThread` for its whole lifetime — the host doesn't
//! change out from under a running fiber.

use crate::context::ValueStack;

/// A snapshot of a host thread's mutable, control-flow-relevant state.
///
/// This is the evaluator's ABI with this crate: the fields it contains
/// (call-frame pointer, handler-tag chain, pending error, and so on) are
/// entirely evaluator-owned. This crate only ever copies a `Snapshot` by
/// value at capture time and hands it back by value at restore time; it
/// never inspects a field.
pub trait HostThread {
	/// By-value copy of the thread's control-flow state. Must be plain old
	/// data: copying it must never alias or move ownership of anything the
	/// thread itself still holds live.
	type Snapshot: Copy;

	/// The evaluator's managed value type: whatever lives on the value
	/// stack and gets threaded through `transfer`/`resume`/`yield_now` as a
	/// payload.
	type Value: Copy;

	/// Copies out the thread's current control-flow state.
	fn snapshot(&self) -> Self::Snapshot;

	/// Installs a previously captured control-flow state as current.
	fn restore(&self, snapshot: Self::Snapshot);

	/// Opaque identity of the handler-tag chain currently in effect, the
	/// "stack rewinding barrier". Two snapshots taken under the same
	/// chain compare equal; crossing into or out of a tagged dynamic
	/// extent changes it.
	fn tag_chain_root(&self) -> u64;

	/// Spills any value-stack contents the evaluator is caching in
	/// registers or thread-local slots back into memory, so a subsequent
	/// [`capture_value_stack`](Self::capture_value_stack) sees the true
	/// contents.
	fn spill_registers(&self);

	/// Copies out the live portion of the value stack, in whichever form
	/// (`Full` or `Split`) the host can cheaply describe.
	fn capture_value_stack(&self) -> ValueStack<Self::Value>;

	/// Copies a previously captured value stack back into place.
	fn restore_value_stack(&self, stack: &ValueStack<Self::Value>);

	/// The fixed address at which this thread's machine stack begins
	/// (recorded once, at thread boot, by the host).
	fn stack_start(&self) -> *mut u8;

	/// Builds the `Snapshot` a brand-new fiber starts from: a fresh
	/// value-stack allocation of `stack_words` words with no live
	/// frames, everything else inherited from whatever's sensible as a
	/// blank slate.
	fn new_fiber_snapshot(&self, stack_words: usize) -> Self::Snapshot;

	/// Applies the arity rule of a transfer's argument list: zero
	/// arguments packs to the host's "nil"; one argument passes through
	/// unwrapped; more than one is packed into a host-managed ordered
	/// sequence.
	fn pack_args(&self, args: &[Self::Value]) -> Self::Value;

	/// Reports every address reachable from `value` to the collector. A
	/// plain integer/enum `Value` can leave this empty; a tagged-pointer
	/// `Value` reports the pointee.
	fn trace_value(&self, value: &Self::Value, mark: &mut dyn FnMut(usize));

	/// Reports every address reachable from a saved [`HostThread::Snapshot`]
	/// to the collector.
	fn trace_snapshot(&self, snapshot: &Self::Snapshot, mark: &mut dyn FnMut(usize));
}
