//! The interface boundary with an external, non-moving garbage collector.
//!
//! The collector itself is out of scope here; this crate only owns
//! the three callback points it's required to answer: `mark`, `free`,
//! `memsize`. `free` maps to Rust's ordinary [`Drop`] instead of a
//! fourth trait method — there's no reason to hand-roll destruction when
//! the language already has a disciplined mechanism for it. The
//! collector is the thing that decides *when* a handle's last reference
//! goes away and the value can be dropped, not *how* dropping it works.
//!
//! `mark` has no trait of its own here: tracing a `Value` or a
//! `Snapshot` always needs a `&H` to interpret them (see
//! [`crate::host::HostThread::trace_value`]), so [`Context::mark`](crate::context::Context::mark),
//! [`Continuation::mark`](crate::continuation::Continuation::mark) and
//! [`Fiber::mark`](crate::fiber::Fiber::mark) are plain inherent methods
//! taking `host` as an argument rather than implementations of a
//! host-less `Trace` trait.

/// Implemented by anything the collector asks for a retained-byte count,
/// for diagnostics.
pub trait Retained {
	/// Bytes owned by `self`, not including `size_of::<Self>()` itself
	/// (the collector already accounts for the handle's own allocation).
	fn retained_bytes(&self) -> usize;
}
