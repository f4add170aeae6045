//! Cooperative fibers and first-class, multi-shot continuations over a
//! generic host thread.
//!
//! The host language is the thing that owns a value stack, a
//! machine-stack-walking interpreter loop, and a notion of handler-tag
//! dynamic extents; this crate owns capturing and restoring all three
//! together as a unit (a [`context::Context`]), and the two higher-level
//! constructs built on top of it: [`fiber`], a ring of cooperatively
//! scheduled call chains, and [`continuation`], a multi-shot capture of
//! "everything between here and some earlier point still on the stack".
//! Nothing in here is specific to any one host language — see
//! [`host::HostThread`] for the boundary.

pub mod context;
pub mod continuation;
pub mod error;
pub mod fiber;
pub mod gc;
pub mod host;
pub mod jmp;
pub mod log;
pub mod macros;
pub mod opt;
pub mod pointer;
mod runtime;
pub mod stack;

extern crate self as coro_core;

#[cfg(feature = "logger")]
pub extern crate ctor;
#[cfg(feature = "logger")]
pub extern crate lazy_static;
