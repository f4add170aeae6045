//! Crate-wide error type.
//!
//! No OS error representation here (this crate never makes syscalls
//! directly) and no compact-error derive macro (there's exactly one
//! error type in this crate, so the space savings such a macro buys a
//! crate with hundreds of call sites doesn't pay for the extra
//! dependency). A `Result` alias, an `ErrorKind` callers can match on,
//! an optional message that's only paid for when actually supplied, and
//! an [`ErrorContext`] extension trait for `.context(...)`/
//! `.with_context(...)` chaining on a `Result`.

use std::error;
use std::fmt::{self, Debug, Display, Formatter};
use std::result;

mod kind;

pub use kind::ErrorKind;

pub type Result<T> = result::Result<T, Error>;

enum Message {
	Static(&'static str),
	Owned(String)
}

impl AsRef<str> for Message {
	fn as_ref(&self) -> &str {
		match self {
			Self::Static(val) => val,
			Self::Owned(val) => val
		}
	}
}

impl From<&'static str> for Message {
	fn from(value: &'static str) -> Self {
		Self::Static(value)
	}
}

impl From<String> for Message {
	fn from(value: String) -> Self {
		Self::Owned(value)
	}
}

pub struct Error {
	kind: ErrorKind,
	message: Option<Message>,
	source: Option<Box<dyn error::Error + Send + Sync + 'static>>
}

impl Error {
	#[must_use]
	pub fn new<M>(kind: ErrorKind, message: M) -> Self
	where
		M: Into<Message>
	{
		Self { kind, message: Some(message.into()), source: None }
	}

	#[must_use]
	pub const fn from_kind(kind: ErrorKind) -> Self {
		Self { kind, message: None, source: None }
	}

	#[must_use]
	pub fn with_source<M, E>(kind: ErrorKind, message: M, source: E) -> Self
	where
		M: Into<Message>,
		E: Into<Box<dyn error::Error + Send + Sync + 'static>>
	{
		Self {
			kind,
			message: Some(message.into()),
			source: Some(source.into())
		}
	}

	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		self.kind
	}

	#[must_use]
	pub const fn is(&self, kind: ErrorKind) -> bool {
		// `ErrorKind` derives `PartialEq`, but that's not `const`.
		self.kind as u8 == kind as u8
	}

	/// Wraps `self` with an additional layer of context, displayed in
	/// place of the original message with the original kept reachable
	/// through [`error::Error::source`].
	#[must_use]
	pub fn context<C>(self, context: C) -> Self
	where
		C: Display + Send + Sync + 'static
	{
		let kind = self.kind;

		Self { kind, message: Some(Message::Owned(context.to_string())), source: Some(Box::new(self)) }
	}
}

/// Extension trait for chaining context onto a `Result`'s error without
/// an intermediate `map_err`.
pub trait ErrorContext<T> {
	fn context<C>(self, context: C) -> Result<T>
	where
		C: Display + Send + Sync + 'static;

	fn with_context<C, F>(self, context: F) -> Result<T>
	where
		C: Display + Send + Sync + 'static,
		F: FnOnce() -> C;
}

impl<T> ErrorContext<T> for Result<T> {
	fn context<C>(self, context: C) -> Self
	where
		C: Display + Send + Sync + 'static
	{
		self.with_context(|| context)
	}

	fn with_context<C, F>(self, context: F) -> Self
	where
		C: Display + Send + Sync + 'static,
		F: FnOnce() -> C
	{
		match self {
			Ok(ok) => Ok(ok),
			Err(err) => Err(err.context(context()))
		}
	}
}

macro_rules! kind_ctor {
	($name:ident, $kind:ident, $doc:literal) => {
		impl Error {
			#[doc = $doc]
			#[must_use]
			pub const fn $name() -> Self {
				Self::from_kind(ErrorKind::$kind)
			}
		}
	};
}

kind_ctor!(
	cross_thread_transfer,
	CrossThreadTransfer,
	"A continuation captured on one thread was invoked from another."
);
kind_ctor!(
	cross_tag_barrier,
	CrossTagBarrier,
	"A continuation was invoked outside the dynamic extent of the block that captured it."
);
kind_ctor!(
	cross_fiber_continuation,
	CrossFiberContinuation,
	"A continuation was invoked from a fiber other than the one that captured it."
);
kind_ctor!(
	double_resume,
	DoubleResume,
	"A fiber or continuation was invoked while it was already running."
);
kind_ctor!(
	dead_fiber,
	DeadFiber,
	"A fiber was transferred into or resumed after it already finished."
);
kind_ctor!(
	yield_from_root,
	YieldFromRoot,
	"`yield_now` was called from a thread's root fiber."
);

impl Debug for Error {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = fmt.debug_struct("Error");

		debug.field("kind", &self.kind);

		if let Some(message) = &self.message {
			debug.field("message", &message.as_ref());
		}

		if let Some(source) = &self.source {
			debug.field("source", source);
		}

		debug.finish()
	}
}

impl Display for Error {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		match &self.message {
			Some(message) => Display::fmt(message.as_ref(), fmt),
			None => Display::fmt(&self.kind, fmt)
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		self.source.as_ref().map(|err| &**err as &(dyn error::Error + 'static))
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Self {
		Self::from_kind(kind)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn kind_round_trips_through_display() {
		let err = Error::dead_fiber();

		assert!(err.is(ErrorKind::DeadFiber));
		assert_eq!(err.to_string(), ErrorKind::DeadFiber.as_str());
	}

	#[test]
	fn message_overrides_kind_display() {
		let err = Error::new(ErrorKind::InvalidInput, "expected exactly one argument");

		assert_eq!(err.to_string(), "expected exactly one argument");
	}
}
