use std::fmt::{self, Display, Formatter};

/// Coarse classification of an [`Error`](super::Error), in the style of
/// [`std::io::ErrorKind`]: stable enough to match on, open enough that new
/// variants can be added without breaking callers that only match the ones
/// they care about and fall through on `_`.
#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum ErrorKind {
	/// Argument count or shape didn't match what the callee expects
	/// (continuation invoked with the wrong arity, etc.).
	InvalidInput,

	/// Data captured earlier is no longer in a usable shape.
	InvalidData,

	/// Ran out of memory capturing or restoring a stack image.
	OutOfMemory,

	/// A continuation captured on one host thread was invoked from another.
	CrossThreadTransfer,

	/// A continuation escaped the dynamic extent of the tagged block that
	/// captured it.
	CrossTagBarrier,

	/// A fiber tried to resume or transfer into a continuation captured by
	/// a different fiber.
	CrossFiberContinuation,

	/// A fiber or continuation was invoked while already on the stack
	/// (re-entrant resume).
	DoubleResume,

	/// Transfer or resume targeted a fiber that has already finished
	/// running its body and freed its saved stack.
	DeadFiber,

	/// `yield_now` was called from the root fiber of a thread, which has
	/// nothing to yield to.
	YieldFromRoot,

	/// Anything else; callers should not rely on this being stable.
	Other
}

impl ErrorKind {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		use ErrorKind::*;

		match self {
			InvalidInput => "invalid input",
			InvalidData => "invalid data",
			OutOfMemory => "out of memory",
			CrossThreadTransfer => "continuation invoked on the wrong thread",
			CrossTagBarrier => "continuation invoked outside its capturing block",
			CrossFiberContinuation => "continuation invoked from the wrong fiber",
			DoubleResume => "fiber or continuation is already running",
			DeadFiber => "fiber has already terminated",
			YieldFromRoot => "cannot yield from a thread's root fiber",
			Other => "other error"
		}
	}
}

impl Display for ErrorKind {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		fmt.write_str(self.as_str())
	}
}
