//! Thin, explicit wrappers around raw pointers.
//!
//! The rest of the crate deliberately manipulates raw memory (saved stack
//! images, jump buffers) that can't be expressed through `&`/`&mut`
//! borrows, since the referent may not currently correspond to live Rust
//! objects (a `Context`'s saved machine stack is a byte-for-byte copy of
//! frames that, at capture time, belong to someone else). `Ptr`/`MutPtr`
//! make every such access `unsafe` at the point of dereference instead of
//! threading raw `*const`/`*mut` through signatures.

use std::fmt::{self, Debug, Formatter};

#[repr(transparent)]
pub struct Ptr<T: ?Sized> {
	ptr: *const T
}

#[repr(transparent)]
pub struct MutPtr<T: ?Sized> {
	ptr: *mut T
}

impl<T: ?Sized> Ptr<T> {
	#[must_use]
	pub const fn is_null(&self) -> bool {
		self.ptr.is_null()
	}

	#[must_use]
	pub const fn as_ptr(self) -> *const T {
		self.ptr
	}

	#[must_use]
	pub const fn cast<U>(self) -> Ptr<U> {
		Ptr { ptr: self.ptr.cast() }
	}

	#[must_use]
	pub const fn cast_mut(self) -> MutPtr<T> {
		MutPtr { ptr: self.ptr.cast_mut() }
	}

	/// # Safety
	/// `self` must not be null and must point to a live, initialized `T`
	/// that no `&mut T` aliases for the duration of `'a`.
	#[must_use]
	pub unsafe fn as_ref<'a>(self) -> &'a T {
		crate::macros::assert_unsafe_precondition!(!self.ptr.is_null());

		/* Safety: guaranteed by caller */
		unsafe { &*self.ptr }
	}
}

impl<T> Ptr<T> {
	#[must_use]
	pub const fn null() -> Self {
		Self { ptr: std::ptr::null() }
	}

	#[must_use]
	pub const fn from_addr(addr: usize) -> Self {
		Self { ptr: addr as *const T }
	}

	#[must_use]
	pub fn addr(self) -> usize {
		self.ptr as usize
	}
}

impl<T: ?Sized> MutPtr<T> {
	#[must_use]
	pub const fn is_null(&self) -> bool {
		self.ptr.is_null()
	}

	#[must_use]
	pub const fn as_mut_ptr(self) -> *mut T {
		self.ptr
	}

	#[must_use]
	pub const fn cast<U>(self) -> MutPtr<U> {
		MutPtr { ptr: self.ptr.cast() }
	}

	#[must_use]
	pub const fn cast_const(self) -> Ptr<T> {
		Ptr { ptr: self.ptr.cast_const() }
	}

	/// # Safety
	/// See [`Ptr::as_ref`].
	#[must_use]
	pub unsafe fn as_ref<'a>(self) -> &'a T {
		/* Safety: guaranteed by caller */
		unsafe { self.cast_const().as_ref() }
	}

	/// # Safety
	/// `self` must not be null and must point to a live, initialized `T`
	/// with no other live reference to it for the duration of `'a`.
	#[must_use]
	pub unsafe fn as_mut<'a>(self) -> &'a mut T {
		crate::macros::assert_unsafe_precondition!(!self.ptr.is_null());

		/* Safety: guaranteed by caller */
		unsafe { &mut *self.ptr }
	}
}

impl<T> MutPtr<T> {
	#[must_use]
	pub const fn null() -> Self {
		Self { ptr: std::ptr::null_mut() }
	}

	#[must_use]
	pub const fn from_addr(addr: usize) -> Self {
		Self { ptr: addr as *mut T }
	}

	#[must_use]
	pub fn addr(self) -> usize {
		self.ptr as usize
	}

	/// # Safety
	/// See [`std::ptr::write`].
	pub unsafe fn write(self, value: T) {
		/* Safety: guaranteed by caller */
		unsafe { self.ptr.write(value) };
	}
}

impl<T: ?Sized> Clone for Ptr<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T: ?Sized> Copy for Ptr<T> {}

impl<T: ?Sized> Clone for MutPtr<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T: ?Sized> Copy for MutPtr<T> {}

impl<T: ?Sized> PartialEq for Ptr<T> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self.ptr, other.ptr)
	}
}

impl<T: ?Sized> Eq for Ptr<T> {}

impl<T: ?Sized> PartialEq for MutPtr<T> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self.ptr, other.ptr)
	}
}

impl<T: ?Sized> Eq for MutPtr<T> {}

impl<T: Sized> Default for Ptr<T> {
	fn default() -> Self {
		Self::null()
	}
}

impl<T: Sized> Default for MutPtr<T> {
	fn default() -> Self {
		Self::null()
	}
}

impl<T: ?Sized> Debug for Ptr<T> {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		Debug::fmt(&self.ptr, fmt)
	}
}

impl<T: ?Sized> Debug for MutPtr<T> {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
		Debug::fmt(&self.ptr, fmt)
	}
}

impl<T: ?Sized> From<*const T> for Ptr<T> {
	fn from(ptr: *const T) -> Self {
		Self { ptr }
	}
}

impl<T: ?Sized> From<&T> for Ptr<T> {
	fn from(value: &T) -> Self {
		Self { ptr: value }
	}
}

impl<T: ?Sized> From<*mut T> for MutPtr<T> {
	fn from(ptr: *mut T) -> Self {
		Self { ptr }
	}
}

impl<T: ?Sized> From<&mut T> for MutPtr<T> {
	fn from(value: &mut T) -> Self {
		Self { ptr: value }
	}
}
