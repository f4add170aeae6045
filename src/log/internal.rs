use std::any::type_name;
use std::fmt::Arguments;
use std::io::{Cursor, Result, Write};
use std::str::from_utf8;

pub use log::{log, log_enabled};

use super::Level;
use crate::pointer::Ptr;

fn get_struct_name<T: ?Sized>() -> &'static str {
	type_name::<T>().rsplit("::").next().unwrap_or("<unknown>")
}

fn format_struct<T: ?Sized>(write: &mut impl Write, addr: Ptr<T>, name: &str) -> Result<()> {
	write.write_fmt(format_args!(
		"@ {:0>8x} {: >13}",
		addr.addr() & u32::MAX as usize,
		name
	))
}

pub fn log_struct<T: ?Sized>(level: Level, addr: Ptr<T>, name: &str, args: Arguments<'_>) {
	let mut fmt_buf = Cursor::new([0u8; 64]);
	let _ = format_struct(&mut fmt_buf, addr, name);

	#[allow(clippy::cast_possible_truncation)]
	let pos = fmt_buf.position() as usize;

	log!(
		target: from_utf8(&fmt_buf.get_ref()[0..pos]).unwrap_or("<error>"),
		level,
		"{}",
		args
	);
}

#[inline(never)]
#[cold]
pub fn log_target<T: ?Sized>(level: Level, target: Ptr<T>, args: Arguments<'_>) {
	log_struct(level, target, get_struct_name::<T>(), args);
}

pub(super) fn print_fatal(thread_name: &str, fmt: Arguments<'_>) {
	log!(target: thread_name, Level::Error, "{}", fmt);
}

pub(super) fn print_backtrace(thread_name: &str) {
	let backtrace = std::backtrace::Backtrace::capture();

	log!(target: thread_name, Level::Error, "{:?}", backtrace);
}
