use std::arch::global_asm;
use std::mem::zeroed;

/// Callee-saved integer registers plus the resume `rip`/`rsp`, in the
/// System V AMD64 ABI. Mirrors a minimal `jmp_buf`.
#[repr(C)]
pub struct JumpBuf {
	rbx: u64,
	rbp: u64,
	r12: u64,
	r13: u64,
	r14: u64,
	r15: u64,
	rip: u64,
	rsp: u64
}

static_assertions::const_assert_eq!(std::mem::size_of::<JumpBuf>(), 8 * 8);

impl JumpBuf {
	#[must_use]
	pub fn new() -> Self {
		/* Safety: an all-zero `JumpBuf` is a valid, never-set value */
		unsafe { zeroed() }
	}
}

impl Default for JumpBuf {
	fn default() -> Self {
		Self::new()
	}
}

global_asm!(
	".text",
	".global coro_core_jmp_set_x64",
	"coro_core_jmp_set_x64:",
	"mov [rdi + 0], rbx",
	"mov [rdi + 8], rbp",
	"mov [rdi + 16], r12",
	"mov [rdi + 24], r13",
	"mov [rdi + 32], r14",
	"mov [rdi + 40], r15",
	"mov rax, [rsp]",
	"mov [rdi + 48], rax",
	"lea rax, [rsp + 8]",
	"mov [rdi + 56], rax",
	"xor eax, eax",
	"ret",
	".global coro_core_jmp_jump_x64",
	"coro_core_jmp_jump_x64:",
	"mov rbx, [rdi + 0]",
	"mov rbp, [rdi + 8]",
	"mov r12, [rdi + 16]",
	"mov r13, [rdi + 24]",
	"mov r14, [rdi + 32]",
	"mov r15, [rdi + 40]",
	"mov r10, [rdi + 48]",
	"mov rsp, [rdi + 56]",
	"mov eax, esi",
	"test eax, eax",
	"jnz 1f",
	"mov eax, 1",
	"1:",
	"jmp r10"
);

extern "C" {
	fn coro_core_jmp_set_x64(buf: *mut JumpBuf) -> i32;
	fn coro_core_jmp_jump_x64(buf: *const JumpBuf, value: i32) -> !;
}

#[inline(always)]
pub(super) unsafe fn jmp_set(buf: *mut JumpBuf) -> i32 {
	/* Safety: guaranteed by caller of `jmp::set` */
	unsafe { coro_core_jmp_set_x64(buf) }
}

#[inline(always)]
pub(super) unsafe fn jmp_jump(buf: *const JumpBuf, value: i32) -> ! {
	/* Safety: guaranteed by caller of `jmp::jump` */
	unsafe { coro_core_jmp_jump_x64(buf, value) }
}
