//! Residency filler.
//!
//! Freshly acquired memory is usually backed lazily: anonymous pages stay
//! shared with the kernel zero page until the first write. Writing a
//! sentinel across the whole range forces distinct physical pages, so the
//! allocation shows up as resident memory in `/proc/<pid>/status` and
//! friends.

use std::ffi::c_void;

/// The sentinel byte written across every filled range.
pub const FILL_BYTE: u8 = b'W';

/// Writes [`FILL_BYTE`] across `len` bytes starting at `ptr`.
///
/// # Safety
///
/// `ptr` must be valid for writes of `len` bytes and stay valid for the
/// duration of the call.
pub unsafe fn fill(ptr: *mut u8, len: usize) {
    unsafe { libc::memset(ptr as *mut c_void, FILL_BYTE as i32, len) };
}
