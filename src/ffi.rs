use std::ffi::CStr;

use crate::error::Errno;

/// Message text the C library associates with `errno`.
pub fn strerror(errno: Errno) -> String {
    unsafe {
        let ptr = libc::strerror(errno);
        if ptr.is_null() {
            format!("Unknown error {}", errno)
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}
