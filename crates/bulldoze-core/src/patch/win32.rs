//! Patch backend for the current process.

use std::ffi::c_void;

use windows::Win32::System::Memory::{PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, VirtualProtect};

use super::{HostAddress, PatchMemory};
use crate::error::{Error, Result};

/// Writes directly into the image of the process this library is loaded in.
pub struct ProcessMemory {
    _private: (),
}

impl ProcessMemory {
    /// # Safety
    ///
    /// Every address later passed to [`PatchMemory`] must lie inside the
    /// mapped host image, and no other thread may execute the patched bytes
    /// while they are written.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PatchMemory for ProcessMemory {
    fn make_writable(&mut self, address: HostAddress, len: usize) -> Result<()> {
        let mut old_protect = PAGE_PROTECTION_FLAGS(0);

        // SAFETY: VirtualProtect only changes page attributes; the range is
        // inside the host image per the contract of `ProcessMemory::new`.
        unsafe {
            VirtualProtect(
                address as usize as *const c_void,
                len,
                PAGE_EXECUTE_READWRITE,
                &mut old_protect,
            )
        }
        .map_err(|e| Error::PatchInstall {
            address,
            size: len,
            message: e.message().to_string(),
        })
    }

    fn write(&mut self, address: HostAddress, bytes: &[u8]) {
        // SAFETY: the range was made writable by `make_writable` and lies
        // inside the host image per the contract of `ProcessMemory::new`.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), address as usize as *mut u8, bytes.len());
        }
    }
}
