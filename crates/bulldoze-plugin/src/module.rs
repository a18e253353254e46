//! File system facts about the host process and this DLL.

use std::ffi::{OsString, c_void};
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bulldoze_core::host::version::game_version_from_file_version;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Storage::FileSystem::{
    GetFileVersionInfoSizeW, GetFileVersionInfoW, VS_FIXEDFILEINFO, VerQueryValueW,
};
use windows::Win32::System::LibraryLoader::GetModuleFileNameW;
use windows::core::{PCWSTR, w};

/// Full path of `module`; the default handle names the host executable.
pub fn module_path(module: HMODULE) -> Result<PathBuf> {
    let mut buffer = vec![0u16; 260];
    loop {
        // SAFETY: the buffer is writable for its whole length.
        let len = unsafe { GetModuleFileNameW(module, &mut buffer) } as usize;
        if len == 0 {
            bail!("GetModuleFileNameW failed: {}", windows::core::Error::from_win32());
        }
        if len < buffer.len() {
            buffer.truncate(len);
            return Ok(PathBuf::from(OsString::from_wide(&buffer)));
        }
        // Truncated, retry with a larger buffer
        buffer.resize(buffer.len() * 2, 0);
    }
}

/// Game version of the running executable, from its fixed file version.
pub fn game_version() -> Result<u16> {
    let exe = module_path(HMODULE::default())?;
    let wide: Vec<u16> = exe
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let path = PCWSTR(wide.as_ptr());

    // SAFETY: `path` is NUL terminated and outlives the calls below.
    let size = unsafe { GetFileVersionInfoSizeW(path, None) };
    if size == 0 {
        bail!("{} has no version resource", exe.display());
    }

    let mut data = vec![0u8; size as usize];
    // SAFETY: `data` is writable for `size` bytes.
    unsafe { GetFileVersionInfoW(path, 0, size, data.as_mut_ptr().cast()) }
        .with_context(|| format!("Failed to read the version resource of {}", exe.display()))?;

    let mut info: *mut c_void = std::ptr::null_mut();
    let mut len = 0u32;
    // SAFETY: `data` holds the version resource read above.
    let found = unsafe { VerQueryValueW(data.as_ptr().cast(), w!("\\"), &mut info, &mut len) };
    if !found.as_bool() || info.is_null() || (len as usize) < size_of::<VS_FIXEDFILEINFO>() {
        bail!("{} has no fixed file version", exe.display());
    }

    // SAFETY: VerQueryValueW returned a VS_FIXEDFILEINFO inside `data`.
    let fixed = unsafe { &*(info as *const VS_FIXEDFILEINFO) };
    Ok(game_version_from_file_version(fixed.dwFileVersionLS))
}
