//! The StormLib C library, linked by the build script.
//!
//! Names and paths are handed over as narrow C strings, so the library must
//! be built without `UNICODE`.

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

use libc::{c_char, c_void};

use super::Engine;
use crate::error::Cause;
use crate::handle::NativeHandle;
use crate::search::FindEntry;

type Handle = *mut c_void;

#[cfg(windows)]
const MAX_PATH: usize = 260;
#[cfg(not(windows))]
const MAX_PATH: usize = 1024;

#[repr(C)]
#[allow(non_camel_case_types, non_snake_case)]
struct SFILE_FIND_DATA {
    cFileName: [c_char; MAX_PATH],
    szPlainName: *const c_char,
    dwHashIndex: u32,
    dwBlockIndex: u32,
    dwFileSize: u32,
    // Layout only; not part of a find entry.
    #[allow(dead_code)]
    dwFileFlags: u32,
    dwCompSize: u32,
    dwFileTimeLo: u32,
    dwFileTimeHi: u32,
    lcLocale: u32,
}

extern "system" {
    fn SFileOpenArchive(name: *const c_char, priority: u32, flags: u32, mpq: *mut Handle) -> bool;
    fn SFileCreateArchive(
        name: *const c_char,
        flags: u32,
        max_file_count: u32,
        mpq: *mut Handle,
    ) -> bool;
    fn SFileFlushArchive(mpq: Handle) -> bool;
    fn SFileCompactArchive(mpq: Handle, list_file: *const c_char, reserved: bool) -> bool;
    fn SFileCloseArchive(mpq: Handle) -> bool;

    fn SFileOpenFileEx(mpq: Handle, name: *const c_char, scope: u32, file: *mut Handle) -> bool;
    fn SFileGetFileSize(file: Handle, high: *mut u32) -> u32;
    fn SFileReadFile(
        file: Handle,
        buffer: *mut c_void,
        to_read: u32,
        read: *mut u32,
        overlapped: *mut c_void,
    ) -> bool;
    fn SFileCloseFile(file: Handle) -> bool;
    fn SFileHasFile(mpq: Handle, name: *const c_char) -> bool;
    fn SFileCreateFile(
        mpq: Handle,
        name: *const c_char,
        file_time: u64,
        size: u32,
        locale: u32,
        flags: u32,
        file: *mut Handle,
    ) -> bool;
    fn SFileWriteFile(file: Handle, data: *const c_void, size: u32, compression: u32) -> bool;
    fn SFileFinishFile(file: Handle) -> bool;
    fn SFileRemoveFile(mpq: Handle, name: *const c_char, scope: u32) -> bool;

    fn SFileFindFirstFile(
        mpq: Handle,
        mask: *const c_char,
        data: *mut SFILE_FIND_DATA,
        list_file: *const c_char,
    ) -> Handle;
    fn SFileFindNextFile(find: Handle, data: *mut SFILE_FIND_DATA) -> bool;
    fn SFileFindClose(find: Handle) -> bool;

    fn GetLastError() -> u32;
}

thread_local! {
    /// Failures detected on this side of the boundary, before calling in.
    static REJECTED: Cell<Option<u32>> = const { Cell::new(None) };
}

fn reject<T>() -> Option<T> {
    REJECTED.with(|slot| slot.set(Some(Cause::INVALID_PARAMETER.code())));
    None
}

fn rejected() -> bool {
    reject::<()>().is_some()
}

fn calling_in() {
    REJECTED.with(|slot| slot.set(None));
}

fn c_str(value: &str) -> Option<CString> {
    CString::new(value).ok()
}

#[cfg(unix)]
fn c_path(path: &Path) -> Option<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(not(unix))]
fn c_path(path: &Path) -> Option<CString> {
    path.to_str().and_then(c_str)
}

#[inline(always)]
fn raw(handle: NativeHandle) -> Handle {
    handle.get() as Handle
}

#[inline(always)]
fn native(handle: Handle) -> Option<NativeHandle> {
    NativeHandle::new(handle as usize)
}

fn empty_find_data() -> SFILE_FIND_DATA {
    SFILE_FIND_DATA {
        cFileName: [0; MAX_PATH],
        szPlainName: ptr::null(),
        dwHashIndex: 0,
        dwBlockIndex: 0,
        dwFileSize: 0,
        dwFileFlags: 0,
        dwCompSize: 0,
        dwFileTimeLo: 0,
        dwFileTimeHi: 0,
        lcLocale: 0,
    }
}

/// Copies the entry out; `szPlainName` points into `cFileName`.
fn find_entry(data: &SFILE_FIND_DATA) -> FindEntry {
    // SAFETY: the library NUL-terminates `cFileName`, and `szPlainName` is
    // either null or points inside it.
    let (file_name, plain_name) = unsafe {
        let file_name = CStr::from_ptr(data.cFileName.as_ptr());
        let plain_name = if data.szPlainName.is_null() {
            None
        } else {
            Some(CStr::from_ptr(data.szPlainName))
        };
        (file_name, plain_name)
    };

    FindEntry {
        file_name: file_name.to_string_lossy().into_owned(),
        plain_name: plain_name
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        hash_index: data.dwHashIndex,
        block_index: data.dwBlockIndex,
        file_size: data.dwFileSize,
        compressed_size: data.dwCompSize,
        file_time_lo: data.dwFileTimeLo,
        file_time_hi: data.dwFileTimeHi,
        locale: data.lcLocale,
    }
}

/// The linked StormLib.
///
/// Every handle given to it must have come from it and still be open; the
/// library does not validate them beyond a signature check.
#[derive(Debug, Default, Clone, Copy)]
pub struct StormLib;

impl Engine for StormLib {
    fn open_archive(&self, path: &Path, flags: u32) -> Option<NativeHandle> {
        let Some(path) = c_path(path) else { return reject() };
        let mut mpq: Handle = ptr::null_mut();
        calling_in();
        // SAFETY: `path` is a valid C string and `mpq` a valid out pointer.
        let ok = unsafe { SFileOpenArchive(path.as_ptr(), 0, flags, &mut mpq) };
        ok.then(|| native(mpq)).flatten()
    }

    fn create_archive(&self, path: &Path, flags: u32, max_file_count: u32) -> Option<NativeHandle> {
        let Some(path) = c_path(path) else { return reject() };
        let mut mpq: Handle = ptr::null_mut();
        calling_in();
        // SAFETY: as above.
        let ok = unsafe { SFileCreateArchive(path.as_ptr(), flags, max_file_count, &mut mpq) };
        ok.then(|| native(mpq)).flatten()
    }

    fn flush_archive(&self, archive: NativeHandle) -> bool {
        calling_in();
        unsafe { SFileFlushArchive(raw(archive)) }
    }

    fn compact_archive(&self, archive: NativeHandle, list_file: Option<&Path>) -> bool {
        let list_file = match list_file.map(c_path) {
            Some(None) => return rejected(),
            Some(Some(path)) => Some(path),
            None => None,
        };
        let list_ptr = list_file.as_ref().map_or(ptr::null(), |p| p.as_ptr());
        calling_in();
        // SAFETY: `list_ptr` is null or borrows `list_file`, which outlives the call.
        unsafe { SFileCompactArchive(raw(archive), list_ptr, false) }
    }

    fn close_archive(&self, archive: NativeHandle) -> bool {
        calling_in();
        unsafe { SFileCloseArchive(raw(archive)) }
    }

    fn open_file(&self, archive: NativeHandle, name: &str, scope: u32) -> Option<NativeHandle> {
        let Some(name) = c_str(name) else { return reject() };
        let mut file: Handle = ptr::null_mut();
        calling_in();
        let ok = unsafe { SFileOpenFileEx(raw(archive), name.as_ptr(), scope, &mut file) };
        ok.then(|| native(file)).flatten()
    }

    fn file_size(&self, file: NativeHandle) -> (u32, u32) {
        let mut high = 0u32;
        calling_in();
        let low = unsafe { SFileGetFileSize(raw(file), &mut high) };
        (low, high)
    }

    fn read_file(&self, file: NativeHandle, buffer: &mut [u8], read: &mut u32) -> bool {
        let to_read = u32::try_from(buffer.len()).unwrap_or(u32::MAX);
        calling_in();
        // SAFETY: the library writes at most `to_read` bytes into `buffer`.
        unsafe {
            SFileReadFile(
                raw(file),
                buffer.as_mut_ptr().cast(),
                to_read,
                read,
                ptr::null_mut(),
            )
        }
    }

    fn create_file(
        &self,
        archive: NativeHandle,
        name: &str,
        file_time: u64,
        size: u32,
        locale: u32,
        flags: u32,
    ) -> Option<NativeHandle> {
        let Some(name) = c_str(name) else { return reject() };
        let mut file: Handle = ptr::null_mut();
        calling_in();
        let ok = unsafe {
            SFileCreateFile(
                raw(archive),
                name.as_ptr(),
                file_time,
                size,
                locale,
                flags,
                &mut file,
            )
        };
        ok.then(|| native(file)).flatten()
    }

    fn write_file(&self, file: NativeHandle, data: &[u8], compression: u32) -> bool {
        let Ok(size) = u32::try_from(data.len()) else { return rejected() };
        calling_in();
        // SAFETY: the library reads exactly `size` bytes from `data`.
        unsafe { SFileWriteFile(raw(file), data.as_ptr().cast(), size, compression) }
    }

    fn finish_file(&self, file: NativeHandle) -> bool {
        calling_in();
        unsafe { SFileFinishFile(raw(file)) }
    }

    fn close_file(&self, file: NativeHandle) -> bool {
        calling_in();
        unsafe { SFileCloseFile(raw(file)) }
    }

    fn has_file(&self, archive: NativeHandle, name: &str) -> bool {
        let Some(name) = c_str(name) else { return rejected() };
        calling_in();
        unsafe { SFileHasFile(raw(archive), name.as_ptr()) }
    }

    fn remove_file(&self, archive: NativeHandle, name: &str, scope: u32) -> bool {
        let Some(name) = c_str(name) else { return rejected() };
        calling_in();
        unsafe { SFileRemoveFile(raw(archive), name.as_ptr(), scope) }
    }

    fn find_first(&self, archive: NativeHandle, mask: &str) -> Option<(NativeHandle, FindEntry)> {
        let Some(mask) = c_str(mask) else { return reject() };
        let mut data = empty_find_data();
        calling_in();
        // SAFETY: `data` is a properly laid out out-parameter; a null list
        // file means the archive's own listing.
        let find = unsafe { SFileFindFirstFile(raw(archive), mask.as_ptr(), &mut data, ptr::null()) };
        native(find).map(|find| (find, find_entry(&data)))
    }

    fn find_next(&self, search: NativeHandle) -> Option<FindEntry> {
        let mut data = empty_find_data();
        calling_in();
        let ok = unsafe { SFileFindNextFile(raw(search), &mut data) };
        ok.then(|| find_entry(&data))
    }

    fn find_close(&self, search: NativeHandle) -> bool {
        calling_in();
        unsafe { SFileFindClose(raw(search)) }
    }

    fn last_error(&self) -> u32 {
        match REJECTED.with(Cell::get) {
            Some(code) => code,
            None => unsafe { GetLastError() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_data_is_copied_out() {
        let mut data = empty_find_data();
        for (dst, src) in data.cFileName.iter_mut().zip(b"units\\orc.slk\0") {
            *dst = *src as c_char;
        }
        data.szPlainName = data.cFileName[6..].as_ptr();
        data.dwBlockIndex = 3;
        data.dwFileTimeHi = 1;

        let entry = find_entry(&data);
        assert_eq!(entry.file_name, "units\\orc.slk");
        assert_eq!(entry.plain_name, "orc.slk");
        assert_eq!(entry.block_index, 3);
        assert_eq!(entry.file_time(), 1 << 32);
    }

    #[test]
    fn rejected_arguments_report_invalid_parameter() {
        assert!(c_str("a\0b").is_none());
        assert!(!rejected());
        assert_eq!(StormLib.last_error(), Cause::INVALID_PARAMETER.code());
        calling_in();
        assert_eq!(REJECTED.with(Cell::get), None);
    }
}
