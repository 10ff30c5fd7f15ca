//! The external archive engine.
//!
//! [`Engine`] is the whole contract this crate relies on. Its methods keep the
//! engine's own conventions: a handle or nothing, a success flag, a sentinel
//! size, and a per-thread last-error code that is only meaningful right after
//! a failing call on the same thread.

use std::path::Path;

use crate::handle::NativeHandle;
use crate::search::FindEntry;

#[cfg(feature = "memory")]
mod mask;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "stormlib")]
mod stormlib;

#[cfg(feature = "memory")]
pub use memory::MemoryEngine;
#[cfg(feature = "stormlib")]
pub use stormlib::StormLib;

pub trait Engine {
    fn open_archive(&self, path: &Path, flags: u32) -> Option<NativeHandle>;

    fn create_archive(&self, path: &Path, flags: u32, max_file_count: u32)
        -> Option<NativeHandle>;

    fn flush_archive(&self, archive: NativeHandle) -> bool;

    /// `None` for the list file means the engine's own listing.
    fn compact_archive(&self, archive: NativeHandle, list_file: Option<&Path>) -> bool;

    fn close_archive(&self, archive: NativeHandle) -> bool;

    fn open_file(&self, archive: NativeHandle, name: &str, scope: u32) -> Option<NativeHandle>;

    /// Returns `(low, high)`. A low word of [`INVALID_SIZE`](crate::flags::INVALID_SIZE)
    /// signals failure.
    fn file_size(&self, file: NativeHandle) -> (u32, u32);

    /// Reads up to `buffer.len()` bytes, storing the count in `read` even when
    /// returning `false`.
    fn read_file(&self, file: NativeHandle, buffer: &mut [u8], read: &mut u32) -> bool;

    fn create_file(
        &self,
        archive: NativeHandle,
        name: &str,
        file_time: u64,
        size: u32,
        locale: u32,
        flags: u32,
    ) -> Option<NativeHandle>;

    fn write_file(&self, file: NativeHandle, data: &[u8], compression: u32) -> bool;

    fn finish_file(&self, file: NativeHandle) -> bool;

    fn close_file(&self, file: NativeHandle) -> bool;

    fn has_file(&self, archive: NativeHandle, name: &str) -> bool;

    fn remove_file(&self, archive: NativeHandle, name: &str, scope: u32) -> bool;

    fn find_first(&self, archive: NativeHandle, mask: &str) -> Option<(NativeHandle, FindEntry)>;

    fn find_next(&self, search: NativeHandle) -> Option<FindEntry>;

    fn find_close(&self, search: NativeHandle) -> bool;

    /// The calling thread's last-error code.
    fn last_error(&self) -> u32;
}

macro_rules! forward {
    ($($ty:ty),*) => {$(
        impl<E: Engine + ?Sized> Engine for $ty {
            fn open_archive(&self, path: &Path, flags: u32) -> Option<NativeHandle> {
                (**self).open_archive(path, flags)
            }

            fn create_archive(&self, path: &Path, flags: u32, max_file_count: u32) -> Option<NativeHandle> {
                (**self).create_archive(path, flags, max_file_count)
            }

            fn flush_archive(&self, archive: NativeHandle) -> bool {
                (**self).flush_archive(archive)
            }

            fn compact_archive(&self, archive: NativeHandle, list_file: Option<&Path>) -> bool {
                (**self).compact_archive(archive, list_file)
            }

            fn close_archive(&self, archive: NativeHandle) -> bool {
                (**self).close_archive(archive)
            }

            fn open_file(&self, archive: NativeHandle, name: &str, scope: u32) -> Option<NativeHandle> {
                (**self).open_file(archive, name, scope)
            }

            fn file_size(&self, file: NativeHandle) -> (u32, u32) {
                (**self).file_size(file)
            }

            fn read_file(&self, file: NativeHandle, buffer: &mut [u8], read: &mut u32) -> bool {
                (**self).read_file(file, buffer, read)
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
                (**self).create_file(archive, name, file_time, size, locale, flags)
            }

            fn write_file(&self, file: NativeHandle, data: &[u8], compression: u32) -> bool {
                (**self).write_file(file, data, compression)
            }

            fn finish_file(&self, file: NativeHandle) -> bool {
                (**self).finish_file(file)
            }

            fn close_file(&self, file: NativeHandle) -> bool {
                (**self).close_file(file)
            }

            fn has_file(&self, archive: NativeHandle, name: &str) -> bool {
                (**self).has_file(archive, name)
            }

            fn remove_file(&self, archive: NativeHandle, name: &str, scope: u32) -> bool {
                (**self).remove_file(archive, name, scope)
            }

            fn find_first(&self, archive: NativeHandle, mask: &str) -> Option<(NativeHandle, FindEntry)> {
                (**self).find_first(archive, mask)
            }

            fn find_next(&self, search: NativeHandle) -> Option<FindEntry> {
                (**self).find_next(search)
            }

            fn find_close(&self, search: NativeHandle) -> bool {
                (**self).find_close(search)
            }

            fn last_error(&self) -> u32 {
                (**self).last_error()
            }
        }
    )*};
}

forward!(&E, Box<E>, std::sync::Arc<E>);
