//! An in-process engine with the observable behaviour of StormLib.
//!
//! Archives live on a per-engine "disk" keyed by path. An open archive works
//! on its own copy of the image, which is written back on flush and close.
//! Nothing here knows about the MPQ binary layout; stored files are plain
//! byte vectors and compression selectors are accepted and ignored.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::mask;
use super::Engine;
use crate::error::Cause;
use crate::flags::{self, base_provider, file, hash_table_size, scope, stream_flag, stream_provider};
use crate::handle::NativeHandle;
use crate::search::FindEntry;

thread_local! {
    static LAST_ERROR: Cell<u32> = const { Cell::new(0) };
}

fn report<T>(result: Result<T, Cause>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(cause) => {
            LAST_ERROR.with(|slot| slot.set(cause.code()));
            None
        }
    }
}

const FIRST_HANDLE: usize = 0x1000;
const HANDLE_STRIDE: usize = 0x10;

#[derive(Debug, Clone)]
struct Stored {
    name: String,
    locale: u32,
    file_time: u64,
    data: Vec<u8>,
}

impl Stored {
    fn find_entry(&self, index: usize) -> FindEntry {
        let plain_name = match self.name.rfind(['\\', '/']) {
            Some(sep) => &self.name[sep + 1..],
            None => &self.name[..],
        };
        let size = self.data.len() as u32;

        FindEntry {
            file_name: self.name.clone(),
            plain_name: plain_name.to_string(),
            hash_index: index as u32,
            block_index: index as u32,
            file_size: size,
            compressed_size: size,
            file_time_lo: self.file_time as u32,
            file_time_hi: (self.file_time >> 32) as u32,
            locale: self.locale,
        }
    }
}

#[derive(Debug, Clone)]
struct Image {
    max_file_count: u32,
    /// Block table. Removed entries leave a hole until the archive is compacted.
    blocks: Vec<Option<Stored>>,
}

impl Image {
    fn new(max_file_count: u32) -> Image {
        Image {
            max_file_count,
            blocks: Vec::new(),
        }
    }

    /// Prefers the neutral locale, then any locale.
    fn lookup(&self, name: &str) -> Option<usize> {
        let mut fallback = None;
        for (index, stored) in self.blocks.iter().enumerate() {
            let stored = match stored {
                Some(v) if mask::same_name(&v.name, name) => v,
                _ => continue,
            };
            if stored.locale == flags::LOCALE_NEUTRAL {
                return Some(index);
            }
            fallback.get_or_insert(index);
        }
        fallback
    }

    fn lookup_exact(&self, name: &str, locale: u32) -> Option<usize> {
        self.blocks.iter().position(|stored| {
            stored
                .as_ref()
                .map(|v| v.locale == locale && mask::same_name(&v.name, name))
                .unwrap_or(false)
        })
    }

    fn is_full(&self) -> bool {
        self.blocks.len() >= self.max_file_count as usize
    }
}

#[derive(Debug)]
struct OpenArchive {
    path: PathBuf,
    image: Image,
    read_only: bool,
    dirty: bool,
}

#[derive(Debug)]
struct Reader {
    archive: NativeHandle,
    data: Vec<u8>,
    position: usize,
}

#[derive(Debug)]
struct Writer {
    archive: NativeHandle,
    name: String,
    locale: u32,
    file_time: u64,
    declared: u32,
    data: Vec<u8>,
    failed: bool,
}

#[derive(Debug)]
struct Search {
    archive: NativeHandle,
    mask: String,
    next: usize,
}

#[derive(Debug)]
enum Resource {
    Archive(OpenArchive),
    Reader(Reader),
    Writer(Writer),
    Search(Search),
}

#[derive(Debug)]
struct State {
    disk: HashMap<PathBuf, Image>,
    open: HashMap<NativeHandle, Resource>,
    next_handle: usize,
}

impl State {
    fn allocate(&mut self, resource: Resource) -> Result<NativeHandle, Cause> {
        let handle = NativeHandle::new(self.next_handle).ok_or(Cause::NOT_ENOUGH_MEMORY)?;
        self.next_handle = self
            .next_handle
            .checked_add(HANDLE_STRIDE)
            .ok_or(Cause::NOT_ENOUGH_MEMORY)?;
        self.open.insert(handle, resource);
        Ok(handle)
    }

    fn archive(&self, handle: NativeHandle) -> Result<&OpenArchive, Cause> {
        match self.open.get(&handle) {
            Some(Resource::Archive(archive)) => Ok(archive),
            _ => Err(Cause::INVALID_HANDLE),
        }
    }

    fn archive_mut(&mut self, handle: NativeHandle) -> Result<&mut OpenArchive, Cause> {
        match self.open.get_mut(&handle) {
            Some(Resource::Archive(archive)) => Ok(archive),
            _ => Err(Cause::INVALID_HANDLE),
        }
    }

    fn writable_archive(&mut self, handle: NativeHandle) -> Result<&mut OpenArchive, Cause> {
        let archive = self.archive_mut(handle)?;
        if archive.read_only {
            return Err(Cause::ACCESS_DENIED);
        }
        Ok(archive)
    }

    fn persist(&mut self, handle: NativeHandle) -> Result<(), Cause> {
        let archive = self.archive_mut(handle)?;
        if !archive.dirty {
            return Ok(());
        }
        archive.dirty = false;
        let (path, image) = (archive.path.clone(), archive.image.clone());
        self.disk.insert(path, image);
        Ok(())
    }

    fn open_archive(&mut self, path: &Path, flags: u32) -> Result<NativeHandle, Cause> {
        if flags & base_provider::MASK == base_provider::HTTP
            || flags & stream_provider::MASK != stream_provider::FLAT
        {
            return Err(Cause::NOT_SUPPORTED);
        }
        let image = self.disk.get(path).cloned().ok_or(Cause::FILE_NOT_FOUND)?;
        self.allocate(Resource::Archive(OpenArchive {
            path: path.to_path_buf(),
            image,
            read_only: flags & stream_flag::READ_ONLY != 0,
            dirty: false,
        }))
    }

    fn create_archive(&mut self, path: &Path, max_file_count: u32) -> Result<NativeHandle, Cause> {
        if self.disk.contains_key(path) {
            return Err(Cause::ALREADY_EXISTS);
        }
        let image = Image::new(max_file_count.clamp(hash_table_size::MIN, hash_table_size::MAX));
        self.disk.insert(path.to_path_buf(), image.clone());
        self.allocate(Resource::Archive(OpenArchive {
            path: path.to_path_buf(),
            image,
            read_only: false,
            dirty: false,
        }))
    }

    fn compact_archive(
        &mut self,
        handle: NativeHandle,
        list_file: Option<&Path>,
    ) -> Result<(), Cause> {
        let archive = self.writable_archive(handle)?;
        if let Some(list_file) = list_file {
            if !list_file.is_file() {
                return Err(Cause::FILE_NOT_FOUND);
            }
        }
        let before = archive.image.blocks.len();
        archive.image.blocks.retain(Option::is_some);
        if archive.image.blocks.len() != before {
            archive.dirty = true;
        }
        Ok(())
    }

    fn close_archive(&mut self, handle: NativeHandle) -> Result<(), Cause> {
        self.persist(handle)?;
        self.open.remove(&handle);
        Ok(())
    }

    fn open_file(
        &mut self,
        archive: NativeHandle,
        name: &str,
        search_scope: u32,
    ) -> Result<NativeHandle, Cause> {
        if search_scope == scope::LOCAL_FILE {
            return Err(Cause::NOT_SUPPORTED);
        }
        let image = &self.archive(archive)?.image;
        let index = image.lookup(name).ok_or(Cause::FILE_NOT_FOUND)?;
        let data = image.blocks[index]
            .as_ref()
            .map(|stored| stored.data.clone())
            .ok_or(Cause::FILE_NOT_FOUND)?;
        self.allocate(Resource::Reader(Reader {
            archive,
            data,
            position: 0,
        }))
    }

    fn file_size(&self, handle: NativeHandle) -> Result<u64, Cause> {
        match self.open.get(&handle) {
            Some(Resource::Reader(reader)) => Ok(reader.data.len() as u64),
            Some(Resource::Writer(writer)) => Ok(writer.declared as u64),
            _ => Err(Cause::INVALID_HANDLE),
        }
    }

    fn read_file(&mut self, handle: NativeHandle, buffer: &mut [u8]) -> (u32, Result<(), Cause>) {
        let archive = match self.open.get(&handle) {
            Some(Resource::Reader(reader)) => reader.archive,
            _ => return (0, Err(Cause::INVALID_HANDLE)),
        };
        if self.archive(archive).is_err() {
            return (0, Err(Cause::INVALID_HANDLE));
        }
        let reader = match self.open.get_mut(&handle) {
            Some(Resource::Reader(reader)) => reader,
            _ => return (0, Err(Cause::INVALID_HANDLE)),
        };

        let remaining = &reader.data[reader.position..];
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        reader.position += count;

        if count < buffer.len() {
            (count as u32, Err(Cause::HANDLE_EOF))
        } else {
            (count as u32, Ok(()))
        }
    }

    fn create_file(
        &mut self,
        archive: NativeHandle,
        name: &str,
        file_time: u64,
        declared: u32,
        locale: u32,
        flags: u32,
    ) -> Result<NativeHandle, Cause> {
        if name.is_empty() {
            return Err(Cause::INVALID_PARAMETER);
        }
        let image = &self.writable_archive(archive)?.image;
        match image.lookup_exact(name, locale) {
            Some(_) if flags & file::REPLACE_EXISTING == 0 => return Err(Cause::ALREADY_EXISTS),
            Some(_) => {}
            None if image.is_full() => return Err(Cause::DISK_FULL),
            None => {}
        }
        self.allocate(Resource::Writer(Writer {
            archive,
            name: name.to_string(),
            locale,
            file_time,
            declared,
            data: Vec::with_capacity(declared as usize),
            failed: false,
        }))
    }

    fn write_file(&mut self, handle: NativeHandle, data: &[u8]) -> Result<(), Cause> {
        let writer = match self.open.get_mut(&handle) {
            Some(Resource::Writer(writer)) => writer,
            _ => return Err(Cause::INVALID_HANDLE),
        };
        if writer.data.len() + data.len() > writer.declared as usize {
            writer.failed = true;
            return Err(Cause::DISK_FULL);
        }
        writer.data.extend_from_slice(data);
        Ok(())
    }

    fn finish_file(&mut self, handle: NativeHandle) -> Result<(), Cause> {
        let writer = match self.open.remove(&handle) {
            Some(Resource::Writer(writer)) => writer,
            Some(other) => {
                self.open.insert(handle, other);
                return Err(Cause::INVALID_HANDLE);
            }
            None => return Err(Cause::INVALID_HANDLE),
        };
        // The handle is released even when sealing fails.
        if writer.failed || writer.data.len() != writer.declared as usize {
            return Err(Cause::CAN_NOT_COMPLETE);
        }

        let archive = self.writable_archive(writer.archive)?;
        let stored = Stored {
            name: writer.name,
            locale: writer.locale,
            file_time: writer.file_time,
            data: writer.data,
        };
        let image = &mut archive.image;
        match image.lookup_exact(&stored.name, stored.locale) {
            Some(index) => image.blocks[index] = Some(stored),
            None if image.is_full() => return Err(Cause::DISK_FULL),
            None => image.blocks.push(Some(stored)),
        }
        archive.dirty = true;
        Ok(())
    }

    fn close_file(&mut self, handle: NativeHandle) -> Result<(), Cause> {
        match self.open.get(&handle) {
            Some(Resource::Reader(_)) => {
                self.open.remove(&handle);
                Ok(())
            }
            _ => Err(Cause::INVALID_HANDLE),
        }
    }

    fn has_file(&self, archive: NativeHandle, name: &str) -> Result<(), Cause> {
        self.archive(archive)?
            .image
            .lookup(name)
            .map(|_| ())
            .ok_or(Cause::FILE_NOT_FOUND)
    }

    fn remove_file(&mut self, archive: NativeHandle, name: &str) -> Result<(), Cause> {
        let archive = self.writable_archive(archive)?;
        let index = archive
            .image
            .lookup_exact(name, flags::LOCALE_NEUTRAL)
            .ok_or(Cause::FILE_NOT_FOUND)?;
        archive.image.blocks[index] = None;
        archive.dirty = true;
        Ok(())
    }

    /// Next matching entry at or after `from`, and the position after it.
    fn scan(
        &self,
        archive: NativeHandle,
        mask: &str,
        from: usize,
    ) -> Result<(usize, FindEntry), Cause> {
        let image = &self.archive(archive)?.image;
        image
            .blocks
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(index, stored)| match stored {
                Some(v) if mask::matches(&v.name, mask) => Some((index + 1, v.find_entry(index))),
                _ => None,
            })
            .ok_or(Cause::NO_MORE_FILES)
    }

    fn find_first(
        &mut self,
        archive: NativeHandle,
        mask: &str,
    ) -> Result<(NativeHandle, FindEntry), Cause> {
        let (next, entry) = self.scan(archive, mask, 0)?;
        let handle = self.allocate(Resource::Search(Search {
            archive,
            mask: mask.to_string(),
            next,
        }))?;
        Ok((handle, entry))
    }

    fn find_next(&mut self, handle: NativeHandle) -> Result<FindEntry, Cause> {
        let (archive, from, mask) = match self.open.get(&handle) {
            Some(Resource::Search(search)) => (search.archive, search.next, search.mask.clone()),
            _ => return Err(Cause::INVALID_HANDLE),
        };
        let (next, entry) = match self.scan(archive, &mask, from) {
            Ok(found) => found,
            Err(cause) => {
                if let Some(Resource::Search(search)) = self.open.get_mut(&handle) {
                    search.next = usize::MAX;
                }
                return Err(cause);
            }
        };
        if let Some(Resource::Search(search)) = self.open.get_mut(&handle) {
            search.next = next;
        }
        Ok(entry)
    }

    fn find_close(&mut self, handle: NativeHandle) -> Result<(), Cause> {
        match self.open.get(&handle) {
            Some(Resource::Search(_)) => {
                self.open.remove(&handle);
                Ok(())
            }
            _ => Err(Cause::INVALID_HANDLE),
        }
    }
}

/// In-process engine. Cheap to create; every instance has its own disk.
#[derive(Debug)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        MemoryEngine::new()
    }
}

impl MemoryEngine {
    pub fn new() -> MemoryEngine {
        MemoryEngine {
            state: Mutex::new(State {
                disk: HashMap::new(),
                open: HashMap::new(),
                next_handle: FIRST_HANDLE,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of archive, file and search handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state().open.len()
    }

    /// Whether an archive exists on this engine's disk.
    pub fn exists_on_disk<P: AsRef<Path>>(&self, path: P) -> bool {
        self.state().disk.contains_key(path.as_ref())
    }
}

impl Engine for MemoryEngine {
    fn open_archive(&self, path: &Path, flags: u32) -> Option<NativeHandle> {
        report(self.state().open_archive(path, flags))
    }

    fn create_archive(&self, path: &Path, _flags: u32, max_file_count: u32) -> Option<NativeHandle> {
        report(self.state().create_archive(path, max_file_count))
    }

    fn flush_archive(&self, archive: NativeHandle) -> bool {
        report(self.state().persist(archive)).is_some()
    }

    fn compact_archive(&self, archive: NativeHandle, list_file: Option<&Path>) -> bool {
        report(self.state().compact_archive(archive, list_file)).is_some()
    }

    fn close_archive(&self, archive: NativeHandle) -> bool {
        report(self.state().close_archive(archive)).is_some()
    }

    fn open_file(&self, archive: NativeHandle, name: &str, scope: u32) -> Option<NativeHandle> {
        report(self.state().open_file(archive, name, scope))
    }

    fn file_size(&self, file: NativeHandle) -> (u32, u32) {
        match report(self.state().file_size(file)) {
            Some(size) => (size as u32, (size >> 32) as u32),
            None => (flags::INVALID_SIZE, 0),
        }
    }

    fn read_file(&self, file: NativeHandle, buffer: &mut [u8], read: &mut u32) -> bool {
        let (count, result) = self.state().read_file(file, buffer);
        *read = count;
        report(result).is_some()
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
        report(
            self.state()
                .create_file(archive, name, file_time, size, locale, flags),
        )
    }

    fn write_file(&self, file: NativeHandle, data: &[u8], _compression: u32) -> bool {
        report(self.state().write_file(file, data)).is_some()
    }

    fn finish_file(&self, file: NativeHandle) -> bool {
        report(self.state().finish_file(file)).is_some()
    }

    fn close_file(&self, file: NativeHandle) -> bool {
        report(self.state().close_file(file)).is_some()
    }

    fn has_file(&self, archive: NativeHandle, name: &str) -> bool {
        report(self.state().has_file(archive, name)).is_some()
    }

    fn remove_file(&self, archive: NativeHandle, name: &str, _scope: u32) -> bool {
        report(self.state().remove_file(archive, name)).is_some()
    }

    fn find_first(&self, archive: NativeHandle, mask: &str) -> Option<(NativeHandle, FindEntry)> {
        report(self.state().find_first(archive, mask))
    }

    fn find_next(&self, search: NativeHandle) -> Option<FindEntry> {
        report(self.state().find_next(search))
    }

    fn find_close(&self, search: NativeHandle) -> bool {
        report(self.state().find_close(search)).is_some()
    }

    fn last_error(&self) -> u32 {
        LAST_ERROR.with(Cell::get)
    }
}
