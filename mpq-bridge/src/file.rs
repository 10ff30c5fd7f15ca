//! Files inside an archive.
//!
//! A file token comes from one of two lifecycles that never mix:
//! [`Bridge::open_file`] → size/read → [`Bridge::close_file`], or
//! [`Bridge::create_file`] → write → [`Bridge::finish_file`].

use crate::buffer::{ReadRegion, WriteRegion};
use crate::error::{Cause, Error, Operation, Result};
use crate::flags::{self, scope};
use crate::handle::{ArchiveHandle, FileHandle};
use crate::translate::{attempt, translate};
use crate::{require_name, Bridge, Engine};

impl<E: Engine> Bridge<E> {
    /// Opens an existing file for reading. `search_scope` is one of
    /// [`flags::scope`].
    pub fn open_file(
        &self,
        archive: ArchiveHandle,
        name: &str,
        search_scope: u32,
    ) -> Result<FileHandle> {
        let native = archive.decode()?;
        require_name("name", name)?;

        let file = translate(&self.engine, Operation::FileOpen, |e| {
            e.open_file(native, name, search_scope)
        })
        .map(FileHandle::encode)?;
        tracing::debug!(handle = %file, archive = %archive, name, "opened file");
        Ok(file)
    }

    /// Uncompressed size of an open file.
    pub fn file_size(&self, file: FileHandle) -> Result<u64> {
        let native = file.decode()?;
        translate(&self.engine, Operation::FileSize, |e| {
            match e.file_size(native) {
                (flags::INVALID_SIZE, _) => None,
                (low, high) => Some((u64::from(high) << 32) | u64::from(low)),
            }
        })
    }

    /// Reads into the whole of `buffer` and returns how many bytes arrived.
    /// Fewer bytes than the buffer holds means the end of the file was reached.
    pub fn read_file(&self, file: FileHandle, buffer: &mut [u8]) -> Result<usize> {
        let native = file.decode()?;
        let mut region = ReadRegion::bind(buffer)?;
        let capacity = region.capacity();

        let mut read = 0u32;
        match attempt(&self.engine, |e| {
            e.read_file(native, region.as_engine_buffer(), &mut read)
                .then_some(())
        }) {
            Ok(()) => {}
            Err(Cause::HANDLE_EOF) => {}
            Err(cause) => return Err(Error::engine(Operation::FileRead, cause)),
        }

        let read = region.complete(read)?;
        tracing::trace!(handle = %file, capacity, read, "read file");
        Ok(read)
    }

    /// Starts a new file of exactly `size` bytes. The token may only be given
    /// to [`Bridge::write_file`] and [`Bridge::finish_file`], and must always
    /// be finished.
    pub fn create_file(
        &self,
        archive: ArchiveHandle,
        name: &str,
        file_time: u64,
        size: u32,
        locale: u32,
        flags: u32,
    ) -> Result<FileHandle> {
        let native = archive.decode()?;
        require_name("name", name)?;

        let file = translate(&self.engine, Operation::FileCreate, |e| {
            e.create_file(native, name, file_time, size, locale, flags)
        })
        .map(FileHandle::encode)?;
        tracing::debug!(handle = %file, archive = %archive, name, size, "created file");
        Ok(file)
    }

    /// Writes all of `data`. `compression` is handed to the engine as is.
    pub fn write_file(&self, file: FileHandle, data: &[u8], compression: u32) -> Result<()> {
        let native = file.decode()?;
        let region = WriteRegion::bind(data)?;

        translate(&self.engine, Operation::FileWrite, |e| {
            e.write_file(native, region.as_engine_buffer(), compression)
                .then_some(())
        })?;
        tracing::trace!(handle = %file, len = region.len(), compression, "wrote file");
        Ok(())
    }

    /// Seals a created file into the archive. The token is dead afterwards,
    /// whether or not sealing succeeded.
    pub fn finish_file(&self, file: FileHandle) -> Result<()> {
        let native = file.decode()?;
        translate(&self.engine, Operation::FileFinish, |e| {
            e.finish_file(native).then_some(())
        })?;
        tracing::debug!(handle = %file, "finished file");
        Ok(())
    }

    pub fn close_file(&self, file: FileHandle) -> Result<()> {
        let native = file.decode()?;
        translate(&self.engine, Operation::FileClose, |e| {
            e.close_file(native).then_some(())
        })?;
        tracing::debug!(handle = %file, "closed file");
        Ok(())
    }

    /// Whether the archive holds `name`. A missing file is `false`, not an error.
    pub fn has_file(&self, archive: ArchiveHandle, name: &str) -> Result<bool> {
        let native = archive.decode()?;
        require_name("name", name)?;

        match attempt(&self.engine, |e| e.has_file(native, name).then_some(())) {
            Ok(()) => Ok(true),
            Err(Cause::FILE_NOT_FOUND) => Ok(false),
            Err(cause) => Err(Error::engine(Operation::FileCheck, cause)),
        }
    }

    pub fn remove_file(&self, archive: ArchiveHandle, name: &str) -> Result<()> {
        let native = archive.decode()?;
        require_name("name", name)?;

        translate(&self.engine, Operation::FileRemove, |e| {
            e.remove_file(native, name, scope::FROM_MPQ).then_some(())
        })?;
        tracing::debug!(archive = %archive, name, "removed file");
        Ok(())
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use crate::error::{Cause, Error, Operation};
    use crate::flags::{compression, file, scope};
    use crate::{ArchiveHandle, Bridge, FileHandle, MemoryEngine};

    fn setup() -> (Bridge<MemoryEngine>, ArchiveHandle) {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("test.mpq", 0, 16).unwrap();
        (bridge, archive)
    }

    fn store(bridge: &Bridge<MemoryEngine>, archive: ArchiveHandle, name: &str, data: &[u8]) {
        let file = bridge
            .create_file(archive, name, 0, data.len() as u32, 0, 0)
            .unwrap();
        bridge.write_file(file, data, compression::ZLIB).unwrap();
        bridge.finish_file(file).unwrap();
    }

    #[test]
    fn write_then_read_back() {
        let (bridge, archive) = setup();
        let data = b"This, this, this is a compressable string string string.\n";
        store(&bridge, archive, "test\\string.txt", data);

        let file = bridge
            .open_file(archive, "test\\string.txt", scope::FROM_MPQ)
            .unwrap();
        assert_eq!(bridge.file_size(file).unwrap(), data.len() as u64);

        let mut buf = vec![0u8; data.len()];
        assert_eq!(bridge.read_file(file, &mut buf).unwrap(), data.len());
        assert_eq!(&buf[..], &data[..]);
        bridge.close_file(file).unwrap();
    }

    #[test]
    fn short_read_at_end_of_file() {
        let (bridge, archive) = setup();
        store(&bridge, archive, "hello.txt", b"hello");

        let file = bridge.open_file(archive, "hello.txt", scope::FROM_MPQ).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(bridge.read_file(file, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(bridge.read_file(file, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_in_pieces() {
        let (bridge, archive) = setup();
        store(&bridge, archive, "abc", b"abcdefg");

        let file = bridge.open_file(archive, "abc", scope::FROM_MPQ).unwrap();
        let mut buf = [0u8; 3];
        let mut out = Vec::new();
        loop {
            let n = bridge.read_file(file, &mut buf).unwrap();
            assert!(n <= buf.len());
            out.extend_from_slice(&buf[..n]);
            if n < buf.len() {
                break;
            }
        }
        assert_eq!(out, b"abcdefg");
    }

    #[test]
    fn writing_in_chunks() {
        let (bridge, archive) = setup();
        let file = bridge.create_file(archive, "chunks", 0, 6, 0, 0).unwrap();
        bridge.write_file(file, b"ab", compression::ZLIB).unwrap();
        bridge.write_file(file, b"", compression::ZLIB).unwrap();
        bridge.write_file(file, b"cdef", compression::NEXT_SAME).unwrap();
        bridge.finish_file(file).unwrap();
        assert!(bridge.has_file(archive, "chunks").unwrap());
    }

    #[test]
    fn size_of_finished_file_is_declared_size() {
        let (bridge, archive) = setup();
        let file = bridge.create_file(archive, "sized", 0, 1000, 0, 0).unwrap();
        bridge.write_file(file, &[7u8; 1000], 0).unwrap();
        bridge.finish_file(file).unwrap();

        let file = bridge.open_file(archive, "sized", scope::FROM_MPQ).unwrap();
        assert_eq!(bridge.file_size(file).unwrap(), 1000);
    }

    #[test]
    fn exists_is_false_for_missing_names() {
        let (bridge, archive) = setup();
        assert!(!bridge.has_file(archive, "missing-name").unwrap());
        store(&bridge, archive, "real-name", b"x");
        assert!(bridge.has_file(archive, "real-name").unwrap());
        assert!(bridge.has_file(archive, "REAL-NAME").unwrap());
    }

    #[test]
    fn exists_on_dead_archive_is_an_error() {
        let (bridge, archive) = setup();
        bridge.close_archive(archive).unwrap();
        let err = bridge.has_file(archive, "anything").unwrap_err();
        assert_eq!(err.operation(), Some(Operation::FileCheck));
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));
    }

    #[test]
    fn open_missing_file() {
        let (bridge, archive) = setup();
        let err = bridge
            .open_file(archive, "missing", scope::FROM_MPQ)
            .unwrap_err();
        assert_eq!(err.kind(), "FileOpenFailed");
        assert_eq!(err.cause(), Some(Cause::FILE_NOT_FOUND));
    }

    #[test]
    fn create_duplicate_requires_replace() {
        let (bridge, archive) = setup();
        store(&bridge, archive, "dup", b"one");
        let err = bridge.create_file(archive, "dup", 0, 3, 0, 0).unwrap_err();
        assert_eq!(err.kind(), "FileCreateFailed");
        assert_eq!(err.cause(), Some(Cause::ALREADY_EXISTS));

        let file = bridge
            .create_file(archive, "dup", 0, 3, 0, file::REPLACE_EXISTING)
            .unwrap();
        bridge.write_file(file, b"two", 0).unwrap();
        bridge.finish_file(file).unwrap();

        let file = bridge.open_file(archive, "dup", scope::FROM_MPQ).unwrap();
        let mut buf = [0u8; 3];
        bridge.read_file(file, &mut buf).unwrap();
        assert_eq!(&buf, b"two");
    }

    #[test]
    fn write_beyond_declared_size() {
        let (bridge, archive) = setup();
        let file = bridge.create_file(archive, "small", 0, 2, 0, 0).unwrap();
        let err = bridge.write_file(file, b"too long", 0).unwrap_err();
        assert_eq!(err.kind(), "FileWriteFailed");

        let err = bridge.finish_file(file).unwrap_err();
        assert_eq!(err.kind(), "FileFinishFailed");
        assert!(!bridge.has_file(archive, "small").unwrap());
    }

    #[test]
    fn lifecycles_do_not_mix() {
        let (bridge, archive) = setup();
        let writer = bridge.create_file(archive, "w", 0, 1, 0, 0).unwrap();
        let err = bridge.read_file(writer, &mut [0u8; 1]).unwrap_err();
        assert_eq!(err.kind(), "FileReadFailed");
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));
        bridge.write_file(writer, b"w", 0).unwrap();
        bridge.finish_file(writer).unwrap();

        let reader = bridge.open_file(archive, "w", scope::FROM_MPQ).unwrap();
        let err = bridge.write_file(reader, b"w", 0).unwrap_err();
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));
        let err = bridge.finish_file(reader).unwrap_err();
        assert_eq!(err.kind(), "FileFinishFailed");
        bridge.close_file(reader).unwrap();
    }

    #[test]
    fn close_twice() {
        let (bridge, archive) = setup();
        store(&bridge, archive, "x", b"x");
        let file = bridge.open_file(archive, "x", scope::FROM_MPQ).unwrap();
        bridge.close_file(file).unwrap();
        let err = bridge.close_file(file).unwrap_err();
        assert_eq!(err.kind(), "FileCloseFailed");
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));
    }

    #[test]
    fn size_of_closed_file_is_unavailable() {
        let (bridge, archive) = setup();
        store(&bridge, archive, "x", b"x");
        let file = bridge.open_file(archive, "x", scope::FROM_MPQ).unwrap();
        bridge.close_file(file).unwrap();
        let err = bridge.file_size(file).unwrap_err();
        assert_eq!(err.kind(), "FileSizeUnavailable");
    }

    #[test]
    fn remove_then_missing() {
        let (bridge, archive) = setup();
        store(&bridge, archive, "gone", b"x");
        bridge.remove_file(archive, "gone").unwrap();
        assert!(!bridge.has_file(archive, "gone").unwrap());

        let err = bridge.remove_file(archive, "gone").unwrap_err();
        assert_eq!(err.kind(), "FileRemoveFailed");
        assert_eq!(err.cause(), Some(Cause::FILE_NOT_FOUND));
    }

    #[test]
    fn names_are_checked_before_the_engine() {
        let (bridge, archive) = setup();
        assert!(matches!(
            bridge.has_file(archive, ""),
            Err(Error::InvalidArgument { name: "name", .. })
        ));
        assert!(matches!(
            bridge.open_file(archive, "a\0b", scope::FROM_MPQ),
            Err(Error::InvalidArgument { name: "name", .. })
        ));
        assert!(matches!(
            bridge.read_file(FileHandle::from_raw(0), &mut []),
            Err(Error::InvalidHandle { .. })
        ));
    }
}
