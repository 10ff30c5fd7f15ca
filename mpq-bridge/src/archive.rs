//! Archive lifecycle: open, create, flush, compact, close.
//!
//! Closing an archive does not check for file or search handles still open
//! on it. The engine decides what happens to them.

use std::path::Path;

use crate::error::{Error, Operation, Result};
use crate::flags::hash_table_size;
use crate::handle::ArchiveHandle;
use crate::translate::translate;
use crate::{require_path, Bridge, Engine};

impl<E: Engine> Bridge<E> {
    /// Opens an existing archive. `flags` combines the `stream_provider`,
    /// `base_provider`, `stream_flag` and `open` values from [`crate::flags`].
    pub fn open_archive<P: AsRef<Path>>(&self, path: P, flags: u32) -> Result<ArchiveHandle> {
        let path = path.as_ref();
        require_path("path", path)?;

        let native = translate(&self.engine, Operation::ArchiveOpen, |e| {
            e.open_archive(path, flags)
        })?;
        let handle = ArchiveHandle::encode(native);
        tracing::debug!(%handle, path = %path.display(), flags, "opened archive");
        Ok(handle)
    }

    /// Creates a new archive with room for `max_file_count` entries, which
    /// must lie within [`hash_table_size::MIN`] and [`hash_table_size::MAX`].
    pub fn create_archive<P: AsRef<Path>>(
        &self,
        path: P,
        flags: u32,
        max_file_count: u32,
    ) -> Result<ArchiveHandle> {
        let path = path.as_ref();
        require_path("path", path)?;
        if !(hash_table_size::MIN..=hash_table_size::MAX).contains(&max_file_count) {
            return Err(Error::InvalidArgument {
                name: "max_file_count",
                reason: "must be within the engine's hash table size limits",
            });
        }

        let native = translate(&self.engine, Operation::ArchiveCreate, |e| {
            e.create_archive(path, flags, max_file_count)
        })?;
        let handle = ArchiveHandle::encode(native);
        tracing::debug!(%handle, path = %path.display(), max_file_count, "created archive");
        Ok(handle)
    }

    pub fn flush_archive(&self, archive: ArchiveHandle) -> Result<()> {
        let native = archive.decode()?;
        translate(&self.engine, Operation::ArchiveFlush, |e| {
            e.flush_archive(native).then_some(())
        })
    }

    /// Rebuilds the archive without the gaps left by removed or replaced
    /// files. An absent or empty `list_file` leaves naming to the engine's
    /// own listing. Blocks until the rebuild completes.
    pub fn compact_archive(&self, archive: ArchiveHandle, list_file: Option<&Path>) -> Result<()> {
        let native = archive.decode()?;
        let list_file = list_file.filter(|p| !p.as_os_str().is_empty());
        if let Some(list_file) = list_file {
            require_path("list_file", list_file)?;
        }

        tracing::debug!(handle = %archive, "compacting archive");
        translate(&self.engine, Operation::ArchiveCompact, |e| {
            e.compact_archive(native, list_file).then_some(())
        })
    }

    /// Closes the archive, saving pending changes. The token is dead afterwards.
    pub fn close_archive(&self, archive: ArchiveHandle) -> Result<()> {
        let native = archive.decode()?;
        translate(&self.engine, Operation::ArchiveClose, |e| {
            e.close_archive(native).then_some(())
        })?;
        tracing::debug!(handle = %archive, "closed archive");
        Ok(())
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use crate::error::{Cause, Error, Operation};
    use crate::flags::{stream_flag, stream_provider};
    use crate::{ArchiveHandle, Bridge, MemoryEngine};
    use std::path::Path;

    #[test]
    fn open_missing_archive() {
        let bridge = Bridge::new(MemoryEngine::new());
        let err = bridge.open_archive("nope.mpq", 0).unwrap_err();
        assert_eq!(err.kind(), "ArchiveOpenFailed");
        assert_eq!(err.cause(), Some(Cause::FILE_NOT_FOUND));
    }

    #[test]
    fn open_close_reopen() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("a.mpq", 0, 16).unwrap();
        bridge.close_archive(archive).unwrap();
        assert_eq!(bridge.engine().open_handles(), 0);

        let archive = bridge.open_archive("a.mpq", stream_flag::READ_ONLY).unwrap();
        bridge.close_archive(archive).unwrap();
        assert_eq!(bridge.engine().open_handles(), 0);
    }

    #[test]
    fn double_close_fails() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("a.mpq", 0, 16).unwrap();
        bridge.close_archive(archive).unwrap();
        let err = bridge.close_archive(archive).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::ArchiveClose));
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));
    }

    #[test]
    fn zero_token_never_reaches_engine() {
        let bridge = Bridge::new(MemoryEngine::new());
        let err = bridge.flush_archive(ArchiveHandle::from_raw(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidHandle { token: 0, .. }));
    }

    #[test]
    fn create_checks_capacity_bounds() {
        let bridge = Bridge::new(MemoryEngine::new());
        for bad in [0, 3, 0x8_0001] {
            let err = bridge.create_archive("a.mpq", 0, bad).unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidArgument {
                    name: "max_file_count",
                    ..
                }
            ));
        }
        assert!(!bridge.engine().exists_on_disk("a.mpq"));
    }

    #[test]
    fn create_twice_fails_with_cause() {
        let bridge = Bridge::new(MemoryEngine::new());
        bridge.create_archive("a.mpq", 0, 4).unwrap();
        let err = bridge.create_archive("a.mpq", 0, 4).unwrap_err();
        assert_eq!(err.kind(), "ArchiveCreateFailed");
        assert_eq!(err.cause(), Some(Cause::ALREADY_EXISTS));
    }

    #[test]
    fn empty_path_is_rejected() {
        let bridge = Bridge::new(MemoryEngine::new());
        assert!(matches!(
            bridge.open_archive("", 0),
            Err(Error::InvalidArgument { name: "path", .. })
        ));
    }

    #[test]
    fn unsupported_stream_is_an_engine_failure() {
        let bridge = Bridge::new(MemoryEngine::new());
        bridge.create_archive("a.mpq", 0, 4).unwrap();
        let err = bridge
            .open_archive("a.mpq", stream_provider::MPQE)
            .unwrap_err();
        assert_eq!(err.cause(), Some(Cause::NOT_SUPPORTED));
    }

    #[test]
    fn compact_with_empty_list_file_uses_internal_listing() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("a.mpq", 0, 4).unwrap();
        bridge.compact_archive(archive, Some(Path::new(""))).unwrap();
        bridge.compact_archive(archive, None).unwrap();

        let err = bridge
            .compact_archive(archive, Some(Path::new("/nonexistent/listfile.txt")))
            .unwrap_err();
        assert_eq!(err.operation(), Some(Operation::ArchiveCompact));
        assert_eq!(err.cause(), Some(Cause::FILE_NOT_FOUND));
    }

    #[test]
    fn flush_read_only_archive() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("a.mpq", 0, 4).unwrap();
        bridge.flush_archive(archive).unwrap();
        bridge.close_archive(archive).unwrap();

        let archive = bridge.open_archive("a.mpq", stream_flag::READ_ONLY).unwrap();
        bridge.flush_archive(archive).unwrap();
        let err = bridge.compact_archive(archive, None).unwrap_err();
        assert_eq!(err.cause(), Some(Cause::ACCESS_DENIED));
    }
}
