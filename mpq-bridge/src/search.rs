//! Enumerating the files of an archive.
//!
//! The engine starts a search and returns its first result in the same call,
//! then hands out one entry per find-next until it reports that nothing is
//! left. [`SearchCursor`] hides that asymmetry: its first [`Bridge::advance`]
//! yields the entry fetched at start. [`Entries`] wraps a cursor as an
//! iterator that closes the search when dropped.

use std::iter::FusedIterator;

use crate::error::{Cause, Error, Operation, Result};
use crate::handle::{ArchiveHandle, SearchHandle};
use crate::translate::{attempt, translate};
use crate::{Bridge, Engine};

/// One file found by a search. Fields are in the engine's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindEntry {
    /// Full name inside the archive.
    pub file_name: String,
    /// Final component of `file_name`.
    pub plain_name: String,
    pub hash_index: u32,
    pub block_index: u32,
    /// Uncompressed size.
    pub file_size: u32,
    pub compressed_size: u32,
    pub file_time_lo: u32,
    pub file_time_hi: u32,
    pub locale: u32,
}

impl FindEntry {
    /// The timestamp as one 64-bit value.
    #[inline(always)]
    pub fn file_time(&self) -> u64 {
        (u64::from(self.file_time_hi) << 32) | u64::from(self.file_time_lo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Entries may remain.
    Active,
    /// The end of the sequence has been reported. Advancing again is an error.
    Exhausted,
}

/// A search in progress. Single pass; close it with [`Bridge::close_search`].
#[derive(Debug)]
pub struct SearchCursor {
    handle: Option<SearchHandle>,
    pending: Option<FindEntry>,
    state: CursorState,
}

impl SearchCursor {
    /// The engine's search token. `None` when the mask matched nothing, in
    /// which case there is nothing to close.
    pub fn handle(&self) -> Option<SearchHandle> {
        self.handle
    }

    pub fn state(&self) -> CursorState {
        self.state
    }
}

fn engine_mask(mask: &str) -> Result<&str> {
    if mask.contains('\0') {
        return Err(Error::InvalidArgument {
            name: "mask",
            reason: "must not contain NUL",
        });
    }
    Ok(if mask.is_empty() { "*" } else { mask })
}

impl<E: Engine> Bridge<E> {
    /// Starts a search. `None` means the mask matched nothing and no search
    /// handle was created.
    pub fn find_first(
        &self,
        archive: ArchiveHandle,
        mask: &str,
    ) -> Result<Option<(SearchHandle, FindEntry)>> {
        let native = archive.decode()?;
        let mask = engine_mask(mask)?;

        match attempt(&self.engine, |e| e.find_first(native, mask)) {
            Ok((search, entry)) => {
                let search = SearchHandle::encode(search);
                tracing::debug!(handle = %search, archive = %archive, mask, "started search");
                Ok(Some((search, entry)))
            }
            Err(Cause::NO_MORE_FILES) => {
                tracing::debug!(archive = %archive, mask, "search matched nothing");
                Ok(None)
            }
            Err(cause) => Err(Error::engine(Operation::SearchStart, cause)),
        }
    }

    /// Next entry of a search, or `None` once the engine has no more.
    pub fn find_next(&self, search: SearchHandle) -> Result<Option<FindEntry>> {
        let native = search.decode()?;
        match attempt(&self.engine, |e| e.find_next(native)) {
            Ok(entry) => Ok(Some(entry)),
            Err(Cause::NO_MORE_FILES) => Ok(None),
            Err(cause) => Err(Error::engine(Operation::SearchAdvance, cause)),
        }
    }

    pub fn find_close(&self, search: SearchHandle) -> Result<()> {
        let native = search.decode()?;
        translate(&self.engine, Operation::SearchClose, |e| {
            e.find_close(native).then_some(())
        })?;
        tracing::debug!(handle = %search, "closed search");
        Ok(())
    }

    /// Starts a search and returns a cursor positioned before its first entry.
    /// An empty mask matches every file.
    pub fn search(&self, archive: ArchiveHandle, mask: &str) -> Result<SearchCursor> {
        let (handle, pending) = match self.find_first(archive, mask)? {
            Some((handle, first)) => (Some(handle), Some(first)),
            None => (None, None),
        };
        Ok(SearchCursor {
            handle,
            pending,
            state: CursorState::Active,
        })
    }

    /// Next entry of the cursor, `None` at the end of the sequence.
    pub fn advance(&self, cursor: &mut SearchCursor) -> Result<Option<FindEntry>> {
        if cursor.state == CursorState::Exhausted {
            return Err(Error::CursorExhausted);
        }
        if let Some(entry) = cursor.pending.take() {
            return Ok(Some(entry));
        }

        let next = match cursor.handle {
            Some(handle) => self.find_next(handle)?,
            None => None,
        };
        if next.is_none() {
            cursor.state = CursorState::Exhausted;
        }
        Ok(next)
    }

    /// Releases the cursor's search handle, if it has one.
    pub fn close_search(&self, cursor: SearchCursor) -> Result<()> {
        match cursor.handle {
            Some(handle) => self.find_close(handle),
            None => Ok(()),
        }
    }

    /// Iterates over the files matching `mask`.
    pub fn entries(&self, archive: ArchiveHandle, mask: &str) -> Result<Entries<'_, E>> {
        let cursor = self.search(archive, mask)?;
        Ok(Entries {
            bridge: self,
            cursor: Some(cursor),
            done: false,
        })
    }
}

/// Iterator over a search. Ends after the last entry or after the first
/// error, and closes the search when dropped.
pub struct Entries<'a, E: Engine> {
    bridge: &'a Bridge<E>,
    cursor: Option<SearchCursor>,
    done: bool,
}

impl<'a, E: Engine> Entries<'a, E> {
    /// Closes the search now, reporting a failure instead of logging it.
    pub fn close(mut self) -> Result<()> {
        match self.cursor.take() {
            Some(cursor) => self.bridge.close_search(cursor),
            None => Ok(()),
        }
    }
}

impl<'a, E: Engine> Iterator for Entries<'a, E> {
    type Item = Result<FindEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let cursor = self.cursor.as_mut()?;
        match self.bridge.advance(cursor) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<'a, E: Engine> FusedIterator for Entries<'a, E> {}

impl<'a, E: Engine> Drop for Entries<'a, E> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            if let Err(err) = self.bridge.close_search(cursor) {
                tracing::warn!(error = %err, "failed to close search");
            }
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::MemoryEngine;

    fn archive_with(names: &[&str]) -> (Bridge<MemoryEngine>, ArchiveHandle) {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("search.mpq", 0, 64).unwrap();
        for (i, name) in names.iter().enumerate() {
            let data = vec![b'x'; i + 1];
            let file = bridge
                .create_file(archive, name, 0x0001_0002_0000_0003, data.len() as u32, 0, 0)
                .unwrap();
            bridge.write_file(file, &data, 0).unwrap();
            bridge.finish_file(file).unwrap();
        }
        (bridge, archive)
    }

    #[test]
    fn star_yields_every_file_then_ends() {
        let names = ["a.txt", "b.txt", "dir\\c.dat"];
        let (bridge, archive) = archive_with(&names);

        let mut cursor = bridge.search(archive, "*").unwrap();
        for name in names {
            let entry = bridge.advance(&mut cursor).unwrap().unwrap();
            assert_eq!(entry.file_name, name);
        }
        assert_eq!(bridge.advance(&mut cursor).unwrap(), None);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(matches!(
            bridge.advance(&mut cursor),
            Err(Error::CursorExhausted)
        ));
        bridge.close_search(cursor).unwrap();
        assert_eq!(bridge.engine().open_handles(), 1);
    }

    #[test]
    fn entry_fields() {
        let (bridge, archive) = archive_with(&["one", "units\\two.slk"]);
        let mut cursor = bridge.search(archive, "*.slk").unwrap();
        let entry = bridge.advance(&mut cursor).unwrap().unwrap();

        assert_eq!(entry.file_name, "units\\two.slk");
        assert_eq!(entry.plain_name, "two.slk");
        assert_eq!(entry.block_index, 1);
        assert_eq!(entry.file_size, 2);
        assert_eq!(entry.file_time_hi, 0x0001_0002);
        assert_eq!(entry.file_time_lo, 3);
        assert_eq!(entry.file_time(), 0x0001_0002_0000_0003);
        assert_eq!(entry.locale, 0);
        bridge.close_search(cursor).unwrap();
    }

    #[test]
    fn zero_matches_is_an_exhausted_cursor() {
        let (bridge, archive) = archive_with(&["a.txt"]);
        assert_eq!(bridge.find_first(archive, "*.none").unwrap(), None);

        let mut cursor = bridge.search(archive, "*.none").unwrap();
        assert_eq!(cursor.handle(), None);
        assert_eq!(bridge.advance(&mut cursor).unwrap(), None);
        assert!(matches!(
            bridge.advance(&mut cursor),
            Err(Error::CursorExhausted)
        ));
        bridge.close_search(cursor).unwrap();
    }

    #[test]
    fn empty_archive_with_empty_mask() {
        let (bridge, archive) = archive_with(&[]);
        assert_eq!(bridge.entries(archive, "").unwrap().count(), 0);
    }

    #[test]
    fn raw_protocol() {
        let (bridge, archive) = archive_with(&["x", "y"]);
        let (search, first) = bridge.find_first(archive, "").unwrap().unwrap();
        assert_eq!(first.file_name, "x");
        assert_eq!(bridge.find_next(search).unwrap().unwrap().file_name, "y");
        assert_eq!(bridge.find_next(search).unwrap(), None);

        bridge.find_close(search).unwrap();
        let err = bridge.find_close(search).unwrap_err();
        assert_eq!(err.kind(), "SearchCloseFailed");
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));

        let err = bridge.find_next(search).unwrap_err();
        assert_eq!(err.kind(), "SearchAdvanceFailed");
    }

    #[test]
    fn start_on_closed_archive_fails() {
        let (bridge, archive) = archive_with(&["x"]);
        bridge.close_archive(archive).unwrap();
        let err = bridge.search(archive, "*").unwrap_err();
        assert_eq!(err.kind(), "SearchStartFailed");
        assert_eq!(err.cause(), Some(Cause::INVALID_HANDLE));
    }

    #[test]
    fn iterator_closes_on_drop() {
        let (bridge, archive) = archive_with(&["a", "b", "c"]);
        let before = bridge.engine().open_handles();

        let mut entries = bridge.entries(archive, "*").unwrap();
        assert_eq!(entries.next().unwrap().unwrap().file_name, "a");
        assert_eq!(bridge.engine().open_handles(), before + 1);
        drop(entries);
        assert_eq!(bridge.engine().open_handles(), before);

        let names: Vec<String> = bridge
            .entries(archive, "?")
            .unwrap()
            .map(|entry| entry.map(|e| e.file_name))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(bridge.engine().open_handles(), before);
    }

    #[test]
    fn iterator_stops_after_an_error() {
        let (bridge, archive) = archive_with(&["a", "b"]);
        let mut entries = bridge.entries(archive, "*").unwrap();
        assert!(entries.next().unwrap().is_ok());

        bridge.close_archive(archive).unwrap();
        let err = entries.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), "SearchAdvanceFailed");
        assert!(entries.next().is_none());
        entries.close().unwrap();
        assert_eq!(bridge.engine().open_handles(), 0);
    }

    #[test]
    fn mask_with_nul_is_rejected() {
        let (bridge, archive) = archive_with(&[]);
        assert!(matches!(
            bridge.search(archive, "a\0"),
            Err(Error::InvalidArgument { name: "mask", .. })
        ));
    }
}
