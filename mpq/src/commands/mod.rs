pub mod add;
pub mod cat;
pub mod compact;
pub mod list;
pub mod rm;
pub mod serve;

pub use add::run as add;
pub use add::AddOptions;
pub use cat::run as cat;
pub use compact::run as compact;
pub use list::run as list;
pub use rm::run as rm;
pub use serve::{run, serve};

use std::path::Path;

use mpq_bridge::{ArchiveHandle, Bridge, Engine};

use crate::error::{Error, Result};

/// Runs `work` on an open archive and closes it afterwards, even on failure.
/// The first error wins.
pub(crate) fn with_archive<E, T, F>(
    bridge: &Bridge<E>,
    path: &Path,
    archive: ArchiveHandle,
    work: F,
) -> Result<T>
where
    E: Engine,
    F: FnOnce(ArchiveHandle) -> Result<T>,
{
    let result = work(archive);
    let closed = bridge
        .close_archive(archive)
        .map_err(|source| Error::CloseArchive {
            path: path.to_path_buf(),
            source,
        });

    match (result, closed) {
        (Err(err), _) => Err(err),
        (Ok(_), Err(err)) => Err(err),
        (Ok(value), Ok(())) => Ok(value),
    }
}

pub(crate) fn open<E: Engine>(bridge: &Bridge<E>, path: &Path, flags: u32) -> Result<ArchiveHandle> {
    bridge
        .open_archive(path, flags)
        .map_err(|source| Error::OpenArchive {
            path: path.to_path_buf(),
            source,
        })
}
