use std::path::{Path, PathBuf};

use mpq_bridge::flags::{file, LOCALE_NEUTRAL};
use mpq_bridge::{ArchiveHandle, Bridge, Engine};

use crate::commands::{open, with_archive};
use crate::error::{Error, Result};
use crate::util::{archived_name, file_time};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct AddOptions {
    pub create: bool,
    pub max_files: u32,
    pub compression: u32,
    pub replace: bool,
}

pub fn run<E: Engine>(
    bridge: &Bridge<E>,
    path: &Path,
    files: &[PathBuf],
    options: AddOptions,
) -> Result<()> {
    if files.iter().any(|f| f == path) {
        tracing::warn!(path = %path.display(), "refusing to add the archive to itself");
    }

    let archive = if options.create {
        bridge
            .create_archive(path, 0, options.max_files)
            .map_err(|source| Error::CreateArchive {
                path: path.to_path_buf(),
                source,
            })?
    } else {
        open(bridge, path, 0)?
    };

    with_archive(bridge, path, archive, |archive| {
        for local in files.iter().filter(|f| f.as_path() != path) {
            let name = insert(bridge, archive, local, options)?;
            tracing::info!(path = %local.display(), name = %name, "added");
        }
        Ok(())
    })
}

/// Stores one local file and returns its archived name.
pub(crate) fn insert<E: Engine>(
    bridge: &Bridge<E>,
    archive: ArchiveHandle,
    local: &Path,
    options: AddOptions,
) -> Result<String> {
    let name = archived_name(local).ok_or_else(|| Error::InvalidName {
        path: local.to_path_buf(),
    })?;
    let data = std::fs::read(local).map_err(|source| Error::ReadFile {
        path: local.to_path_buf(),
        source,
    })?;
    let size = u32::try_from(data.len()).map_err(|_| Error::FileTooLarge {
        path: local.to_path_buf(),
    })?;
    let modified = std::fs::metadata(local)
        .and_then(|meta| meta.modified())
        .map(file_time)
        .unwrap_or(0);

    let mut flags = file::COMPRESS;
    if options.replace {
        flags |= file::REPLACE_EXISTING;
    }

    let failed = |source| Error::AddFile {
        path: local.to_path_buf(),
        source,
    };
    let handle = bridge
        .create_file(archive, &name, modified, size, LOCALE_NEUTRAL, flags)
        .map_err(failed)?;

    // A created file must always be finished, even after a failed write.
    let written = data
        .chunks(CHUNK_SIZE)
        .try_for_each(|chunk| bridge.write_file(handle, chunk, options.compression));
    let finished = bridge.finish_file(handle);
    written.and(finished).map_err(failed)?;

    Ok(name)
}
