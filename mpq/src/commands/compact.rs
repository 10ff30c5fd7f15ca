use std::path::Path;

use mpq_bridge::{Bridge, Engine};

use crate::commands::{open, with_archive};
use crate::error::{Error, Result};

pub fn run<E: Engine>(bridge: &Bridge<E>, path: &Path, list_file: Option<&Path>) -> Result<()> {
    let archive = open(bridge, path, 0)?;
    with_archive(bridge, path, archive, |archive| {
        bridge
            .compact_archive(archive, list_file)
            .map_err(|source| Error::Compact {
                path: path.to_path_buf(),
                source,
            })
    })
}
