use std::path::Path;

use mpq_bridge::{Bridge, Engine};

use crate::commands::{open, with_archive};
use crate::error::{Error, Result};

pub fn run<E: Engine>(bridge: &Bridge<E>, path: &Path, names: &[String]) -> Result<()> {
    let archive = open(bridge, path, 0)?;
    with_archive(bridge, path, archive, |archive| {
        for name in names {
            bridge
                .remove_file(archive, name)
                .map_err(|source| Error::RemoveFile {
                    name: name.clone(),
                    source,
                })?;
            tracing::info!(name = %name, "removed");
        }
        Ok(())
    })
}
