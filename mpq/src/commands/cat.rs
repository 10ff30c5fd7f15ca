use std::io::Write;
use std::path::Path;

use mpq_bridge::flags::{scope, stream_flag};
use mpq_bridge::{ArchiveHandle, Bridge, Engine};

use crate::commands::{open, with_archive};
use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 64 * 1024;

pub fn run<E: Engine>(bridge: &Bridge<E>, path: &Path, names: &[String]) -> Result<()> {
    let archive = open(bridge, path, stream_flag::READ_ONLY)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    with_archive(bridge, path, archive, |archive| {
        for name in names {
            extract(bridge, archive, name, &mut out)?;
        }
        out.flush().map_err(|source| Error::WriteOutput { source })
    })
}

/// Copies one archived file to `out`, reading until a short read.
pub(crate) fn extract<E, W>(
    bridge: &Bridge<E>,
    archive: ArchiveHandle,
    name: &str,
    out: &mut W,
) -> Result<u64>
where
    E: Engine,
    W: Write,
{
    let failed = |source| Error::Extract {
        name: name.to_string(),
        source,
    };

    let file = bridge
        .open_file(archive, name, scope::FROM_MPQ)
        .map_err(failed)?;
    let size = bridge.file_size(file).map_err(failed)?;
    tracing::debug!(name, size, "extracting");

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut copied = 0u64;
    let result = loop {
        let read = match bridge.read_file(file, &mut buffer) {
            Ok(read) => read,
            Err(err) => break Err(failed(err)),
        };
        if let Err(source) = out.write_all(&buffer[..read]) {
            break Err(Error::WriteOutput { source });
        }
        copied += read as u64;
        if read < buffer.len() {
            break Ok(copied);
        }
    };

    let closed = bridge.close_file(file).map_err(failed);
    match (result, closed) {
        (Err(err), _) => Err(err),
        (Ok(_), Err(err)) => Err(err),
        (Ok(copied), Ok(())) => Ok(copied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpq_bridge::{FileHandle, MemoryEngine};

    #[test]
    fn extracts_across_chunk_boundaries() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("c.mpq", 0, 16).unwrap();
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 17).map(|i| i as u8).collect();
        let file = bridge
            .create_file(archive, "big.bin", 0, data.len() as u32, 0, 0)
            .unwrap();
        bridge.write_file(file, &data, 0).unwrap();
        bridge.finish_file(file).unwrap();

        let mut out = Vec::new();
        let copied = extract(&bridge, archive, "big.bin", &mut out).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
        assert_eq!(bridge.engine().open_handles(), 1);
    }

    /// Fails every write, after closing the file being extracted so that the
    /// close in `extract` fails as well.
    struct Refusing<'a> {
        bridge: &'a Bridge<MemoryEngine>,
        reader: FileHandle,
    }

    impl Write for Refusing<'_> {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.bridge.close_file(self.reader).unwrap();
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_failure_is_not_hidden_by_close_failure() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("c.mpq", 0, 16).unwrap();
        let file = bridge.create_file(archive, "f", 0, 3, 0, 0).unwrap();
        bridge.write_file(file, b"abc", 0).unwrap();
        bridge.finish_file(file).unwrap();

        // The reader opened by `extract` is the next handle handed out.
        let reader = FileHandle::from_raw(file.into_raw() + 0x10);
        let mut out = Refusing {
            bridge: &bridge,
            reader,
        };
        let err = extract(&bridge, archive, "f", &mut out).unwrap_err();
        assert!(matches!(err, Error::WriteOutput { .. }));
        assert_eq!(bridge.engine().open_handles(), 1);
    }

    #[test]
    fn missing_name_is_reported() {
        let bridge = Bridge::new(MemoryEngine::new());
        let archive = bridge.create_archive("c.mpq", 0, 16).unwrap();
        let err = extract(&bridge, archive, "nope", &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Extract { ref name, .. } if name == "nope"));
    }
}
