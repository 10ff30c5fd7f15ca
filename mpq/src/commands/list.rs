use std::io::Write;
use std::path::Path;

use mpq_bridge::flags::stream_flag;
use mpq_bridge::{Bridge, Engine, FindEntry};

use crate::commands::{open, with_archive};
use crate::error::{Error, Result};
use crate::util::{format_size, format_time};

pub fn run<E: Engine>(bridge: &Bridge<E>, path: &Path, mask: &str) -> Result<()> {
    let archive = open(bridge, path, stream_flag::READ_ONLY)?;
    let entries = with_archive(bridge, path, archive, |archive| {
        bridge
            .entries(archive, mask)
            .and_then(|entries| entries.collect::<mpq_bridge::Result<Vec<_>>>())
            .map_err(|source| Error::List {
                path: path.to_path_buf(),
                source,
            })
    })?;

    let stdout = std::io::stdout();
    write_listing(stdout.lock(), &entries).map_err(|source| Error::WriteOutput { source })
}

fn write_listing<W: Write>(mut out: W, entries: &[FindEntry]) -> std::io::Result<()> {
    writeln!(
        out,
        "Compressed     Length         Created                Locale  Path"
    )?;
    writeln!(
        out,
        "-------------  -------------  ---------------------  ------  --------"
    )?;

    let mut total_compressed = 0u64;
    let mut total_size = 0u64;
    for entry in entries {
        writeln!(
            out,
            "{:>12}   {:>12}   {:<20}   {:>6}  {}",
            format_size(u64::from(entry.compressed_size)),
            format_size(u64::from(entry.file_size)),
            format_time(entry.file_time()),
            format!("{:04x}", entry.locale),
            entry.file_name,
        )?;
        total_compressed += u64::from(entry.compressed_size);
        total_size += u64::from(entry.file_size);
    }

    writeln!(
        out,
        "{:>12}   {:>12}   {} files",
        format_size(total_compressed),
        format_size(total_size),
        entries.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_has_one_row_per_entry() {
        let entries = vec![
            FindEntry {
                file_name: "units\\human.slk".into(),
                plain_name: "human.slk".into(),
                file_size: 2048,
                compressed_size: 1024,
                ..FindEntry::default()
            },
            FindEntry {
                file_name: "war3map.j".into(),
                plain_name: "war3map.j".into(),
                file_size: 10,
                compressed_size: 10,
                locale: 0x409,
                ..FindEntry::default()
            },
        ];

        let mut out = Vec::new();
        write_listing(&mut out, &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[2].ends_with("units\\human.slk"));
        assert!(lines[2].contains("KiB"));
        assert!(lines[3].contains("0409"));
        assert!(lines[4].ends_with("2 files"));
    }
}
