use std::path::{Component, Path};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mpq_bridge::flags::compression;

use crate::error::{Error, Result};

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET: u64 = 11_644_473_600;
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;

pub fn parse_compression(src: &str) -> Result<u32> {
    let value = match src {
        "none" | "stored" => 0,
        "huffman" => compression::HUFFMANN,
        "zlib" | "deflate" => compression::ZLIB,
        "pkware" | "implode" => compression::PKWARE,
        "bzip2" => compression::BZIP2,
        "lzma" => compression::LZMA,
        "sparse" => compression::SPARSE,
        _ => return Err(Error::UnknownCompression(src.to_string())),
    };

    Ok(value)
}

#[inline(always)]
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Converts a timestamp to a Windows FILETIME, or 0 if it predates 1601.
pub fn file_time(time: SystemTime) -> u64 {
    let since_unix = match time.duration_since(UNIX_EPOCH) {
        Ok(v) => v,
        Err(_) => return 0,
    };
    (since_unix.as_secs() + FILETIME_UNIX_OFFSET) * FILETIME_TICKS_PER_SECOND
        + u64::from(since_unix.subsec_nanos()) / 100
}

/// Renders a FILETIME as RFC 3339, `-` when unset or before the Unix epoch.
pub fn format_time(file_time: u64) -> String {
    Some(file_time / FILETIME_TICKS_PER_SECOND)
        .filter(|secs| *secs >= FILETIME_UNIX_OFFSET && file_time != 0)
        .map(|secs| UNIX_EPOCH + Duration::new(secs - FILETIME_UNIX_OFFSET, 0))
        .map(|x| {
            let datetime: chrono::DateTime<chrono::Utc> = x.into();
            datetime.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|| "-".into())
}

/// Archived name for a local path. Relative paths keep their normal
/// components joined with `\`; absolute paths keep only the file name.
pub fn archived_name(path: &Path) -> Option<String> {
    if path.has_root() {
        return path.file_name()?.to_str().map(str::to_string);
    }

    let parts = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("\\"))
}
