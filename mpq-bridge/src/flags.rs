//! Flag vocabularies understood by the engine.
//!
//! All values are passed through to the engine untouched; this layer only
//! names them.

/// Limits for the `max_file_count` of a new archive.
pub mod hash_table_size {
    pub const MIN: u32 = 0x0000_0004;
    pub const MAX: u32 = 0x0008_0000;
}

/// Stream provider, selecting how the archive's bytes are laid out.
pub mod stream_provider {
    /// Plain linear file. The default.
    pub const FLAT: u32 = 0x0000;
    /// Partial file as used by trial game clients.
    pub const PARTIAL: u32 = 0x0010;
    /// Encrypted archive (`.MPQE`).
    pub const MPQE: u32 = 0x0020;
    /// Split into 0x4000 byte blocks, each followed by an MD5 in ANSI text.
    pub const BLOCK4: u32 = 0x0030;
    pub const FILE: u32 = 0x0000;
    pub const MASK: u32 = 0x00F0;
}

/// Base provider, selecting where the archive's bytes come from.
pub mod base_provider {
    pub const FILE: u32 = 0x0000;
    /// Memory mapped local file.
    pub const MAP: u32 = 0x0001;
    /// Random access HTTP. Windows only.
    pub const HTTP: u32 = 0x0002;
    pub const MASK: u32 = 0x000F;
}

pub mod stream_flag {
    pub const READ_ONLY: u32 = 0x0000_0100;
    /// Allow another writer on the same archive. Concurrent writes corrupt it.
    pub const WRITE_SHARE: u32 = 0x0000_0200;
    /// Respect the file bitmap of on-demand downloaded archives.
    pub const USE_BITMAP: u32 = 0x0000_0400;
}

/// Options for opening an existing archive.
pub mod open {
    pub const NO_LISTFILE: u32 = 0x0001_0000;
    pub const NO_ATTRIBUTES: u32 = 0x0002_0000;
    pub const NO_HEADER_SEARCH: u32 = 0x0004_0000;
    pub const FORCE_MPQ_V1: u32 = 0x0008_0000;
    pub const CHECK_SECTOR_CRC: u32 = 0x0010_0000;
}

/// Options for creating a new archive.
pub mod create {
    pub const LISTFILE: u32 = 0x0010_0000;
    pub const ATTRIBUTES: u32 = 0x0020_0000;
    pub const SIGNATURE: u32 = 0x0040_0000;
    pub const ARCHIVE_V1: u32 = 0x0000_0000;
    pub const ARCHIVE_V2: u32 = 0x0100_0000;
    pub const ARCHIVE_V3: u32 = 0x0200_0000;
    pub const ARCHIVE_V4: u32 = 0x0300_0000;
}

/// How a file name is looked up when opening it.
pub mod scope {
    pub const FROM_MPQ: u32 = 0x0000_0000;
    pub const CHECK_EXISTS: u32 = 0xFFFF_FFFC;
    pub const BASE_FILE: u32 = 0xFFFF_FFFD;
    pub const ANY_LOCALE: u32 = 0xFFFF_FFFE;
    pub const LOCAL_FILE: u32 = 0xFFFF_FFFF;
}

/// Per-file flags, given to `create_file` and reported in find entries.
pub mod file {
    pub const IMPLODE: u32 = 0x0000_0100;
    pub const COMPRESS: u32 = 0x0000_0200;
    pub const ENCRYPTED: u32 = 0x0001_0000;
    pub const FIX_KEY: u32 = 0x0002_0000;
    pub const PATCH_FILE: u32 = 0x0010_0000;
    pub const SINGLE_UNIT: u32 = 0x0100_0000;
    pub const DELETE_MARKER: u32 = 0x0200_0000;
    pub const SECTOR_CRC: u32 = 0x0400_0000;
    /// Set on every live entry.
    pub const EXISTS: u32 = 0x8000_0000;
    /// Same bit as [`EXISTS`]; on create it means "overwrite".
    pub const REPLACE_EXISTING: u32 = 0x8000_0000;
}

/// Compression selectors for `write_file`.
pub mod compression {
    pub const HUFFMANN: u32 = 0x01;
    pub const ZLIB: u32 = 0x02;
    pub const PKWARE: u32 = 0x08;
    pub const BZIP2: u32 = 0x10;
    pub const SPARSE: u32 = 0x20;
    pub const ADPCM_MONO: u32 = 0x40;
    pub const ADPCM_STEREO: u32 = 0x80;
    pub const LZMA: u32 = 0x12;
    /// Reuse the previous sector's compression.
    pub const NEXT_SAME: u32 = 0xFFFF_FFFF;
}

/// Language-neutral locale.
pub const LOCALE_NEUTRAL: u32 = 0;

/// Low word returned by the engine when it cannot size a file.
pub const INVALID_SIZE: u32 = 0xFFFF_FFFF;
