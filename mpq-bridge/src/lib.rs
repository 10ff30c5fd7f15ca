//! Safe, token-based access to the StormLib MPQ archive engine.
//!
//! The engine does all of the format work. This crate turns its opaque
//! handles into typed 64-bit tokens, lends caller-owned buffers to its
//! read and write calls, and turns its last-error codes into [`Error`]s.
//!
//! Use [`Bridge`] with any [`Engine`]: [`MemoryEngine`] for an in-process
//! archive store, or `StormLib` (feature `stormlib`) for the real library.
//!
//! ```
//! use mpq_bridge::{flags, Bridge, MemoryEngine};
//!
//! let bridge = Bridge::new(MemoryEngine::new());
//! let archive = bridge.create_archive("demo.mpq", 0, 16)?;
//!
//! let data = b"hello";
//! let file = bridge.create_file(archive, "greeting.txt", 0, data.len() as u32, 0, 0)?;
//! bridge.write_file(file, data, flags::compression::ZLIB)?;
//! bridge.finish_file(file)?;
//!
//! assert!(bridge.has_file(archive, "greeting.txt")?);
//! bridge.close_archive(archive)?;
//! # Ok::<(), mpq_bridge::Error>(())
//! ```

use std::path::Path;

mod archive;
mod buffer;
pub mod engine;
pub mod error;
mod file;
pub mod flags;
pub mod handle;
pub mod search;
mod translate;

pub use engine::Engine;
#[cfg(feature = "memory")]
pub use engine::MemoryEngine;
#[cfg(feature = "stormlib")]
pub use engine::StormLib;
pub use error::{Cause, Error, Operation, Result};
pub use handle::{ArchiveHandle, FileHandle, HandleKind, NativeHandle, SearchHandle};
pub use search::{CursorState, Entries, FindEntry, SearchCursor};

/// Entry point for every archive, file and search operation.
///
/// The bridge holds no state of its own besides the engine. It takes no locks;
/// a token must not be used from two threads at once.
#[derive(Debug, Default)]
pub struct Bridge<E> {
    engine: E,
}

impl<E: Engine> Bridge<E> {
    pub fn new(engine: E) -> Bridge<E> {
        Bridge { engine }
    }

    #[inline(always)]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}

/// Rejects names the engine cannot take as C strings.
pub(crate) fn require_name(argument: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument {
            name: argument,
            reason: "must not be empty",
        });
    }
    if value.contains('\0') {
        return Err(Error::InvalidArgument {
            name: argument,
            reason: "must not contain NUL",
        });
    }
    Ok(())
}

pub(crate) fn require_path(argument: &'static str, value: &Path) -> Result<()> {
    if value.as_os_str().is_empty() {
        return Err(Error::InvalidArgument {
            name: argument,
            reason: "must not be empty",
        });
    }
    if value.to_string_lossy().contains('\0') {
        return Err(Error::InvalidArgument {
            name: argument,
            reason: "must not contain NUL",
        });
    }
    Ok(())
}
