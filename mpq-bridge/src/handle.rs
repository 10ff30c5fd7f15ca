//! Boundary-safe tokens for the engine's opaque resource handles.
//!
//! The engine hands out pointer-sized handles that mean nothing outside of it.
//! They cross the boundary as 64-bit tokens, wrapped per resource kind so an
//! archive token can never be passed where a file or search token is expected.

use std::fmt;
use std::num::NonZeroUsize;

use crate::error::{Error, Result};

// Every supported target has pointers no wider than the token.
const _: () = assert!(usize::BITS <= u64::BITS);

/// A handle as the engine produced it. Never zero.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NativeHandle(NonZeroUsize);

impl NativeHandle {
    pub fn new(value: usize) -> Option<NativeHandle> {
        NonZeroUsize::new(value).map(NativeHandle)
    }

    #[inline(always)]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// The resource a token stands for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum HandleKind {
    Archive,
    File,
    Search,
}

impl HandleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleKind::Archive => "archive",
            HandleKind::File => "file",
            HandleKind::Search => "search",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[inline(always)]
fn encode(native: NativeHandle) -> u64 {
    native.get() as u64
}

fn decode(kind: HandleKind, token: u64) -> Result<NativeHandle> {
    usize::try_from(token)
        .ok()
        .and_then(NativeHandle::new)
        .ok_or(Error::InvalidHandle { kind, token })
}

macro_rules! token {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u64);

        impl $name {
            pub const KIND: HandleKind = $kind;

            /// Wraps a token received from the host. Validity is checked on use.
            #[inline(always)]
            pub const fn from_raw(token: u64) -> $name {
                $name(token)
            }

            #[inline(always)]
            pub const fn into_raw(self) -> u64 {
                self.0
            }

            #[inline(always)]
            pub fn encode(native: NativeHandle) -> $name {
                $name(encode(native))
            }

            /// Recovers the engine handle, failing with [`Error::InvalidHandle`]
            /// when the token is zero or wider than a native pointer.
            #[inline(always)]
            pub fn decode(self) -> Result<NativeHandle> {
                decode(Self::KIND, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(handle: $name) -> u64 {
                handle.0
            }
        }
    };
}

token!(
    /// Token for one open or created archive.
    ArchiveHandle => HandleKind::Archive
);

token!(
    /// Token for one file opened for reading or created for writing.
    FileHandle => HandleKind::File
);

token!(
    /// Token for one enumeration in progress.
    SearchHandle => HandleKind::Search
);
