use std::fmt;

use crate::handle::HandleKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Numeric failure code reported by the engine's last-error slot.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Cause(pub u32);

/// StormLib reuses the Win32 codes on Windows and maps them onto errno values elsewhere.
#[cfg(windows)]
impl Cause {
    pub const SUCCESS: Cause = Cause(0);
    pub const FILE_NOT_FOUND: Cause = Cause(2);
    pub const ACCESS_DENIED: Cause = Cause(5);
    pub const INVALID_HANDLE: Cause = Cause(6);
    pub const NOT_ENOUGH_MEMORY: Cause = Cause(8);
    pub const BAD_FORMAT: Cause = Cause(11);
    pub const NO_MORE_FILES: Cause = Cause(18);
    pub const HANDLE_EOF: Cause = Cause(38);
    pub const NOT_SUPPORTED: Cause = Cause(50);
    pub const INVALID_PARAMETER: Cause = Cause(87);
    pub const DISK_FULL: Cause = Cause(112);
    pub const INSUFFICIENT_BUFFER: Cause = Cause(122);
    pub const ALREADY_EXISTS: Cause = Cause(183);
    pub const CAN_NOT_COMPLETE: Cause = Cause(1003);
    pub const FILE_CORRUPT: Cause = Cause(1392);
}

#[cfg(not(windows))]
impl Cause {
    pub const SUCCESS: Cause = Cause(0);
    pub const ACCESS_DENIED: Cause = Cause(1);
    pub const FILE_NOT_FOUND: Cause = Cause(2);
    pub const INVALID_HANDLE: Cause = Cause(9);
    pub const NOT_ENOUGH_MEMORY: Cause = Cause(12);
    pub const ALREADY_EXISTS: Cause = Cause(17);
    pub const INVALID_PARAMETER: Cause = Cause(22);
    pub const DISK_FULL: Cause = Cause(28);
    pub const NOT_SUPPORTED: Cause = Cause(95);
    pub const INSUFFICIENT_BUFFER: Cause = Cause(105);
    pub const BAD_FORMAT: Cause = Cause(1000);
    pub const NO_MORE_FILES: Cause = Cause(1001);
    pub const HANDLE_EOF: Cause = Cause(1002);
    pub const CAN_NOT_COMPLETE: Cause = Cause(1003);
    pub const FILE_CORRUPT: Cause = Cause(1004);
}

impl Cause {
    #[inline(always)]
    pub fn code(self) -> u32 {
        self.0
    }

    /// Short name of a well-known code, if this is one.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Cause::SUCCESS => "success",
            Cause::FILE_NOT_FOUND => "file not found",
            Cause::ACCESS_DENIED => "access denied",
            Cause::INVALID_HANDLE => "invalid handle",
            Cause::NOT_ENOUGH_MEMORY => "not enough memory",
            Cause::BAD_FORMAT => "bad format",
            Cause::NO_MORE_FILES => "no more files",
            Cause::HANDLE_EOF => "end of file",
            Cause::NOT_SUPPORTED => "not supported",
            Cause::INVALID_PARAMETER => "invalid parameter",
            Cause::DISK_FULL => "disk full",
            Cause::INSUFFICIENT_BUFFER => "insufficient buffer",
            Cause::ALREADY_EXISTS => "already exists",
            Cause::CAN_NOT_COMPLETE => "cannot complete",
            Cause::FILE_CORRUPT => "file corrupt",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// The logical engine operation that failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operation {
    ArchiveOpen,
    ArchiveCreate,
    ArchiveFlush,
    ArchiveCompact,
    ArchiveClose,
    FileOpen,
    FileSize,
    FileRead,
    FileCreate,
    FileWrite,
    FileFinish,
    FileClose,
    FileCheck,
    FileRemove,
    SearchStart,
    SearchAdvance,
    SearchClose,
}

impl Operation {
    /// Stable error kind, suitable for matching on across the host boundary.
    pub fn kind(&self) -> &'static str {
        use Operation::*;

        match self {
            ArchiveOpen => "ArchiveOpenFailed",
            ArchiveCreate => "ArchiveCreateFailed",
            ArchiveFlush => "ArchiveFlushFailed",
            ArchiveCompact => "ArchiveCompactFailed",
            ArchiveClose => "ArchiveCloseFailed",
            FileOpen => "FileOpenFailed",
            FileSize => "FileSizeUnavailable",
            FileRead => "FileReadFailed",
            FileCreate => "FileCreateFailed",
            FileWrite => "FileWriteFailed",
            FileFinish => "FileFinishFailed",
            FileClose => "FileCloseFailed",
            FileCheck => "FileCheckFailed",
            FileRemove => "FileRemoveFailed",
            SearchStart => "SearchStartFailed",
            SearchAdvance => "SearchAdvanceFailed",
            SearchClose => "SearchCloseFailed",
        }
    }

    pub fn label(&self) -> &'static str {
        use Operation::*;

        match self {
            ArchiveOpen => "open archive",
            ArchiveCreate => "create archive",
            ArchiveFlush => "flush archive",
            ArchiveCompact => "compact archive",
            ArchiveClose => "close archive",
            FileOpen => "open file",
            FileSize => "get file size",
            FileRead => "read file",
            FileCreate => "create file",
            FileWrite => "write file",
            FileFinish => "finish file",
            FileClose => "close file",
            FileCheck => "check file",
            FileRemove => "remove file",
            SearchStart => "find first file",
            SearchAdvance => "find next file",
            SearchClose => "close search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid {kind} handle `{token:#x}`")]
    InvalidHandle { kind: HandleKind, token: u64 },

    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },

    #[error("Buffer of {len} bytes exceeds the engine's transfer limit")]
    BufferTooLarge { len: usize },

    #[error("Engine reported {reported} bytes transferred for a {capacity} byte buffer")]
    TransferOverrun { reported: u32, capacity: u32 },

    #[error("Search cursor has already reached the end of its entries")]
    CursorExhausted,

    #[error("Failed to {operation} (cause {cause})")]
    Engine { operation: Operation, cause: Cause },
}

impl Error {
    pub(crate) fn engine(operation: Operation, cause: Cause) -> Error {
        Error::Engine { operation, cause }
    }

    /// Stable error kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidHandle { .. } => "InvalidHandle",
            Error::InvalidArgument { .. } => "InvalidArgument",
            Error::BufferTooLarge { .. } => "BufferTooLarge",
            Error::TransferOverrun { .. } => "TransferOverrun",
            Error::CursorExhausted => "CursorExhausted",
            Error::Engine { operation, .. } => operation.kind(),
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Engine { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<Cause> {
        match self {
            Error::Engine { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}
