//! Binding caller-owned byte regions to engine transfers.
//!
//! The engine takes a start address and a 32-bit length. A region is borrowed
//! for exactly one call and never copied, so the caller's memory stays put for
//! the duration of the transfer.

use crate::error::{Error, Result};

fn declared_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::BufferTooLarge { len })
}

/// Destination region of a read.
#[derive(Debug)]
pub(crate) struct ReadRegion<'a> {
    bytes: &'a mut [u8],
    capacity: u32,
}

impl<'a> ReadRegion<'a> {
    pub(crate) fn bind(bytes: &'a mut [u8]) -> Result<ReadRegion<'a>> {
        let capacity = declared_len(bytes.len())?;
        Ok(ReadRegion { bytes, capacity })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The whole region, as the engine sees it.
    #[inline(always)]
    pub(crate) fn as_engine_buffer(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }

    /// Checks the engine's reported count against the declared capacity.
    pub(crate) fn complete(self, reported: u32) -> Result<usize> {
        if reported > self.capacity {
            return Err(Error::TransferOverrun {
                reported,
                capacity: self.capacity,
            });
        }
        Ok(reported as usize)
    }
}

/// Source region of a write. The full length is always transferred.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteRegion<'a> {
    bytes: &'a [u8],
    len: u32,
}

impl<'a> WriteRegion<'a> {
    pub(crate) fn bind(bytes: &'a [u8]) -> Result<WriteRegion<'a>> {
        let len = declared_len(bytes.len())?;
        Ok(WriteRegion { bytes, len })
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> u32 {
        self.len
    }

    #[inline(always)]
    pub(crate) fn as_engine_buffer(&self) -> &'a [u8] {
        self.bytes
    }
}
