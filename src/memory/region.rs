/// Bounds-checked window over a byte source
///
/// Every offset in a V2C blob comes from an untrusted length field, so the
/// parser only reads through `Region`. A child window must fit inside its
/// parent, and every scalar read must fit inside the window.
use std::fmt;

use super::scalar::{read_u16, read_u32, read_u8};
use super::source::ByteSource;
use crate::error::{FitError, FitResult};

#[derive(Clone, Copy)]
pub struct Region<'a> {
    source: &'a dyn ByteSource,
    start: usize,
    end: usize,
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

impl<'a> Region<'a> {
    /// Window over the whole source.
    pub fn new(source: &'a dyn ByteSource) -> Self {
        Self {
            source,
            start: 0,
            end: source.len(),
        }
    }

    /// Absolute address of the first byte.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn source(&self) -> &'a dyn ByteSource {
        self.source
    }

    fn checked(&self, offset: usize, width: usize) -> FitResult<usize> {
        let addr = self.start.checked_add(offset).ok_or(FitError::InvalidV2c)?;
        let last = addr.checked_add(width).ok_or(FitError::InvalidV2c)?;
        if last > self.end {
            return Err(FitError::InvalidV2c);
        }
        Ok(addr)
    }

    pub fn u8_at(&self, offset: usize) -> FitResult<u8> {
        let addr = self.checked(offset, 1)?;
        Ok(read_u8(self.source, addr))
    }

    pub fn u16_at(&self, offset: usize) -> FitResult<u16> {
        let addr = self.checked(offset, 2)?;
        Ok(read_u16(self.source, addr))
    }

    pub fn u32_at(&self, offset: usize) -> FitResult<u32> {
        let addr = self.checked(offset, 4)?;
        Ok(read_u32(self.source, addr))
    }

    /// Child window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> FitResult<Region<'a>> {
        let start = self.checked(offset, len)?;
        Ok(Region {
            source: self.source,
            start,
            end: start + len,
        })
    }

    /// Child window from `offset` to the end of this window.
    pub fn tail(&self, offset: usize) -> FitResult<Region<'a>> {
        let len = self.len().checked_sub(offset).ok_or(FitError::InvalidV2c)?;
        self.slice(offset, len)
    }

    /// Child window described by a u32 length prefix at `offset`.
    pub fn prefixed(&self, offset: usize) -> FitResult<Region<'a>> {
        let len = self.u32_at(offset)? as usize;
        self.slice(offset + 4, len)
    }

    /// Copy `out.len()` bytes starting at `offset`.
    pub fn copy_to(&self, offset: usize, out: &mut [u8]) -> FitResult<()> {
        let addr = self.checked(offset, out.len())?;
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.source.read_byte(addr + i);
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        (self.start..self.end)
            .map(|addr| self.source.read_byte(addr))
            .collect()
    }
}
