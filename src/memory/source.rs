/// Byte sources for license and key memory
///
/// Licenses may live in RAM, memory-mapped flash or an EEPROM that is only
/// reachable through a driver call. Everything above this layer reads one
/// byte at a time through `ByteSource`, so it never assumes contiguous
/// addressable memory.

/// One-byte-at-a-time view over caller-owned memory.
pub trait ByteSource {
    /// Number of readable bytes.
    fn len(&self) -> usize;

    /// Read the byte at `addr` (relative to the start of the source).
    ///
    /// Callers stay below `len()`; reading past it is a contract violation.
    fn read_byte(&self, addr: usize) -> u8;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read_byte(&self, addr: usize) -> u8 {
        (**self).read_byte(addr)
    }
}

/// Plain RAM.
#[derive(Debug, Clone, Copy)]
pub struct RamSource<'a> {
    bytes: &'a [u8],
}

impl<'a> RamSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }
}

impl ByteSource for RamSource<'_> {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&self, addr: usize) -> u8 {
        self.bytes.get(addr).copied().unwrap_or(0)
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn read_byte(&self, addr: usize) -> u8 {
        self.get(addr).copied().unwrap_or(0)
    }
}

impl<const N: usize> ByteSource for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn read_byte(&self, addr: usize) -> u8 {
        self.get(addr).copied().unwrap_or(0)
    }
}

/// Memory reached through a driver callback (flash, EEPROM, ...).
///
/// `base` is the device address of the first byte; `read` receives absolute
/// device addresses.
pub struct CallbackSource<F>
where
    F: Fn(usize) -> u8,
{
    base: usize,
    length: usize,
    read: F,
}

impl<F> CallbackSource<F>
where
    F: Fn(usize) -> u8,
{
    pub fn new(base: usize, length: usize, read: F) -> Self {
        Self { base, length, read }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl<F> ByteSource for CallbackSource<F>
where
    F: Fn(usize) -> u8,
{
    fn len(&self) -> usize {
        self.length
    }

    fn read_byte(&self, addr: usize) -> u8 {
        (self.read)(self.base.wrapping_add(addr))
    }
}
