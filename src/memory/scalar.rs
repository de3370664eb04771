/// Little-endian scalar decoding on top of `ByteSource`
///
/// No bounds checks here; `Region` is the checked entry point.
use super::source::ByteSource;

pub fn read_u8<S: ByteSource + ?Sized>(src: &S, addr: usize) -> u8 {
    src.read_byte(addr)
}

pub fn read_u16<S: ByteSource + ?Sized>(src: &S, addr: usize) -> u16 {
    u16::from_le_bytes([src.read_byte(addr), src.read_byte(addr + 1)])
}

pub fn read_u32<S: ByteSource + ?Sized>(src: &S, addr: usize) -> u32 {
    u32::from_le_bytes([
        src.read_byte(addr),
        src.read_byte(addr + 1),
        src.read_byte(addr + 2),
        src.read_byte(addr + 3),
    ])
}
