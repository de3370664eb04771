/// Block splitting and length padding shared by the Davies-Meyer hashes
///
/// The last chunk (1..=16 bytes) is zero-padded to an odd multiple of
/// 8 bytes, then an 8-byte trailer carries the message length in bits.
/// Only the low 16 bits of that length are stored; licenses signed in the
/// field depend on this exact trailer.
use super::cipher::AES_BLOCK_SIZE;
use crate::error::{FitError, FitResult};
use crate::memory::Region;

const HALF_BLOCK: usize = AES_BLOCK_SIZE / 2;

/// Pad the final chunk of a `total_len`-byte message.
///
/// Returns the padded buffer and how many of its bytes are used (16 or 32).
pub fn pad_final_chunk(chunk: &[u8], total_len: usize) -> ([u8; 2 * AES_BLOCK_SIZE], usize) {
    let mut out = [0u8; 2 * AES_BLOCK_SIZE];
    out[..chunk.len()].copy_from_slice(chunk);

    let mut len = chunk.len() + (HALF_BLOCK - chunk.len() % HALF_BLOCK);
    if len % AES_BLOCK_SIZE == 0 {
        len += HALF_BLOCK;
    }

    let bits = (total_len.wrapping_mul(8) & 0xFFFF) as u16;
    len += HALF_BLOCK;
    out[len - 2..len].copy_from_slice(&bits.to_be_bytes());
    (out, len)
}

/// Feed every padded 16-byte block of `message` to `absorb`.
pub fn for_each_padded_block<F>(message: Region<'_>, mut absorb: F) -> FitResult<()>
where
    F: FnMut(&[u8; AES_BLOCK_SIZE]),
{
    let total = message.len();
    if total == 0 {
        return Err(FitError::InvalidParam(1));
    }

    let mut block = [0u8; AES_BLOCK_SIZE];
    let mut offset = 0;
    while offset + AES_BLOCK_SIZE < total {
        message.copy_to(offset, &mut block)?;
        absorb(&block);
        offset += AES_BLOCK_SIZE;
    }

    let mut chunk = [0u8; AES_BLOCK_SIZE];
    let chunk_len = total - offset;
    message.copy_to(offset, &mut chunk[..chunk_len])?;

    let (padded, padded_len) = pad_final_chunk(&chunk[..chunk_len], total);
    for piece in padded[..padded_len].chunks_exact(AES_BLOCK_SIZE) {
        block.copy_from_slice(piece);
        absorb(&block);
    }
    Ok(())
}
