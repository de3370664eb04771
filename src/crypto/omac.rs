/// OMAC1 / CMAC over any 64- or 128-bit block cipher
///
/// Subkeys come from doubling `L = E(0)` in GF(2^n); the last block is
/// XORed with `K1` when complete, otherwise `0x80`-padded and XORed with `K2`.
use super::cipher::BlockCipher;
use crate::error::{FitError, FitResult};
use crate::memory::{RamSource, Region};

/// MAC length produced for license signatures.
pub const OMAC_SIZE: usize = 16;

const MAX_BLOCK: usize = 16;

fn reduction_constant(block_size: usize) -> FitResult<u8> {
    match block_size {
        16 => Ok(0x87),
        8 => Ok(0x1B),
        _ => Err(FitError::InvalidParam(2)),
    }
}

/// Multiply by `u` in GF(2^n).
fn double(block: &mut [u8], constant: u8) {
    let carry = block[0] & 0x80 != 0;
    for i in 0..block.len() {
        let next = block.get(i + 1).map_or(0, |b| b >> 7);
        block[i] = (block[i] << 1) | next;
    }
    if carry {
        if let Some(last) = block.last_mut() {
            *last ^= constant;
        }
    }
}

pub struct Omac<'c, C: BlockCipher + ?Sized> {
    cipher: &'c C,
    block_size: usize,
    k1: [u8; MAX_BLOCK],
    k2: [u8; MAX_BLOCK],
}

impl<'c, C: BlockCipher + ?Sized> Omac<'c, C> {
    pub fn new(cipher: &'c C) -> FitResult<Self> {
        let block_size = cipher.block_size();
        let constant = reduction_constant(block_size)?;

        let mut k1 = [0u8; MAX_BLOCK];
        cipher.encrypt_block(&mut k1[..block_size]);
        double(&mut k1[..block_size], constant);

        let mut k2 = k1;
        double(&mut k2[..block_size], constant);

        Ok(Self {
            cipher,
            block_size,
            k1,
            k2,
        })
    }

    /// `(K1, K2)` truncated to the block size.
    pub fn subkeys(&self) -> (&[u8], &[u8]) {
        (&self.k1[..self.block_size], &self.k2[..self.block_size])
    }

    /// MAC of `message`, truncated to `out.len()` bytes.
    pub fn compute(&self, message: Region<'_>, out: &mut [u8]) -> FitResult<()> {
        let bs = self.block_size;
        if out.is_empty() || out.len() > bs {
            return Err(FitError::InvalidParam(3));
        }

        let mut state = [0u8; MAX_BLOCK];
        let mut block = [0u8; MAX_BLOCK];
        let total = message.len();
        let mut offset = 0;

        // A complete block is only chained once more input is known to follow.
        while total - offset > bs {
            message.copy_to(offset, &mut block[..bs])?;
            for (s, b) in state[..bs].iter_mut().zip(&block[..bs]) {
                *s ^= b;
            }
            self.cipher.encrypt_block(&mut state[..bs]);
            offset += bs;
        }

        let remaining = total - offset;
        block = [0u8; MAX_BLOCK];
        message.copy_to(offset, &mut block[..remaining])?;
        let subkey = if remaining == bs {
            &self.k1
        } else {
            block[remaining] = 0x80;
            &self.k2
        };

        for i in 0..bs {
            state[i] ^= block[i] ^ subkey[i];
        }
        self.cipher.encrypt_block(&mut state[..bs]);

        out.copy_from_slice(&state[..out.len()]);
        Ok(())
    }
}

/// 16-byte OMAC of `message` under `cipher`.
pub fn omac<C: BlockCipher + ?Sized>(cipher: &C, message: Region<'_>) -> FitResult<[u8; OMAC_SIZE]> {
    let mut out = [0u8; OMAC_SIZE];
    Omac::new(cipher)?.compute(message, &mut out)?;
    Ok(out)
}

pub fn omac_bytes<C: BlockCipher + ?Sized>(cipher: &C, message: &[u8]) -> FitResult<[u8; OMAC_SIZE]> {
    let src = RamSource::new(message);
    omac(cipher, Region::new(&src))
}
