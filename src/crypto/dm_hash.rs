/// Davies-Meyer one-way hash (16-byte output)
///
/// `H0 = FF..FF`, `H_i = AES-128_{m_i}(H_{i-1}) XOR H_{i-1}`, finalised as
/// `AES-128_{H_n}(H_n) XOR H_n`. Each message block is used as the AES key.
/// Used for device fingerprints and as the cheap key of the RSA result cache.
use super::cipher::{aes128_encrypt, AES_BLOCK_SIZE};
use super::padding::for_each_padded_block;
use crate::error::FitResult;
use crate::memory::{RamSource, Region};

pub const DM_HASH_SIZE: usize = 16;

fn compress(state: &mut [u8; DM_HASH_SIZE], key: &[u8; AES_BLOCK_SIZE]) {
    let encrypted = aes128_encrypt(key, state);
    for (h, e) in state.iter_mut().zip(encrypted) {
        *h ^= e;
    }
}

/// Hash the bytes of `message`.
pub fn dm_hash(message: Region<'_>) -> FitResult<[u8; DM_HASH_SIZE]> {
    let mut state = [0xFFu8; DM_HASH_SIZE];
    for_each_padded_block(message, |block| compress(&mut state, block))?;

    let key = state;
    compress(&mut state, &key);
    Ok(state)
}

pub fn dm_hash_bytes(message: &[u8]) -> FitResult<[u8; DM_HASH_SIZE]> {
    let src = RamSource::new(message);
    dm_hash(Region::new(&src))
}
