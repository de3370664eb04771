/// Abreast Davies-Meyer hash (32-byte output) over AES-256
///
/// Two 16-byte halves `G` and `H` start at `FF..FF`. Per message block `M`:
///   G ^= AES-256_{H || M}(G)
///   H ^= AES-256_{M || G}(!H)   (with the already updated G)
/// Finalisation keys AES-256 with `G || H` once and encrypts each half.
/// The digest feeds the RSA PKCS#1 v1.5 signature check.
use super::cipher::{aes256_encrypt, AES_256_KEY_LENGTH, AES_BLOCK_SIZE};
use super::padding::for_each_padded_block;
use crate::error::FitResult;
use crate::memory::{RamSource, Region};

pub const ABREAST_DM_HASH_SIZE: usize = 32;

fn key_of(left: &[u8; AES_BLOCK_SIZE], right: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_256_KEY_LENGTH] {
    let mut key = [0u8; AES_256_KEY_LENGTH];
    key[..AES_BLOCK_SIZE].copy_from_slice(left);
    key[AES_BLOCK_SIZE..].copy_from_slice(right);
    key
}

fn xor_into(target: &mut [u8; AES_BLOCK_SIZE], other: &[u8; AES_BLOCK_SIZE]) {
    for (t, o) in target.iter_mut().zip(other) {
        *t ^= o;
    }
}

struct AbreastState {
    g: [u8; AES_BLOCK_SIZE],
    h: [u8; AES_BLOCK_SIZE],
}

impl AbreastState {
    fn new() -> Self {
        Self {
            g: [0xFF; AES_BLOCK_SIZE],
            h: [0xFF; AES_BLOCK_SIZE],
        }
    }

    fn absorb(&mut self, block: &[u8; AES_BLOCK_SIZE]) {
        let g_out = aes256_encrypt(&key_of(&self.h, block), &self.g);
        xor_into(&mut self.g, &g_out);

        let mut not_h = self.h;
        for byte in not_h.iter_mut() {
            *byte ^= 0xFF;
        }
        let h_out = aes256_encrypt(&key_of(block, &self.g), &not_h);
        xor_into(&mut self.h, &h_out);
    }

    fn finalize(mut self) -> [u8; ABREAST_DM_HASH_SIZE] {
        let key = key_of(&self.g, &self.h);
        let g_out = aes256_encrypt(&key, &self.g);
        let h_out = aes256_encrypt(&key, &self.h);
        xor_into(&mut self.g, &g_out);
        xor_into(&mut self.h, &h_out);
        key_of(&self.g, &self.h)
    }
}

pub fn abreast_dm_hash(message: Region<'_>) -> FitResult<[u8; ABREAST_DM_HASH_SIZE]> {
    let mut state = AbreastState::new();
    for_each_padded_block(message, |block| state.absorb(block))?;
    Ok(state.finalize())
}

pub fn abreast_dm_hash_bytes(message: &[u8]) -> FitResult<[u8; ABREAST_DM_HASH_SIZE]> {
    let src = RamSource::new(message);
    abreast_dm_hash(Region::new(&src))
}
