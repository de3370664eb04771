/// AES block encryption used by the hash and MAC constructions
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};

use crate::error::{FitError, FitResult};

pub const AES_BLOCK_SIZE: usize = 16;
pub const AES_128_KEY_LENGTH: usize = 16;
pub const AES_256_KEY_LENGTH: usize = 32;

/// Single-block ECB encryption.
pub trait BlockCipher {
    fn block_size(&self) -> usize;

    /// Encrypt `block` in place; `block.len()` equals `block_size()`.
    fn encrypt_block(&self, block: &mut [u8]);
}

/// AES with a 128- or 256-bit key.
pub enum Aes {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl Aes {
    pub fn new(key: &[u8]) -> FitResult<Self> {
        match key.len() {
            AES_128_KEY_LENGTH => Aes128::new_from_slice(key)
                .map(Aes::Aes128)
                .map_err(|_| FitError::InvalidKeysize),
            AES_256_KEY_LENGTH => Aes256::new_from_slice(key)
                .map(Aes::Aes256)
                .map_err(|_| FitError::InvalidKeysize),
            _ => Err(FitError::InvalidKeysize),
        }
    }
}

impl BlockCipher for Aes {
    fn block_size(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Aes::Aes128(cipher) => cipher.encrypt_block(block),
            Aes::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }
}

/// `AES-128_key(block)`.
pub fn aes128_encrypt(key: &[u8; AES_128_KEY_LENGTH], block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut out = *block;
    cipher.encrypt_block(GenericArray::from_mut_slice(&mut out));
    out
}

/// `AES-256_key(block)`.
pub fn aes256_encrypt(key: &[u8; AES_256_KEY_LENGTH], block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut out = *block;
    cipher.encrypt_block(GenericArray::from_mut_slice(&mut out));
    out
}
