/// Single-slot cache of the last successful RSA verification
///
/// Holds the Davies-Meyer hashes of the whole V2C that last passed RSA and
/// node-lock checks and of the public key it was checked with. A later call
/// with the same V2C and key skips the RSA public-key operation. Only the
/// hashes are kept, never a reference into caller memory.
use subtle::ConstantTimeEq;

use crate::crypto::DM_HASH_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationCache {
    done: bool,
    hash: [u8; DM_HASH_SIZE],
    key_hash: [u8; DM_HASH_SIZE],
}

impl VerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.done
    }

    /// True when the cache holds a result for `hash` verified with the key
    /// hashing to `key_hash`.
    pub fn matches(&self, hash: &[u8; DM_HASH_SIZE], key_hash: &[u8; DM_HASH_SIZE]) -> bool {
        let same = self.hash.ct_eq(hash) & self.key_hash.ct_eq(key_hash);
        self.done && bool::from(same)
    }

    pub fn store(&mut self, hash: [u8; DM_HASH_SIZE], key_hash: [u8; DM_HASH_SIZE]) {
        self.hash = hash;
        self.key_hash = key_hash;
        self.done = true;
    }

    pub fn invalidate(&mut self) {
        self.hash = [0; DM_HASH_SIZE];
        self.key_hash = [0; DM_HASH_SIZE];
        self.done = false;
    }
}
