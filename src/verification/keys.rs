/// Key array lookup by signing algorithm
///
/// Every key advertises the algorithms it serves as 16-bit GUIDs:
/// scope in the top 4 bits, algorithm id in the low 12 bits.
use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{FitError, FitResult};
use crate::memory::ByteSource;

/// Signing algorithms carried in the license signature field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Algorithm {
    /// RSA-2048 over an Abreast-DM digest, PKCS#1 v1.5 padding.
    RsaAbreastPkcs1 = 1,
    /// AES-128 OMAC.
    AesOmac = 2,
    /// AES-256, used for encryption keys only.
    Aes256 = 3,
}

impl Algorithm {
    pub const MAX_ID: u16 = 0x0FFF;

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(Algorithm::RsaAbreastPkcs1),
            2 => Some(Algorithm::AesOmac),
            3 => Some(Algorithm::Aes256),
            _ => None,
        }
    }

    pub fn id(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyScope {
    Sign = 1,
    Crypt = 2,
}

impl KeyScope {
    pub const MAX: u8 = 0x0F;
}

/// `scope << 12 | algorithm_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmGuid(pub u16);

impl AlgorithmGuid {
    pub fn new(scope: KeyScope, algorithm: Algorithm) -> Self {
        Self::from_parts(scope as u8, algorithm.id())
    }

    pub fn from_parts(scope: u8, algorithm_id: u16) -> Self {
        AlgorithmGuid((u16::from(scope & 0x0F) << 12) | (algorithm_id & Algorithm::MAX_ID))
    }

    pub fn scope(self) -> u8 {
        (self.0 >> 12) as u8
    }

    pub fn algorithm_id(self) -> u16 {
        self.0 & Algorithm::MAX_ID
    }
}

/// One key and the algorithms it may be used with.
#[derive(Clone, Copy)]
pub struct KeyData<'k> {
    pub material: &'k dyn ByteSource,
    pub algorithms: &'k [AlgorithmGuid],
}

impl fmt::Debug for KeyData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyData")
            .field("len", &self.material.len())
            .field("algorithms", &self.algorithms)
            .finish()
    }
}

/// Caller-owned keys, scanned in order.
#[derive(Debug, Clone, Default)]
pub struct KeyArray<'k> {
    keys: Vec<KeyData<'k>>,
}

impl<'k> KeyArray<'k> {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn with_key(mut self, material: &'k dyn ByteSource, algorithms: &'k [AlgorithmGuid]) -> Self {
        self.push(material, algorithms);
        self
    }

    pub fn push(&mut self, material: &'k dyn ByteSource, algorithms: &'k [AlgorithmGuid]) {
        self.keys.push(KeyData { material, algorithms });
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// First key supporting `algorithm_id`.
    ///
    /// Empty keys are skipped. A GUID with a scope outside 1..=15 met before
    /// a match fails the whole lookup.
    pub fn resolve(&self, algorithm_id: u16) -> FitResult<&'k dyn ByteSource> {
        for key in &self.keys {
            if key.material.is_empty() {
                continue;
            }
            for guid in key.algorithms {
                let scope = guid.scope();
                if scope == 0 || scope > KeyScope::MAX {
                    debug!(guid = guid.0, "key scope out of range");
                    return Err(FitError::InvalidKeyScope);
                }
                if guid.algorithm_id() == algorithm_id {
                    return Ok(key.material);
                }
            }
        }
        debug!(algorithm_id, "no key for algorithm");
        Err(FitError::KeyNotPresent)
    }
}

/// Copy key material out of its byte source into a buffer wiped on drop.
pub fn key_bytes(material: &dyn ByteSource) -> Zeroizing<Vec<u8>> {
    Zeroizing::new((0..material.len()).map(|i| material.read_byte(i)).collect())
}
