/// Device fingerprints and node-lock validation
///
/// A node-locked license carries a 24-byte fingerprint in its header:
/// magic, algorithm id, then the Davies-Meyer hash of the raw device id.
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::device::{DeviceIdSource, DEVICE_ID_MAX_LEN, DEVICE_ID_MIN_LEN};
use crate::crypto::{dm_hash_bytes, DM_HASH_SIZE};
use crate::error::{FitError, FitResult};
use crate::memory::Region;
use crate::parser::{locate, FieldPos};

/// "Ftmf" read as a little-endian word.
pub const FP_MAGIC: u32 = 0x666D_7446;
/// Davies-Meyer over AES-128.
pub const FP_ALGORITHM_AES_DM: u8 = 1;
pub const FINGERPRINT_LEN: usize = 4 + 4 + DM_HASH_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub magic: u32,
    pub algorithm_id: u8,
    pub hash: [u8; DM_HASH_SIZE],
}

impl Fingerprint {
    /// Fingerprint of a raw device id.
    pub fn from_device(raw: &[u8]) -> FitResult<Self> {
        if !(DEVICE_ID_MIN_LEN..=DEVICE_ID_MAX_LEN).contains(&raw.len()) {
            return Err(FitError::InvalidDeviceIdLen);
        }
        Ok(Self {
            magic: FP_MAGIC,
            algorithm_id: FP_ALGORITHM_AES_DM,
            hash: dm_hash_bytes(raw)?,
        })
    }

    /// Decode the fingerprint payload of a license.
    pub fn parse(field: Region<'_>) -> FitResult<Self> {
        if field.len() < FINGERPRINT_LEN {
            return Err(FitError::InvalidFieldLen);
        }

        let magic = field.u32_at(0)?;
        if magic != FP_MAGIC {
            return Err(FitError::FpMagicNotValid);
        }

        let algorithm_id = field.u32_at(4)?;
        if algorithm_id != u32::from(FP_ALGORITHM_AES_DM) {
            return Err(FitError::UnknownFpAlgorithm);
        }

        let mut hash = [0u8; DM_HASH_SIZE];
        field.copy_to(8, &mut hash)?;
        Ok(Self {
            magic,
            algorithm_id: FP_ALGORITHM_AES_DM,
            hash,
        })
    }

    /// Wire form as embedded by the license generator.
    pub fn to_bytes(&self) -> [u8; FINGERPRINT_LEN] {
        let mut out = [0u8; FINGERPRINT_LEN];
        out[..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&u32::from(self.algorithm_id).to_le_bytes());
        out[8..].copy_from_slice(&self.hash);
        out
    }

    pub fn matches(&self, other: &Fingerprint) -> bool {
        self.magic == other.magic
            && self.algorithm_id == other.algorithm_id
            && bool::from(self.hash.ct_eq(&other.hash))
    }
}

/// Fingerprint of the device behind `source`.
pub fn device_fingerprint(source: &dyn DeviceIdSource) -> FitResult<Fingerprint> {
    let mut raw = [0u8; DEVICE_ID_MAX_LEN];
    let len = source.raw_device_id(&mut raw)?;
    if len > DEVICE_ID_MAX_LEN {
        return Err(FitError::InvalidDeviceIdLen);
    }
    Fingerprint::from_device(&raw[..len])
}

/// Check the license fingerprint, if any, against the running device.
pub fn validate_node_lock(
    v2c: Region<'_>,
    node_locking: bool,
    device: Option<&dyn DeviceIdSource>,
) -> FitResult<()> {
    let field = match locate(v2c, FieldPos::FINGERPRINT)? {
        Some(field) => field,
        None => return Ok(()),
    };
    if !node_locking {
        return Err(FitError::NodeLockingNotSupp);
    }

    let payload = field.bytes().ok_or(FitError::InvalidV2c)?;
    let expected = Fingerprint::parse(payload)?;

    let device = device.ok_or_else(|| {
        debug!("license is node-locked but no device id source is configured");
        FitError::InvalidParam(0)
    })?;
    let actual = device_fingerprint(device)?;

    if !expected.matches(&actual) {
        warn!("device fingerprint does not match license");
        return Err(FitError::FpMismatchError);
    }
    debug!("node lock satisfied");
    Ok(())
}
