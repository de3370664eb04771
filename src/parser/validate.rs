/// Field range checks applied while measuring a license for hashing
use super::field::Field;
use super::schema::{FieldPos, WireType, MAX_FIELD_SIZE};
use crate::error::{FitError, FitResult};

/// Oldest license generator version this engine accepts.
pub const MIN_LICGEN_VERSION: u32 = 100;

/// Highest signing algorithm id representable in a key GUID.
pub const MAX_ALGORITHM_ID: u32 = 0x0FFF;

pub const MAX_VENDOR_ID: u32 = 0x00FF_FFFF;
pub const MAX_PRODUCT_ID: u32 = 0xFFBF;
pub const MAX_DATE: u32 = 0x7FFF_FFFF;

/// Accepted signature lengths: RSA-2048 and AES-128 OMAC.
pub const RSA_SIGNATURE_LEN: usize = 256;
pub const OMAC_SIGNATURE_LEN: usize = 16;

pub(crate) fn check_field(field: &Field<'_>, node_locking: bool) -> FitResult<()> {
    if !matches!(field.wire_type, Some(WireType::Integer | WireType::String)) {
        return Ok(());
    }

    if field.pos == FieldPos::SIGNATURE_DATA {
        return match field.len() {
            RSA_SIGNATURE_LEN | OMAC_SIGNATURE_LEN => Ok(()),
            _ => Err(FitError::InvalidFieldLen),
        };
    }

    if field.len() > MAX_FIELD_SIZE {
        return Err(FitError::InvalidFieldLen);
    }

    match field.pos {
        FieldPos::LICGEN_VERSION => {
            if field.integer()? < MIN_LICGEN_VERSION {
                return Err(FitError::InvalidLicgenVer);
            }
        }
        FieldPos::ALGORITHM_ID => {
            let id = field.integer()?;
            if id == 0 || id > MAX_ALGORITHM_ID {
                return Err(FitError::InvalidSigId);
            }
        }
        FieldPos::CONTAINER_ID => {
            field.integer().map_err(|_| FitError::InvalidContainerId)?;
        }
        FieldPos::VENDOR_ID => {
            if field.integer()? > MAX_VENDOR_ID {
                return Err(FitError::InvalidVendorId);
            }
        }
        FieldPos::PRODUCT_ID => {
            if field.integer()? > MAX_PRODUCT_ID {
                return Err(FitError::InvalidProductId);
            }
        }
        FieldPos::START_DATE => {
            let date = field.integer().map_err(|_| FitError::InvalidStartDate)?;
            if date == 0 || date > MAX_DATE {
                return Err(FitError::InvalidStartDate);
            }
        }
        FieldPos::END_DATE => {
            let date = field.integer().map_err(|_| FitError::InvalidEndDate)?;
            if date == 0 || date > MAX_DATE {
                return Err(FitError::InvalidEndDate);
            }
        }
        FieldPos::FINGERPRINT => {
            if !node_locking {
                return Err(FitError::NodeLockingNotSupp);
            }
        }
        _ => {}
    }
    Ok(())
}
