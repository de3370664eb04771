/// Status taxonomy for every license operation
///
/// Each variant carries a stable numeric code so front ends can surface the
/// exact status (bad license vs. bad key vs. missing clock).
use thiserror::Error;

/// Errors returned by the license engine.
///
/// The numbering follows the status table shared with license generators
/// and other runtimes. Some statuses are never raised by this engine
/// (`InsufficientMemory`, `InvalidFeatureId`, `AccessDenied`, `InvalidValue`,
/// `ReqNotSupported`, `LicCachingError`, `InvalidProduct`, `LicFieldPresent`,
/// `DataMismatchError`, `UnknownError`). They keep their codes so callers can
/// decode statuses from either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("insufficient memory")]
    InsufficientMemory,

    #[error("invalid feature id")]
    InvalidFeatureId,

    #[error("malformed V2C license")]
    InvalidV2c,

    #[error("access denied")]
    AccessDenied,

    #[error("invalid value")]
    InvalidValue,

    #[error("request not supported")]
    ReqNotSupported,

    #[error("unknown signing algorithm")]
    UnknownAlgorithm,

    #[error("no key for the license signing algorithm")]
    KeyNotPresent,

    #[error("feature not found in license")]
    FeatureNotFound,

    #[error("license generator version is not supported")]
    InvalidLicgenVer,

    #[error("invalid signature algorithm id")]
    InvalidSigId,

    #[error("feature has expired")]
    FeatureExpired,

    #[error("license cache error")]
    LicCachingError,

    #[error("invalid product")]
    InvalidProduct,

    /// Position 0 is a generic parameter error, 1..=5 name the argument.
    #[error("invalid parameter (position {0})")]
    InvalidParam(u8),

    #[error("invalid wire type in license schema")]
    InvalidWireType,

    #[error("internal error")]
    InternalError,

    #[error("invalid key size")]
    InvalidKeysize,

    #[error("invalid vendor id")]
    InvalidVendorId,

    #[error("invalid product id")]
    InvalidProductId,

    #[error("invalid container id")]
    InvalidContainerId,

    #[error("license field already present")]
    LicFieldPresent,

    #[error("invalid license type")]
    InvalidLicenseType,

    #[error("license expiration not supported without a clock")]
    LicExpNotSupp,

    #[error("invalid start date")]
    InvalidStartDate,

    #[error("invalid end date")]
    InvalidEndDate,

    #[error("license is not active yet")]
    InactiveLicense,

    #[error("real time clock not present")]
    RtcNotPresent,

    #[error("clock support disabled")]
    NoClockSupport,

    #[error("invalid field length")]
    InvalidFieldLen,

    #[error("data mismatch")]
    DataMismatchError,

    #[error("node locking not supported")]
    NodeLockingNotSupp,

    #[error("fingerprint magic is not valid")]
    FpMagicNotValid,

    #[error("unknown fingerprint algorithm")]
    UnknownFpAlgorithm,

    #[error("device fingerprint does not match license")]
    FpMismatchError,

    #[error("invalid device id length")]
    InvalidDeviceIdLen,

    #[error("invalid license signature")]
    InvalidSignature,

    #[error("unknown error")]
    UnknownError,

    #[error("RSA signing support disabled")]
    NoRsaSupport,

    #[error("AES signing support disabled")]
    NoAesSupport,

    #[error("invalid key scope")]
    InvalidKeyScope,

    #[error("invalid RSA public key")]
    InvalidRsaPubkey,
}

/// Result alias used across the crate.
pub type FitResult<T> = Result<T, FitError>;

impl FitError {
    /// Stable numeric status code.
    pub fn code(&self) -> u8 {
        match self {
            FitError::InsufficientMemory => 1,
            FitError::InvalidFeatureId => 2,
            FitError::InvalidV2c => 3,
            FitError::AccessDenied => 4,
            FitError::InvalidValue => 5,
            FitError::ReqNotSupported => 6,
            FitError::UnknownAlgorithm => 7,
            FitError::KeyNotPresent => 8,
            FitError::FeatureNotFound => 9,
            FitError::InvalidLicgenVer => 13,
            FitError::InvalidSigId => 14,
            FitError::FeatureExpired => 15,
            FitError::LicCachingError => 16,
            FitError::InvalidProduct => 17,
            FitError::InvalidParam(position) => match position {
                1..=5 => 18 + position,
                _ => 18,
            },
            FitError::InvalidWireType => 26,
            FitError::InternalError => 27,
            FitError::InvalidKeysize => 28,
            FitError::InvalidVendorId => 29,
            FitError::InvalidProductId => 30,
            FitError::InvalidContainerId => 31,
            FitError::LicFieldPresent => 32,
            FitError::InvalidLicenseType => 33,
            FitError::LicExpNotSupp => 34,
            FitError::InvalidStartDate => 35,
            FitError::InvalidEndDate => 36,
            FitError::InactiveLicense => 37,
            FitError::RtcNotPresent => 38,
            FitError::NoClockSupport => 39,
            FitError::InvalidFieldLen => 40,
            FitError::DataMismatchError => 41,
            FitError::NodeLockingNotSupp => 42,
            FitError::FpMagicNotValid => 43,
            FitError::UnknownFpAlgorithm => 44,
            FitError::FpMismatchError => 45,
            FitError::InvalidDeviceIdLen => 46,
            FitError::InvalidSignature => 47,
            FitError::UnknownError => 48,
            FitError::NoRsaSupport => 49,
            FitError::NoAesSupport => 50,
            FitError::InvalidKeyScope => 51,
            FitError::InvalidRsaPubkey => 52,
        }
    }

    /// True for errors caused by the license content itself rather than
    /// keys, configuration or hardware.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            FitError::InvalidV2c
                | FitError::InvalidWireType
                | FitError::InvalidFieldLen
                | FitError::InvalidLicgenVer
                | FitError::InvalidSigId
                | FitError::InvalidVendorId
                | FitError::InvalidProductId
                | FitError::InvalidContainerId
                | FitError::InvalidStartDate
                | FitError::InvalidEndDate
        )
    }
}
