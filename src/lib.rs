//! kc-v2c - V2C license validation engine
//!
//! Decodes schema-driven V2C license records, verifies their RSA or
//! AES-OMAC signature, checks node locks against a device fingerprint and
//! decides whether a feature may be used.
//!
//! License bytes are read through [`memory::ByteSource`], so records can
//! live in RAM, flash or behind a driver call. Board services (clock,
//! device id, RSA primitive) are traits plugged into [`LicenseEngine`].

pub mod config;
pub mod consume;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod info;
pub mod memory;
pub mod parser;
pub mod verification;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{EngineConfig, KeyFormat, ToolConfig};
pub use consume::{Clock, ConsumeStage, FixedClock, LicenseModel, SystemClock};
pub use engine::{version, CoreVersion, LicenseEngine};
pub use error::{FitError, FitResult};
pub use info::LicenseInfo;
pub use memory::{ByteSource, CallbackSource, RamSource, Region};
pub use verification::{
    Algorithm, AlgorithmGuid, DeviceIdSource, Fingerprint, HostDeviceId, KeyArray, KeyScope,
    PkcsVerifier, RsaVerifier, StaticDeviceId,
};
