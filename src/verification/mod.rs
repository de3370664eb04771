/// Verification module - Key selection, signature checks and node locking
pub mod keys;
pub mod cache;
pub mod rsa;
pub mod device;
pub mod fingerprint;
pub mod signature;

pub use keys::{key_bytes, Algorithm, AlgorithmGuid, KeyArray, KeyData, KeyScope};
pub use cache::VerificationCache;
pub use rsa::{PkcsVerifier, RsaVerifier};
pub use device::{DeviceIdSource, HostDeviceId, StaticDeviceId, DEVICE_ID_MAX_LEN, DEVICE_ID_MIN_LEN};
pub use fingerprint::{device_fingerprint, validate_node_lock, Fingerprint, FINGERPRINT_LEN, FP_MAGIC};
pub use signature::SignatureVerifier;
