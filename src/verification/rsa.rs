/// RSA PKCS#1 v1.5 signature check of the Abreast-DM license digest
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::Sha256;
use tracing::debug;

use crate::config::KeyFormat;
use crate::crypto::ABREAST_DM_HASH_SIZE;
use crate::error::{FitError, FitResult};

/// External RSA verification primitive.
pub trait RsaVerifier {
    /// Check `signature` over `digest` with a public key in PEM or DER form.
    fn verify(
        &self,
        public_key: &[u8],
        digest: &[u8; ABREAST_DM_HASH_SIZE],
        signature: &[u8],
    ) -> FitResult<()>;
}

/// `RsaVerifier` backed by the `rsa` crate.
///
/// The digest is checked with the SHA-256 DigestInfo prefix, as licenses are
/// signed over the 32-byte Abreast-DM hash in place of a SHA-256 digest.
#[derive(Debug, Clone, Copy)]
pub struct PkcsVerifier {
    format: KeyFormat,
}

impl PkcsVerifier {
    pub fn new(format: KeyFormat) -> Self {
        Self { format }
    }

    /// Parse SubjectPublicKeyInfo or PKCS#1 keys; PEM only when enabled.
    pub fn parse_key(&self, bytes: &[u8]) -> FitResult<RsaPublicKey> {
        let trimmed = match bytes.iter().rposition(|b| *b != 0) {
            Some(last) => &bytes[..=last],
            None => return Err(FitError::InvalidRsaPubkey),
        };

        if trimmed.starts_with(b"-----BEGIN") {
            if self.format != KeyFormat::Pem {
                debug!("PEM key supplied while DER keys are configured");
                return Err(FitError::InvalidRsaPubkey);
            }
            let pem = std::str::from_utf8(trimmed).map_err(|_| FitError::InvalidRsaPubkey)?;
            return RsaPublicKey::from_public_key_pem(pem)
                .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
                .map_err(|e| {
                    debug!(error = %e, "failed to parse PEM public key");
                    FitError::InvalidRsaPubkey
                });
        }

        RsaPublicKey::from_public_key_der(trimmed)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(trimmed))
            .map_err(|e| {
                debug!(error = %e, "failed to parse DER public key");
                FitError::InvalidRsaPubkey
            })
    }
}

impl RsaVerifier for PkcsVerifier {
    fn verify(
        &self,
        public_key: &[u8],
        digest: &[u8; ABREAST_DM_HASH_SIZE],
        signature: &[u8],
    ) -> FitResult<()> {
        let key = self.parse_key(public_key)?;
        key.verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
            .map_err(|e| {
                debug!(error = %e, "RSA signature rejected");
                FitError::InvalidSignature
            })
    }
}
