/// License signature verification
///
/// Dispatches on the algorithm id in the signature block, checks the
/// signature over the LICENSE span, then the node lock. RSA results are
/// remembered in the engine's single-slot cache, keyed by the Davies-Meyer
/// hashes of the whole V2C and of the public key.
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::cache::VerificationCache;
use super::device::DeviceIdSource;
use super::fingerprint::validate_node_lock;
use super::keys::{key_bytes, Algorithm, KeyArray};
use super::rsa::RsaVerifier;
use crate::config::EngineConfig;
use crate::crypto::{abreast_dm_hash, dm_hash, dm_hash_bytes, omac, Aes, DM_HASH_SIZE, OMAC_SIZE};
use crate::error::{FitError, FitResult};
use crate::memory::{ByteSource, Region};
use crate::parser::validate::RSA_SIGNATURE_LEN;
use crate::parser::{license_span, locate, v2c_span, FieldPos};

/// DM hashes of the V2C and of the RSA public key it verified with.
type CacheKey = ([u8; DM_HASH_SIZE], [u8; DM_HASH_SIZE]);

/// Borrowed collaborators for one verification.
pub struct SignatureVerifier<'e> {
    pub config: &'e EngineConfig,
    pub rsa: &'e dyn RsaVerifier,
    pub device: Option<&'e dyn DeviceIdSource>,
}

impl SignatureVerifier<'_> {
    /// Verify `v2c` with the matching key from `keys`.
    ///
    /// The cache is cleared on any failure and refreshed after a successful
    /// RSA check.
    pub fn verify(
        &self,
        v2c: Region<'_>,
        keys: &KeyArray<'_>,
        cache: &mut VerificationCache,
        use_cache: bool,
    ) -> FitResult<()> {
        match self.verify_inner(v2c, keys, cache, use_cache) {
            Ok(Some((hash, key_hash))) => {
                cache.store(hash, key_hash);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(error = %e, code = e.code(), "license verification failed");
                cache.invalidate();
                Err(e)
            }
        }
    }

    fn verify_inner(
        &self,
        v2c: Region<'_>,
        keys: &KeyArray<'_>,
        cache: &VerificationCache,
        use_cache: bool,
    ) -> FitResult<Option<CacheKey>> {
        let algorithm_id = match locate(v2c, FieldPos::ALGORITHM_ID)? {
            Some(field) => field.integer()?,
            None => {
                debug!("license has no signature algorithm");
                return Err(FitError::InvalidV2c);
            }
        };
        let algorithm_id = u16::try_from(algorithm_id).map_err(|_| FitError::UnknownAlgorithm)?;
        debug!(algorithm_id, "verifying license signature");

        let key = keys.resolve(algorithm_id)?;

        let verified_hash = match Algorithm::from_id(algorithm_id) {
            Some(Algorithm::RsaAbreastPkcs1) => self.verify_rsa(v2c, key, cache, use_cache)?,
            Some(Algorithm::AesOmac) => {
                self.verify_omac(v2c, key)?;
                None
            }
            _ => return Err(FitError::UnknownAlgorithm),
        };

        validate_node_lock(v2c, self.config.node_locking, self.device)?;
        Ok(verified_hash)
    }

    /// Returns the hashes to cache when the RSA check actually ran or was
    /// satisfied by the cache.
    fn verify_rsa(
        &self,
        v2c: Region<'_>,
        key: &dyn ByteSource,
        cache: &VerificationCache,
        use_cache: bool,
    ) -> FitResult<Option<CacheKey>> {
        if !self.config.rsa_signing {
            return Err(FitError::NoRsaSupport);
        }

        let whole = v2c_span(v2c, self.config.node_locking)?;
        let hash = dm_hash(whole)?;

        let public_key = key_bytes(key);
        if public_key.is_empty() {
            return Err(FitError::InvalidRsaPubkey);
        }
        let key_hash = dm_hash_bytes(&public_key)?;

        if use_cache && cache.matches(&hash, &key_hash) {
            debug!("license matches cached RSA verification");
            return Ok(Some((hash, key_hash)));
        }

        let signature = locate(v2c, FieldPos::SIGNATURE_DATA)?
            .and_then(|field| field.bytes())
            .ok_or(FitError::InvalidV2c)?;
        if signature.len() != RSA_SIGNATURE_LEN {
            return Err(FitError::InvalidFieldLen);
        }

        let digest = abreast_dm_hash(license_span(v2c)?)?;
        self.rsa.verify(&public_key, &digest, &signature.to_vec())?;
        debug!("RSA signature verified");
        Ok(Some((hash, key_hash)))
    }

    fn verify_omac(&self, v2c: Region<'_>, key: &dyn ByteSource) -> FitResult<()> {
        if !self.config.aes_signing {
            return Err(FitError::NoAesSupport);
        }

        let signature = locate(v2c, FieldPos::SIGNATURE_DATA)?
            .and_then(|field| field.bytes())
            .ok_or(FitError::InvalidV2c)?;
        if signature.len() < OMAC_SIZE {
            return Err(FitError::InvalidFieldLen);
        }

        let key = key_bytes(key);
        if key.len() != 16 {
            return Err(FitError::InvalidKeysize);
        }
        let cipher = Aes::new(&key)?;
        let mac = omac(&cipher, license_span(v2c)?)?;

        let mut expected = [0u8; OMAC_SIZE];
        signature.copy_to(0, &mut expected)?;
        if !bool::from(mac.ct_eq(&expected)) {
            return Err(FitError::InvalidSignature);
        }
        debug!("OMAC signature verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RamSource;
    use crate::testutil::{CountingRsa, TestLicense, AES_KEY};
    use crate::verification::keys::AlgorithmGuid;

    const AES_SIGN: [AlgorithmGuid; 1] = [AlgorithmGuid(0x1002)];
    const RSA_SIGN: [AlgorithmGuid; 1] = [AlgorithmGuid(0x1001)];

    fn verify_with(
        config: &EngineConfig,
        rsa: &CountingRsa,
        v2c: &[u8],
        keys: &KeyArray<'_>,
        cache: &mut VerificationCache,
        use_cache: bool,
    ) -> FitResult<()> {
        let src = RamSource::new(v2c);
        let verifier = SignatureVerifier {
            config,
            rsa,
            device: None,
        };
        verifier.verify(Region::new(&src), keys, cache, use_cache)
    }

    #[test]
    fn test_omac_license_verifies() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        let key = RamSource::new(&AES_KEY);
        let keys = KeyArray::new().with_key(&key, &AES_SIGN);
        let mut cache = VerificationCache::new();

        let rsa = CountingRsa::accepting();
        assert!(verify_with(&EngineConfig::default(), &rsa, &v2c, &keys, &mut cache, true).is_ok());
        // AES results are never cached
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_omac_tampered_license() {
        let mut v2c = TestLicense::default().sign_omac(&AES_KEY);
        // first byte of the uid
        let at = v2c.windows(4).position(|w| w == [0x11; 4]).unwrap();
        v2c[at] ^= 0x01;

        let key = RamSource::new(&AES_KEY);
        let keys = KeyArray::new().with_key(&key, &AES_SIGN);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();
        assert_eq!(
            verify_with(&EngineConfig::default(), &rsa, &v2c, &keys, &mut cache, true),
            Err(FitError::InvalidSignature)
        );
    }

    #[test]
    fn test_omac_key_size() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        let short = RamSource::new(&AES_KEY[..8]);
        let keys = KeyArray::new().with_key(&short, &AES_SIGN);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();
        assert_eq!(
            verify_with(&EngineConfig::default(), &rsa, &v2c, &keys, &mut cache, true),
            Err(FitError::InvalidKeysize)
        );
    }

    #[test]
    fn test_disabled_algorithms() {
        let config = EngineConfig {
            aes_signing: false,
            rsa_signing: false,
            ..EngineConfig::default()
        };
        let key = RamSource::new(&AES_KEY);
        let both = [AES_SIGN[0], RSA_SIGN[0]];
        let keys = KeyArray::new().with_key(&key, &both);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();

        let aes = TestLicense::default().sign_omac(&AES_KEY);
        assert_eq!(
            verify_with(&config, &rsa, &aes, &keys, &mut cache, true),
            Err(FitError::NoAesSupport)
        );

        let signed = TestLicense::default().with_signature(1, vec![0u8; 256]);
        assert_eq!(
            verify_with(&config, &rsa, &signed, &keys, &mut cache, true),
            Err(FitError::NoRsaSupport)
        );
    }

    #[test]
    fn test_unknown_algorithm() {
        let v2c = TestLicense::default().with_signature(7, vec![0u8; 16]);
        let key = RamSource::new(&AES_KEY);
        let algs = [AlgorithmGuid(0x1007)];
        let keys = KeyArray::new().with_key(&key, &algs);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();
        assert_eq!(
            verify_with(&EngineConfig::default(), &rsa, &v2c, &keys, &mut cache, true),
            Err(FitError::UnknownAlgorithm)
        );
    }

    #[test]
    fn test_rsa_cache_skips_second_check() {
        let v2c = TestLicense::default().with_signature(1, vec![0x42; 256]);
        let key = RamSource::new(b"public-key");
        let keys = KeyArray::new().with_key(&key, &RSA_SIGN);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();
        let config = EngineConfig::default();

        verify_with(&config, &rsa, &v2c, &keys, &mut cache, true).unwrap();
        verify_with(&config, &rsa, &v2c, &keys, &mut cache, true).unwrap();
        assert_eq!(rsa.calls(), 1);
        assert!(cache.is_valid());

        // Cache bypassed on request.
        verify_with(&config, &rsa, &v2c, &keys, &mut cache, false).unwrap();
        assert_eq!(rsa.calls(), 2);
    }

    #[test]
    fn test_rsa_cache_is_bound_to_key() {
        let v2c = TestLicense::default().with_signature(1, vec![0x42; 256]);
        let vendor = RamSource::new(b"vendor-key");
        let other = RamSource::new(b"other-key");
        let mut cache = VerificationCache::new();
        let config = EngineConfig::default();

        let keys = KeyArray::new().with_key(&vendor, &RSA_SIGN);
        verify_with(&config, &CountingRsa::accepting(), &v2c, &keys, &mut cache, true).unwrap();

        // Same license, different key: the cached result does not apply.
        let rsa = CountingRsa::rejecting();
        let keys = KeyArray::new().with_key(&other, &RSA_SIGN);
        assert_eq!(
            verify_with(&config, &rsa, &v2c, &keys, &mut cache, true),
            Err(FitError::InvalidSignature)
        );
        assert_eq!(rsa.calls(), 1);
        assert_eq!(rsa.last_key(), Some(b"other-key".to_vec()));
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_rsa_empty_key() {
        let v2c = TestLicense::default().with_signature(1, vec![0x42; 256]);
        let empty = RamSource::new(&[]);
        let keys = KeyArray::new().with_key(&empty, &RSA_SIGN);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();
        assert_eq!(
            verify_with(&EngineConfig::default(), &rsa, &v2c, &keys, &mut cache, true),
            Err(FitError::InvalidRsaPubkey)
        );
        assert_eq!(rsa.calls(), 0);
    }

    #[test]
    fn test_rsa_changed_signature_rechecks() {
        let mut v2c = TestLicense::default().with_signature(1, vec![0x42; 256]);
        let key = RamSource::new(b"public-key");
        let keys = KeyArray::new().with_key(&key, &RSA_SIGN);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();
        let config = EngineConfig::default();

        verify_with(&config, &rsa, &v2c, &keys, &mut cache, true).unwrap();
        let last = v2c.len() - 1;
        v2c[last] ^= 0xFF;
        verify_with(&config, &rsa, &v2c, &keys, &mut cache, true).unwrap();
        assert_eq!(rsa.calls(), 2);
    }

    #[test]
    fn test_rsa_failure_clears_cache() {
        let v2c = TestLicense::default().with_signature(1, vec![0x42; 256]);
        let key = RamSource::new(b"public-key");
        let keys = KeyArray::new().with_key(&key, &RSA_SIGN);
        let mut cache = VerificationCache::new();
        let config = EngineConfig::default();

        verify_with(&config, &CountingRsa::accepting(), &v2c, &keys, &mut cache, true).unwrap();
        assert!(cache.is_valid());

        let mut other = v2c.clone();
        let last = other.len() - 1;
        other[last] ^= 0xFF;
        assert_eq!(
            verify_with(&config, &CountingRsa::rejecting(), &other, &keys, &mut cache, true),
            Err(FitError::InvalidSignature)
        );
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_rsa_digest_is_abreast_hash_of_license() {
        let license = TestLicense::default();
        let v2c = license.with_signature(1, vec![0x42; 256]);
        let key = RamSource::new(b"public-key");
        let keys = KeyArray::new().with_key(&key, &RSA_SIGN);
        let mut cache = VerificationCache::new();
        let rsa = CountingRsa::accepting();

        verify_with(&EngineConfig::default(), &rsa, &v2c, &keys, &mut cache, false).unwrap();
        let expected = crate::crypto::abreast_dm_hash_bytes(&license.license_object()).unwrap();
        assert_eq!(rsa.last_digest(), Some(expected));
        assert_eq!(rsa.last_key(), Some(b"public-key".to_vec()));
    }
}
