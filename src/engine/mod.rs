/// Engine module - Owns configuration, collaborators and the verification cache
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::consume::{Clock, FeatureConsumer, LicenseModel, SystemClock};
use crate::error::{FitError, FitResult};
use crate::info::{self, LicenseInfo};
use crate::memory::{ByteSource, Region};
use crate::parser::{parse, FieldVisitor, ParseContext};
use crate::verification::{
    device_fingerprint, DeviceIdSource, Fingerprint, KeyArray, PkcsVerifier, RsaVerifier,
    SignatureVerifier, VerificationCache,
};

/// Version of the license core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoreVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
}

pub fn version() -> CoreVersion {
    CoreVersion {
        major: 1,
        minor: 1,
        revision: 0,
    }
}

/// License engine. Calls that may touch the verification cache take
/// `&mut self`; share an engine across threads behind a mutex.
pub struct LicenseEngine {
    config: EngineConfig,
    cache: VerificationCache,
    rsa: Box<dyn RsaVerifier>,
    clock: Option<Box<dyn Clock>>,
    device: Option<Box<dyn DeviceIdSource>>,
}

impl LicenseEngine {
    /// Engine with the `rsa` crate verifier and the system clock.
    pub fn new(config: EngineConfig) -> Self {
        let rsa = PkcsVerifier::new(config.rsa_key_format);
        Self {
            config,
            cache: VerificationCache::new(),
            rsa: Box::new(rsa),
            clock: Some(Box::new(SystemClock)),
            device: None,
        }
    }

    pub fn with_rsa_verifier(mut self, rsa: impl RsaVerifier + 'static) -> Self {
        self.rsa = Box::new(rsa);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Board without a real-time clock.
    pub fn without_clock(mut self) -> Self {
        self.clock = None;
        self
    }

    pub fn with_device_id(mut self, device: impl DeviceIdSource + 'static) -> Self {
        self.device = Some(Box::new(device));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    /// Full signature and node-lock check, never answered from the cache.
    pub fn validate_license(&mut self, license: &dyn ByteSource, keys: &KeyArray<'_>) -> FitResult<()> {
        self.verify_license(license, keys, false)
    }

    pub fn verify_license(
        &mut self,
        license: &dyn ByteSource,
        keys: &KeyArray<'_>,
        use_cache: bool,
    ) -> FitResult<()> {
        let verifier = SignatureVerifier {
            config: &self.config,
            rsa: self.rsa.as_ref(),
            device: self.device.as_deref(),
        };
        verifier.verify(Region::new(license), keys, &mut self.cache, use_cache)
    }

    /// Verify the license, then decide whether `feature_id` may be used.
    pub fn consume_license(
        &mut self,
        license: &dyn ByteSource,
        feature_id: u32,
        keys: &KeyArray<'_>,
    ) -> FitResult<LicenseModel> {
        let consumer = FeatureConsumer {
            verifier: SignatureVerifier {
                config: &self.config,
                rsa: self.rsa.as_ref(),
                device: self.device.as_deref(),
            },
            clock: self.clock.as_deref(),
        };
        consumer.consume(Region::new(license), feature_id, keys, &mut self.cache)
    }

    /// Forward every field of an unverified license to `visitor`.
    pub fn get_info(&self, license: &dyn ByteSource, visitor: &mut dyn FieldVisitor) -> FitResult<()> {
        debug!(len = license.len(), "get_info");
        let mut ctx = ParseContext::get_info(visitor);
        parse(Region::new(license), &mut ctx)
    }

    pub fn license_info(&self, license: &dyn ByteSource) -> FitResult<LicenseInfo> {
        info::collect(Region::new(license))
    }

    /// Fingerprint of the configured device, as a license generator would embed it.
    pub fn device_fingerprint(&self) -> FitResult<Fingerprint> {
        let device = self
            .device
            .as_deref()
            .ok_or(FitError::InvalidParam(0))?;
        device_fingerprint(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consume::FixedClock;
    use crate::memory::RamSource;
    use crate::parser::{Field, Flow, Tag};
    use crate::testutil::{
        CountingRsa, TestLicense, TestPart, AES_KEY, RSA_LICENSE_SIG, RSA_SPKI_DER, RSA_SPKI_PEM,
    };
    use crate::verification::{AlgorithmGuid, StaticDeviceId};

    const AES_SIGN: [AlgorithmGuid; 1] = [AlgorithmGuid(0x1002)];
    const RSA_SIGN: [AlgorithmGuid; 1] = [AlgorithmGuid(0x1001)];
    const NOW: u32 = 1_700_000_000;

    fn engine() -> LicenseEngine {
        LicenseEngine::new(EngineConfig::default()).with_clock(FixedClock(NOW))
    }

    fn windowed(start: Option<u32>, end: u32) -> Vec<u8> {
        TestLicense {
            parts: vec![TestPart::window(1, &[5], start, end)],
            ..TestLicense::default()
        }
        .sign_omac(&AES_KEY)
    }

    fn consume(engine: &mut LicenseEngine, v2c: &[u8], feature: u32) -> FitResult<LicenseModel> {
        let src = RamSource::new(v2c);
        let key = RamSource::new(&AES_KEY);
        let keys = KeyArray::new().with_key(&key, &AES_SIGN);
        engine.consume_license(&src, feature, &keys)
    }

    #[test]
    fn test_version() {
        assert_eq!(
            version(),
            CoreVersion {
                major: 1,
                minor: 1,
                revision: 0
            }
        );
    }

    #[test]
    fn test_perpetual_feature() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        let model = consume(&mut engine().without_clock(), &v2c, 1).unwrap();
        assert!(model.is_perpetual);
    }

    #[test]
    fn test_missing_feature() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        assert_eq!(consume(&mut engine(), &v2c, 2), Err(FitError::FeatureNotFound));
    }

    #[test]
    fn test_time_window_decisions() {
        let mut engine = engine();
        assert!(consume(&mut engine, &windowed(Some(NOW - 10), NOW + 10), 5).is_ok());
        assert_eq!(
            consume(&mut engine, &windowed(Some(NOW + 1), NOW + 10), 5),
            Err(FitError::InactiveLicense)
        );
        assert_eq!(
            consume(&mut engine, &windowed(None, NOW - 1), 5),
            Err(FitError::FeatureExpired)
        );
        assert!(consume(&mut engine, &windowed(None, NOW), 5).is_ok());
    }

    #[test]
    fn test_expiring_license_without_clock() {
        let v2c = windowed(None, NOW + 10);
        assert_eq!(
            consume(&mut engine().without_clock(), &v2c, 5),
            Err(FitError::LicExpNotSupp)
        );

        let mut no_support = LicenseEngine::new(EngineConfig {
            clock: false,
            ..EngineConfig::default()
        });
        assert_eq!(consume(&mut no_support, &v2c, 5), Err(FitError::NoClockSupport));

        let mut unset_rtc = engine().with_clock(FixedClock(1_000));
        assert_eq!(consume(&mut unset_rtc, &v2c, 5), Err(FitError::RtcNotPresent));
    }

    #[test]
    fn test_part_without_license_type() {
        let v2c = TestLicense {
            parts: vec![TestPart {
                part_id: 1,
                features: vec![8],
                perpetual: false,
                start_date: Some(1000),
                end_date: None,
            }],
            ..TestLicense::default()
        }
        .sign_omac(&AES_KEY);
        assert_eq!(consume(&mut engine(), &v2c, 8), Err(FitError::InvalidLicenseType));
    }

    #[test]
    fn test_rsa_consume_uses_cache() {
        let v2c = TestLicense::default().with_signature(1, vec![0x42; 256]);
        let src = RamSource::new(&v2c);
        let key = RamSource::new(b"public-key");
        let keys = KeyArray::new().with_key(&key, &RSA_SIGN);

        let rsa = CountingRsa::accepting();
        let mut engine = engine().with_rsa_verifier(rsa.clone());

        engine.consume_license(&src, 1, &keys).unwrap();
        engine.consume_license(&src, 1, &keys).unwrap();
        assert_eq!(rsa.calls(), 1);
        assert!(engine.cache().is_valid());

        // validate never trusts the cache
        engine.validate_license(&src, &keys).unwrap();
        assert_eq!(rsa.calls(), 2);
    }

    #[test]
    fn test_rsa_signed_license_with_real_verifier() {
        let v2c = TestLicense::default().with_signature(1, RSA_LICENSE_SIG.to_vec());
        let src = RamSource::new(&v2c);
        let key = RamSource::new(RSA_SPKI_PEM);
        let keys = KeyArray::new().with_key(&key, &RSA_SIGN);

        let mut engine = engine();
        assert_eq!(engine.validate_license(&src, &keys), Ok(()));
        assert!(engine.cache().is_valid());
        assert!(engine.consume_license(&src, 1, &keys).unwrap().is_perpetual);

        let mut forged = RSA_LICENSE_SIG.to_vec();
        forged[0] ^= 0x01;
        let bad = TestLicense::default().with_signature(1, forged);
        let bad_src = RamSource::new(&bad);
        assert_eq!(
            engine.validate_license(&bad_src, &keys),
            Err(FitError::InvalidSignature)
        );
        assert!(!engine.cache().is_valid());
    }

    #[test]
    fn test_rsa_der_key_format() {
        let v2c = TestLicense::default().with_signature(1, RSA_LICENSE_SIG.to_vec());
        let src = RamSource::new(&v2c);
        let der = RamSource::new(RSA_SPKI_DER);
        let pem = RamSource::new(RSA_SPKI_PEM);

        let mut engine = LicenseEngine::new(EngineConfig {
            rsa_key_format: crate::config::KeyFormat::Der,
            ..EngineConfig::default()
        });
        let keys = KeyArray::new().with_key(&der, &RSA_SIGN);
        assert_eq!(engine.validate_license(&src, &keys), Ok(()));

        let keys = KeyArray::new().with_key(&pem, &RSA_SIGN);
        assert_eq!(
            engine.validate_license(&src, &keys),
            Err(FitError::InvalidRsaPubkey)
        );
    }

    #[test]
    fn test_node_locked_consume() {
        let device = b"serial-7781".to_vec();
        let fp = Fingerprint::from_device(&device).unwrap();
        let v2c = TestLicense {
            fingerprint: Some(fp.to_bytes().to_vec()),
            ..TestLicense::default()
        }
        .sign_omac(&AES_KEY);

        let mut good = engine().with_device_id(StaticDeviceId::new(device));
        assert!(consume(&mut good, &v2c, 1).is_ok());
        assert_eq!(good.device_fingerprint().unwrap(), fp);

        let mut other = engine().with_device_id(StaticDeviceId::new(b"serial-7782".to_vec()));
        assert_eq!(consume(&mut other, &v2c, 1), Err(FitError::FpMismatchError));

        let mut unlocked = LicenseEngine::new(EngineConfig {
            node_locking: false,
            ..EngineConfig::default()
        });
        assert_eq!(consume(&mut unlocked, &v2c, 1), Err(FitError::NodeLockingNotSupp));
    }

    #[test]
    fn test_key_errors() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        let src = RamSource::new(&v2c);
        let key = RamSource::new(&AES_KEY);

        let rsa_only = KeyArray::new().with_key(&key, &RSA_SIGN);
        assert_eq!(
            engine().validate_license(&src, &rsa_only),
            Err(FitError::KeyNotPresent)
        );

        let bad_scope = [AlgorithmGuid(0x0002)];
        let keys = KeyArray::new().with_key(&key, &bad_scope);
        assert_eq!(
            engine().validate_license(&src, &keys),
            Err(FitError::InvalidKeyScope)
        );
    }

    #[test]
    fn test_get_info_visitor_can_stop() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        let src = RamSource::new(&v2c);
        let mut tags = Vec::new();
        let mut visitor = |tag: Tag, _field: &Field<'_>| -> FitResult<Flow> {
            tags.push(tag);
            Ok(if tag == Tag::Uid { Flow::Stop } else { Flow::Continue })
        };

        engine().get_info(&src, &mut visitor).unwrap();
        assert_eq!(tags.last(), Some(&Tag::Uid));
        assert!(!tags.contains(&Tag::Feature));
    }

    #[test]
    fn test_license_info() {
        let v2c = TestLicense::default().sign_omac(&AES_KEY);
        let src = RamSource::new(&v2c);
        let info = engine().license_info(&src).unwrap();
        assert_eq!(info.algorithm_id, Some(2));
        assert_eq!(info.vendors[0].product.as_ref().unwrap().parts[0].features, vec![1]);
    }
}
