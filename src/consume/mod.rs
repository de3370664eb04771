/// Consume module - Feature lookup and perpetual/time-window decisions
pub mod clock;
pub mod model;

pub use clock::{Clock, FixedClock, SystemClock};
pub use model::LicenseModel;

use std::fmt;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{FitError, FitResult};
use crate::memory::Region;
use crate::parser::{parse, ParseContext};
use crate::verification::{KeyArray, SignatureVerifier, VerificationCache};

/// Progress of one consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeStage {
    Unverified,
    SignatureVerified,
    FeatureLocated,
    Decided,
}

impl fmt::Display for ConsumeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumeStage::Unverified => "unverified",
            ConsumeStage::SignatureVerified => "signature-verified",
            ConsumeStage::FeatureLocated => "feature-located",
            ConsumeStage::Decided => "decided",
        };
        f.write_str(name)
    }
}

/// License model of the product part that grants `feature_id`.
pub fn find_feature(v2c: Region<'_>, feature_id: u32) -> FitResult<LicenseModel> {
    let mut ctx = ParseContext::find_feature(feature_id);
    parse(v2c, &mut ctx)?;

    if !ctx.feature_found() {
        debug!(feature_id, "feature not in license");
        return Err(FitError::FeatureNotFound);
    }
    let properties = ctx.properties().ok_or(FitError::InvalidV2c)?;
    LicenseModel::from_properties(properties)
}

/// Current time for an expiring license, after clock sanity checks.
pub fn read_clock(config: &EngineConfig, clock: Option<&dyn Clock>) -> FitResult<u32> {
    if !config.clock {
        return Err(FitError::NoClockSupport);
    }
    let clock = clock.ok_or(FitError::LicExpNotSupp)?;
    let now = clock.unix_time();
    if now <= config.min_valid_time {
        debug!(now, min_valid_time = config.min_valid_time, "clock reading not plausible");
        return Err(FitError::RtcNotPresent);
    }
    Ok(now)
}

/// Verifies a license and grants or refuses one feature.
pub struct FeatureConsumer<'e> {
    pub verifier: SignatureVerifier<'e>,
    pub clock: Option<&'e dyn Clock>,
}

impl FeatureConsumer<'_> {
    pub fn consume(
        &self,
        v2c: Region<'_>,
        feature_id: u32,
        keys: &KeyArray<'_>,
        cache: &mut VerificationCache,
    ) -> FitResult<LicenseModel> {
        let mut stage = ConsumeStage::Unverified;
        debug!(feature_id, %stage, "consume");

        self.verifier.verify(v2c, keys, cache, true)?;
        stage = ConsumeStage::SignatureVerified;
        debug!(feature_id, %stage, "consume");

        let model = find_feature(v2c, feature_id)?;
        stage = ConsumeStage::FeatureLocated;
        debug!(feature_id, %stage, ?model, "consume");

        if model.needs_clock() {
            let now = read_clock(self.verifier.config, self.clock)?;
            model.evaluate(now)?;
        } else {
            // perpetual, or no usable license type; neither reads the clock
            model.evaluate(0)?;
        }
        stage = ConsumeStage::Decided;
        info!(feature_id, %stage, perpetual = model.is_perpetual, "feature granted");
        Ok(model)
    }
}
