/// License model of one product part and the consumption decision
use tracing::trace;

use crate::error::{FitError, FitResult};
use crate::memory::Region;
use crate::parser::schema::{FieldHeader, FieldPos, FIELD_HEADER_SIZE, LENGTH_PREFIX_SIZE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LicenseModel {
    pub is_perpetual: bool,
    pub has_start_date: bool,
    pub start_date: u32,
    pub has_end_date: bool,
    pub end_date: u32,
}

impl LicenseModel {
    /// Read the license-properties object whose field table starts at
    /// `properties.start()`.
    pub fn from_properties(properties: Region<'_>) -> FitResult<Self> {
        let mut model = LicenseModel::default();
        let field_count = properties.u16_at(0)? as usize;
        let mut data_offset = (field_count + 1) * FIELD_HEADER_SIZE;
        let mut index = 0u32;

        for slot in 0..field_count {
            let raw = properties.u16_at(FIELD_HEADER_SIZE * (slot + 1))?;
            match FieldHeader::decode(raw) {
                FieldHeader::Skip(count) => {
                    index += count;
                    continue;
                }
                FieldHeader::Inline(value) => model.apply(index, value)?,
                FieldHeader::Payload => {
                    let payload = properties.prefixed(data_offset)?;
                    if is_date(index) {
                        if payload.len() != 4 {
                            return Err(date_error(index));
                        }
                        model.apply(index, payload.u32_at(0)?)?;
                    }
                    data_offset += LENGTH_PREFIX_SIZE + payload.len();
                }
            }
            index += 1;
        }

        trace!(?model, "license properties");
        Ok(model)
    }

    fn apply(&mut self, index: u32, value: u32) -> FitResult<()> {
        match index {
            i if i == u32::from(FieldPos::PERPETUAL.index) => self.is_perpetual = value != 0,
            i if i == u32::from(FieldPos::START_DATE.index) => {
                if value == 0 {
                    return Err(FitError::InvalidStartDate);
                }
                self.has_start_date = true;
                self.start_date = value;
            }
            i if i == u32::from(FieldPos::END_DATE.index) => {
                if value == 0 {
                    return Err(FitError::InvalidEndDate);
                }
                self.has_end_date = true;
                self.end_date = value;
            }
            _ => {}
        }
        Ok(())
    }

    /// True when the decision depends on the current time.
    pub fn needs_clock(&self) -> bool {
        !self.is_perpetual && self.has_end_date
    }

    /// Decide whether the feature may be used at unix time `now`.
    pub fn evaluate(&self, now: u32) -> FitResult<()> {
        if self.is_perpetual {
            return Ok(());
        }
        if !self.has_end_date {
            return Err(FitError::InvalidLicenseType);
        }
        if self.has_start_date && now < self.start_date {
            return Err(FitError::InactiveLicense);
        }
        if now > self.end_date {
            return Err(FitError::FeatureExpired);
        }
        Ok(())
    }
}

fn is_date(index: u32) -> bool {
    index == u32::from(FieldPos::START_DATE.index) || index == u32::from(FieldPos::END_DATE.index)
}

fn date_error(index: u32) -> FitError {
    if index == u32::from(FieldPos::START_DATE.index) {
        FitError::InvalidStartDate
    } else {
        FitError::InvalidEndDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RamSource;
    use crate::testutil::{array, object, Node};

    fn model_of(bytes: &[u8]) -> FitResult<LicenseModel> {
        let src = RamSource::new(bytes);
        LicenseModel::from_properties(Region::new(&src))
    }

    fn features() -> Node {
        Node::Raw(array(vec![object(vec![Node::Int(1)]), object(vec![Node::Int(2)])]))
    }

    #[test]
    fn test_perpetual_after_feature_array() {
        let model = model_of(&object(vec![features(), Node::Int(1)])).unwrap();
        assert!(model.is_perpetual);
        assert!(!model.has_end_date);
    }

    #[test]
    fn test_zero_perpetual_flag() {
        let model = model_of(&object(vec![features(), Node::Int(0)])).unwrap();
        assert!(!model.is_perpetual);
    }

    #[test]
    fn test_inline_and_payload_dates() {
        let props = object(vec![
            features(),
            Node::Skip(1),
            Node::Int(1000),
            Node::Word(1_700_000_000),
        ]);
        let model = model_of(&props).unwrap();
        assert_eq!(
            model,
            LicenseModel {
                is_perpetual: false,
                has_start_date: true,
                start_date: 1000,
                has_end_date: true,
                end_date: 1_700_000_000,
            }
        );
    }

    #[test]
    fn test_unrelated_payloads_are_skipped() {
        // counters at index 4 come after the end date
        let props = object(vec![
            features(),
            Node::Skip(2),
            Node::Word(1_800_000_000),
            Node::Raw(array(vec![object(vec![Node::Skip(2), Node::Int(5)])])),
            Node::Int(30),
        ]);
        let model = model_of(&props).unwrap();
        assert!(model.has_end_date);
        assert_eq!(model.end_date, 1_800_000_000);
        assert!(!model.has_start_date);
    }

    #[test]
    fn test_odd_date_payload() {
        let props = object(vec![features(), Node::Skip(2), Node::Str(vec![1, 2, 3])]);
        assert_eq!(model_of(&props), Err(FitError::InvalidEndDate));
    }

    #[test]
    fn test_decision_table() {
        let perpetual = LicenseModel {
            is_perpetual: true,
            ..LicenseModel::default()
        };
        assert_eq!(perpetual.evaluate(0), Ok(()));
        assert!(!perpetual.needs_clock());

        let window = LicenseModel {
            has_start_date: true,
            start_date: 1000,
            has_end_date: true,
            end_date: 2000,
            ..LicenseModel::default()
        };
        assert!(window.needs_clock());
        assert_eq!(window.evaluate(999), Err(FitError::InactiveLicense));
        assert_eq!(window.evaluate(1000), Ok(()));
        assert_eq!(window.evaluate(2000), Ok(()));
        assert_eq!(window.evaluate(2001), Err(FitError::FeatureExpired));

        let expiring = LicenseModel {
            has_end_date: true,
            end_date: 2000,
            ..LicenseModel::default()
        };
        assert_eq!(expiring.evaluate(1), Ok(()));

        let start_only = LicenseModel {
            has_start_date: true,
            start_date: 1000,
            ..LicenseModel::default()
        };
        assert_eq!(start_only.evaluate(5000), Err(FitError::InvalidLicenseType));
        assert_eq!(LicenseModel::default().evaluate(5000), Err(FitError::InvalidLicenseType));
    }
}
