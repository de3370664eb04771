/// Info module - Owned, serialisable view of a license's contents
use std::fmt;

use chrono::DateTime;
use serde::Serialize;

use crate::error::FitResult;
use crate::memory::Region;
use crate::parser::{Field, FieldPos, FieldVisitor, Flow, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    Perpetual,
    Expiration,
    TimeBased,
    Invalid,
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LicenseType::Perpetual => "perpetual",
            LicenseType::Expiration => "expiration",
            LicenseType::TimeBased => "time-based",
            LicenseType::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterInfo {
    pub counter_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_field: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartInfo {
    pub part_id: u32,
    pub features: Vec<u32>,
    pub perpetual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_from_first_use: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counters: Vec<CounterInfo>,
    pub license_type: LicenseType,
}

impl PartInfo {
    fn new(part_id: u32) -> Self {
        Self {
            part_id,
            features: Vec::new(),
            perpetual: false,
            start_date: None,
            end_date: None,
            duration_from_first_use: None,
            counters: Vec::new(),
            license_type: LicenseType::Invalid,
        }
    }

    fn classify(&self) -> LicenseType {
        if self.perpetual {
            LicenseType::Perpetual
        } else if self.end_date.is_some() {
            LicenseType::Expiration
        } else if self.duration_from_first_use.is_some() {
            LicenseType::TimeBased
        } else {
            LicenseType::Invalid
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    pub product_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_regex: Option<String>,
    pub parts: Vec<PartInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorInfo {
    pub vendor_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LicenseInfo {
    pub licgen_version: Option<u32>,
    pub lm_version: Option<u32>,
    /// Hex-encoded
    pub uid: Option<String>,
    /// Hex-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub container_id: Option<u32>,
    pub vendors: Vec<VendorInfo>,
    pub algorithm_id: Option<u32>,
}

/// `get_info` visitor assembling a `LicenseInfo`.
#[derive(Debug, Default)]
pub struct InfoCollector {
    info: LicenseInfo,
}

impl InfoCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(mut self) -> LicenseInfo {
        for part in self.parts_mut() {
            part.license_type = part.classify();
        }
        self.info
    }

    fn parts_mut(&mut self) -> impl Iterator<Item = &mut PartInfo> {
        self.info
            .vendors
            .iter_mut()
            .filter_map(|v| v.product.as_mut())
            .flat_map(|p| p.parts.iter_mut())
    }

    fn product(&mut self) -> Option<&mut ProductInfo> {
        self.info.vendors.last_mut()?.product.as_mut()
    }

    fn part(&mut self) -> Option<&mut PartInfo> {
        self.product()?.parts.last_mut()
    }

    fn counter(&mut self) -> Option<&mut CounterInfo> {
        self.part()?.counters.last_mut()
    }
}

fn text(field: &Field<'_>) -> Option<String> {
    field
        .bytes()
        .map(|b| String::from_utf8_lossy(&b.to_vec()).into_owned())
}

fn hex_of(field: &Field<'_>) -> Option<String> {
    field.bytes().map(|b| hex::encode(b.to_vec()))
}

impl FieldVisitor for InfoCollector {
    fn visit(&mut self, tag: Tag, field: &Field<'_>) -> FitResult<Flow> {
        match tag {
            Tag::LicgenVersion => self.info.licgen_version = Some(field.integer()?),
            Tag::LmVersion => self.info.lm_version = Some(field.integer()?),
            Tag::Uid => self.info.uid = hex_of(field),
            Tag::Fingerprint => self.info.fingerprint = hex_of(field),
            Tag::ContainerId => self.info.container_id = Some(field.integer()?),
            Tag::Algorithm => {
                self.info.algorithm_id.get_or_insert(field.integer()?);
            }
            Tag::VendorId => self.info.vendors.push(VendorInfo {
                vendor_id: field.integer()?,
                vendor_name: None,
                product: None,
            }),
            Tag::Unknown if field.pos == FieldPos::VENDOR_NAME => {
                if let Some(vendor) = self.info.vendors.last_mut() {
                    vendor.vendor_name = text(field);
                }
            }
            Tag::ProductId => {
                let product_id = field.integer()?;
                if let Some(vendor) = self.info.vendors.last_mut() {
                    vendor.product = Some(ProductInfo {
                        product_id,
                        version_regex: None,
                        parts: Vec::new(),
                    });
                }
            }
            Tag::VersionRegex => {
                let regex = text(field);
                if let Some(product) = self.product() {
                    product.version_regex = regex;
                }
            }
            Tag::ProductPartId => {
                let part_id = field.integer()?;
                if let Some(product) = self.product() {
                    product.parts.push(PartInfo::new(part_id));
                }
            }
            Tag::Perpetual => {
                let value = field.integer()?;
                if let Some(part) = self.part() {
                    part.perpetual = value != 0;
                }
            }
            Tag::StartDate => {
                let value = field.integer()?;
                if let Some(part) = self.part() {
                    part.start_date = Some(value);
                }
            }
            Tag::EndDate => {
                let value = field.integer()?;
                if let Some(part) = self.part() {
                    part.end_date = Some(value);
                }
            }
            Tag::DurationFromFirstUse => {
                let value = field.integer()?;
                if let Some(part) = self.part() {
                    part.duration_from_first_use = Some(value);
                }
            }
            Tag::Feature => {
                let value = field.integer()?;
                if let Some(part) = self.part() {
                    part.features.push(value);
                }
            }
            Tag::Counter => {
                let counter_id = field.integer()?;
                if let Some(part) = self.part() {
                    part.counters.push(CounterInfo {
                        counter_id,
                        ..CounterInfo::default()
                    });
                }
            }
            Tag::Limit | Tag::SoftLimit | Tag::IsField => {
                let value = field.integer()?;
                if let Some(counter) = self.counter() {
                    match tag {
                        Tag::Limit => counter.limit = Some(value),
                        Tag::SoftLimit => counter.soft_limit = Some(value),
                        _ => counter.is_field = Some(value),
                    }
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }
}

/// Collect the contents of `v2c` in one walk.
pub fn collect(v2c: Region<'_>) -> FitResult<LicenseInfo> {
    let mut collector = InfoCollector::new();
    let mut ctx = crate::parser::ParseContext::get_info(&mut collector);
    crate::parser::parse(v2c, &mut ctx)?;
    drop(ctx);
    Ok(collector.finish())
}

/// Render a unix date as RFC 3339 (UTC).
pub fn format_date(secs: u32) -> String {
    DateTime::from_timestamp(i64::from(secs), 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

impl fmt::Display for LicenseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(version) = self.licgen_version {
            writeln!(f, "licgen version: {}", version)?;
        }
        if let Some(uid) = &self.uid {
            writeln!(f, "uid:            {}", uid)?;
        }
        if let Some(alg) = self.algorithm_id {
            writeln!(f, "algorithm:      {}", alg)?;
        }
        if self.fingerprint.is_some() {
            writeln!(f, "node-locked:    yes")?;
        }
        for vendor in &self.vendors {
            write!(f, "vendor {}", vendor.vendor_id)?;
            if let Some(name) = &vendor.vendor_name {
                write!(f, " ({})", name)?;
            }
            writeln!(f)?;
            let Some(product) = &vendor.product else {
                continue;
            };
            writeln!(f, "  product {}", product.product_id)?;
            for part in &product.parts {
                write!(f, "    part {} [{}] features {:?}", part.part_id, part.license_type, part.features)?;
                if let Some(start) = part.start_date {
                    write!(f, " from {}", format_date(start))?;
                }
                if let Some(end) = part.end_date {
                    write!(f, " until {}", format_date(end))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
