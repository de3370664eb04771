/// V2C license schema: wire types, tag ids and field coordinates
///
/// The schema is fixed contract data. A field is addressed by its nesting
/// level and its index inside that level; sibling objects on one level share
/// the index space, which is why signature fields start at index 2 and
/// license container fields at index 4.

/// Maximum nesting depth and fields per level.
pub const MAX_LEVELS: usize = 16;
pub const MAX_INDEXES: usize = 16;

/// Size of a field header in the field table.
pub const FIELD_HEADER_SIZE: usize = 2;

/// Size of the u32 length prefix in front of every payload.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Longest string/integer payload accepted outside the signature.
pub const MAX_FIELD_SIZE: usize = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Integer = 1,
    String = 2,
    Object = 3,
    Array = 4,
}

/// Tag ids forwarded to `get_info` visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Unknown = 0,
    License = 1,
    Signature = 2,
    Header = 3,
    LicenseContainer = 4,
    Algorithm = 5,
    SignatureData = 6,
    LicgenVersion = 7,
    LmVersion = 8,
    Uid = 9,
    Fingerprint = 10,
    ContainerId = 11,
    VendorArray = 12,
    VendorId = 13,
    Product = 14,
    ProductId = 15,
    VersionRegex = 16,
    ProductPartArray = 17,
    ProductPartId = 18,
    LicenseProperties = 19,
    FeatureArray = 20,
    Perpetual = 21,
    StartDate = 22,
    EndDate = 23,
    CounterArray = 24,
    DurationFromFirstUse = 25,
    Feature = 26,
    Counter = 27,
    Limit = 28,
    SoftLimit = 29,
    IsField = 30,
}

impl Tag {
    pub fn id(self) -> u8 {
        self as u8
    }
}

const I: Option<WireType> = Some(WireType::Integer);
const S: Option<WireType> = Some(WireType::String);
const O: Option<WireType> = Some(WireType::Object);
const A: Option<WireType> = Some(WireType::Array);
const N: Option<WireType> = None;

#[rustfmt::skip]
const WIRE_TYPES: [[Option<WireType>; MAX_INDEXES]; MAX_LEVELS] = [
    /* 0 v2c         */ [O, A, N, N, N, N, N, N, N, N, N, N, N, N, N, N],
    /* 1 license/sig */ [O, O, I, S, N, N, N, N, N, N, N, N, N, N, N, N],
    /* 2 header/cont */ [I, I, S, S, I, A, N, N, N, N, N, N, N, N, N, N],
    /* 3 vendor      */ [I, O, S, N, N, N, N, N, N, N, N, N, N, N, N, N],
    /* 4 product     */ [I, S, A, N, N, N, N, N, N, N, N, N, N, N, N, N],
    /* 5 part        */ [I, O, N, N, N, N, N, N, N, N, N, N, N, N, N, N],
    /* 6 properties  */ [A, I, I, I, A, I, N, N, N, N, N, N, N, N, N, N],
    /* 7 feat/count  */ [I, N, I, I, I, I, N, N, N, N, N, N, N, N, N, N],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
    [N; MAX_INDEXES],
];

const U: Tag = Tag::Unknown;

#[rustfmt::skip]
const TAGS: [[Tag; MAX_INDEXES]; MAX_LEVELS] = [
    [Tag::License, Tag::Signature, U, U, U, U, U, U, U, U, U, U, U, U, U, U],
    [Tag::Header, Tag::LicenseContainer, Tag::Algorithm, Tag::SignatureData, U, U, U, U, U, U, U, U, U, U, U, U],
    [Tag::LicgenVersion, Tag::LmVersion, Tag::Uid, Tag::Fingerprint, Tag::ContainerId, Tag::VendorArray, U, U, U, U, U, U, U, U, U, U],
    [Tag::VendorId, Tag::Product, U, U, U, U, U, U, U, U, U, U, U, U, U, U],
    [Tag::ProductId, Tag::VersionRegex, Tag::ProductPartArray, U, U, U, U, U, U, U, U, U, U, U, U, U],
    [Tag::ProductPartId, Tag::LicenseProperties, U, U, U, U, U, U, U, U, U, U, U, U, U, U],
    [Tag::FeatureArray, Tag::Perpetual, Tag::StartDate, Tag::EndDate, Tag::CounterArray, Tag::DurationFromFirstUse, U, U, U, U, U, U, U, U, U, U],
    [Tag::Feature, U, Tag::Counter, Tag::Limit, Tag::SoftLimit, Tag::IsField, U, U, U, U, U, U, U, U, U, U],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
    [U; MAX_INDEXES],
];

/// Coordinates of a field in the schema tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPos {
    pub level: u8,
    pub index: u8,
}

impl FieldPos {
    pub const LICENSE: FieldPos = FieldPos::new(0, 0);
    pub const SIGNATURE: FieldPos = FieldPos::new(0, 1);

    pub const HEADER: FieldPos = FieldPos::new(1, 0);
    pub const CONTAINER: FieldPos = FieldPos::new(1, 1);
    pub const ALGORITHM_ID: FieldPos = FieldPos::new(1, 2);
    pub const SIGNATURE_DATA: FieldPos = FieldPos::new(1, 3);

    pub const LICGEN_VERSION: FieldPos = FieldPos::new(2, 0);
    pub const LM_VERSION: FieldPos = FieldPos::new(2, 1);
    pub const UID: FieldPos = FieldPos::new(2, 2);
    pub const FINGERPRINT: FieldPos = FieldPos::new(2, 3);
    pub const CONTAINER_ID: FieldPos = FieldPos::new(2, 4);
    pub const VENDORS: FieldPos = FieldPos::new(2, 5);

    pub const VENDOR_ID: FieldPos = FieldPos::new(3, 0);
    pub const PRODUCT: FieldPos = FieldPos::new(3, 1);
    pub const VENDOR_NAME: FieldPos = FieldPos::new(3, 2);

    pub const PRODUCT_ID: FieldPos = FieldPos::new(4, 0);
    pub const VERSION_REGEX: FieldPos = FieldPos::new(4, 1);
    pub const PRODUCT_PARTS: FieldPos = FieldPos::new(4, 2);

    pub const PART_ID: FieldPos = FieldPos::new(5, 0);
    pub const PROPERTIES: FieldPos = FieldPos::new(5, 1);

    pub const FEATURES: FieldPos = FieldPos::new(6, 0);
    pub const PERPETUAL: FieldPos = FieldPos::new(6, 1);
    pub const START_DATE: FieldPos = FieldPos::new(6, 2);
    pub const END_DATE: FieldPos = FieldPos::new(6, 3);
    pub const COUNTERS: FieldPos = FieldPos::new(6, 4);
    pub const DURATION_FROM_FIRST_USE: FieldPos = FieldPos::new(6, 5);

    pub const FEATURE_ID: FieldPos = FieldPos::new(7, 0);
    pub const COUNTER_ID: FieldPos = FieldPos::new(7, 2);
    pub const LIMIT: FieldPos = FieldPos::new(7, 3);
    pub const SOFT_LIMIT: FieldPos = FieldPos::new(7, 4);
    pub const IS_FIELD: FieldPos = FieldPos::new(7, 5);

    pub const fn new(level: u8, index: u8) -> Self {
        Self { level, index }
    }

    /// Wire type from the schema, `None` for positions the schema does not define.
    pub fn wire_type(self) -> Option<WireType> {
        WIRE_TYPES
            .get(self.level as usize)
            .and_then(|row| row.get(self.index as usize))
            .copied()
            .flatten()
    }

    pub fn tag(self) -> Tag {
        TAGS.get(self.level as usize)
            .and_then(|row| row.get(self.index as usize))
            .copied()
            .unwrap_or(Tag::Unknown)
    }
}

/// Decoded 16-bit field header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldHeader {
    /// `0`: payload follows in the data section.
    Payload,
    /// Odd: the next `n` schema indexes are absent.
    Skip(u32),
    /// Even, nonzero: inline integer.
    Inline(u32),
}

impl FieldHeader {
    pub fn decode(raw: u16) -> Self {
        let raw = u32::from(raw);
        if raw == 0 {
            FieldHeader::Payload
        } else if raw & 1 == 1 {
            FieldHeader::Skip((raw + 1) / 2)
        } else {
            FieldHeader::Inline(raw / 2 - 1)
        }
    }

    /// Wire form of the header, `None` when the value does not fit 16 bits.
    pub fn encode(self) -> Option<u16> {
        match self {
            FieldHeader::Payload => Some(0),
            FieldHeader::Skip(0) => None,
            FieldHeader::Skip(n) => n
                .checked_mul(2)
                .and_then(|raw| u16::try_from(raw - 1).ok()),
            FieldHeader::Inline(v) => v
                .checked_add(1)
                .and_then(|v| v.checked_mul(2))
                .and_then(|raw| u16::try_from(raw).ok()),
        }
    }
}
