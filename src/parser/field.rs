/// Fields delivered by the parser to the active operation
use super::schema::{FieldPos, WireType, LENGTH_PREFIX_SIZE};
use crate::error::{FitError, FitResult};
use crate::memory::Region;

#[derive(Debug, Clone, Copy)]
pub enum FieldData<'a> {
    /// Integer stored in the field header itself.
    Inline(u32),
    /// String or integer payload, without its length prefix.
    Bytes(Region<'a>),
    /// Object or array, starting at its u32 length prefix.
    Container(Region<'a>),
}

#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub pos: FieldPos,
    pub wire_type: Option<WireType>,
    pub data: FieldData<'a>,
}

impl<'a> Field<'a> {
    /// Length as seen by callbacks: 2 for inline integers, 4 for containers,
    /// the declared payload length otherwise.
    pub fn len(&self) -> usize {
        match self.data {
            FieldData::Inline(_) => 2,
            FieldData::Bytes(region) => region.len(),
            FieldData::Container(_) => LENGTH_PREFIX_SIZE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer value: inline headers decode as `h/2 - 1`, 4-byte payloads
    /// are the raw little-endian word.
    pub fn integer(&self) -> FitResult<u32> {
        match self.data {
            FieldData::Inline(value) => Ok(value),
            FieldData::Bytes(region) if region.len() == 4 => region.u32_at(0),
            FieldData::Bytes(_) => Err(FitError::InvalidFieldLen),
            FieldData::Container(_) => Err(FitError::InvalidWireType),
        }
    }

    /// Payload bytes of a string or integer field.
    pub fn bytes(&self) -> Option<Region<'a>> {
        match self.data {
            FieldData::Bytes(region) => Some(region),
            _ => None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.data, FieldData::Inline(_))
    }
}
