/// Recursive-descent walker over the V2C field tables
///
/// Objects are `u16 count`, `count` field headers, then a data section.
/// Arrays are a sequence of `{u32 size, object}` elements whose total is the
/// array field's own length prefix. Every window handed down is bounded by
/// the declared length of its parent.
use tracing::{debug, trace};

use super::context::ParseContext;
use super::field::{Field, FieldData};
use super::schema::{
    FieldHeader, FieldPos, WireType, FIELD_HEADER_SIZE, LENGTH_PREFIX_SIZE, MAX_INDEXES, MAX_LEVELS,
};
use crate::error::{FitError, FitResult};
use crate::memory::Region;

/// Walk a whole V2C blob with the given context.
pub fn parse<'a>(license: Region<'a>, ctx: &mut ParseContext<'a, '_>) -> FitResult<()> {
    parse_object(0, 0, license, ctx)
}

fn position(level: u8, index: u32) -> FitResult<FieldPos> {
    if index as usize >= MAX_INDEXES {
        debug!(level, index, "field index outside schema");
        return Err(FitError::InvalidWireType);
    }
    Ok(FieldPos::new(level, index as u8))
}

/// Walk one object whose field table starts at `object.start()`.
pub fn parse_object<'a>(
    level: u8,
    index: u8,
    object: Region<'a>,
    ctx: &mut ParseContext<'a, '_>,
) -> FitResult<()> {
    if level as usize >= MAX_LEVELS {
        return Err(FitError::InternalError);
    }

    let field_count = object.u16_at(0)? as usize;
    let mut data_offset = (field_count + 1) * FIELD_HEADER_SIZE;
    let mut cur_index = u32::from(index);
    trace!(level, index, field_count, start = object.start(), "parse object");

    for slot in 0..field_count {
        if ctx.is_stopped() {
            break;
        }

        let raw = object.u16_at(FIELD_HEADER_SIZE * (slot + 1))?;
        match FieldHeader::decode(raw) {
            FieldHeader::Payload => {
                let pos = position(level, cur_index)?;
                let payload_len = object.u32_at(data_offset)? as usize;
                let field = object.slice(data_offset, LENGTH_PREFIX_SIZE + payload_len)?;
                parse_data(pos, field, ctx)?;
                data_offset += LENGTH_PREFIX_SIZE + payload_len;
                cur_index += 1;
            }
            FieldHeader::Skip(count) => {
                cur_index += count;
            }
            FieldHeader::Inline(value) => {
                let pos = position(level, cur_index)?;
                ctx.deliver(Field {
                    pos,
                    wire_type: pos.wire_type(),
                    data: FieldData::Inline(value),
                })?;
                cur_index += 1;
            }
        }
    }

    ctx.finish_object(level, object, data_offset);
    Ok(())
}

/// Dispatch a payload field (`field` starts at its length prefix).
pub fn parse_data<'a>(
    pos: FieldPos,
    field: Region<'a>,
    ctx: &mut ParseContext<'a, '_>,
) -> FitResult<()> {
    let wire_type = pos.wire_type().ok_or_else(|| {
        debug!(level = pos.level, index = pos.index, "no wire type for payload field");
        FitError::InvalidWireType
    })?;

    match wire_type {
        WireType::Object => {
            ctx.deliver(Field {
                pos,
                wire_type: Some(wire_type),
                data: FieldData::Container(field),
            })?;
            if ctx.is_stopped() {
                return Ok(());
            }
            parse_object(pos.level + 1, 0, field.tail(LENGTH_PREFIX_SIZE)?, ctx)
        }
        WireType::Array => {
            ctx.deliver(Field {
                pos,
                wire_type: Some(wire_type),
                data: FieldData::Container(field),
            })?;
            if ctx.is_stopped() {
                return Ok(());
            }
            parse_array(pos.level + 1, 0, field, ctx)
        }
        WireType::String | WireType::Integer => ctx.deliver(Field {
            pos,
            wire_type: Some(wire_type),
            data: FieldData::Bytes(field.tail(LENGTH_PREFIX_SIZE)?),
        }),
    }
}

/// Walk the elements of an array field (`array` starts at its size prefix).
pub fn parse_array<'a>(
    level: u8,
    index: u8,
    array: Region<'a>,
    ctx: &mut ParseContext<'a, '_>,
) -> FitResult<()> {
    let elements = array.prefixed(0)?;
    let mut consumed = 0usize;
    trace!(level, size = elements.len(), "parse array");

    while consumed < elements.len() {
        if ctx.is_stopped() {
            break;
        }
        // An element that claims more than the declared array size is rejected
        // before any of its bytes are read.
        let element = elements.prefixed(consumed)?;
        parse_object(level, index, element, ctx)?;
        consumed += LENGTH_PREFIX_SIZE + element.len();
    }
    Ok(())
}
