/// Parser module - Schema-driven walker over V2C license blobs
pub mod schema;
pub mod field;
pub mod context;
pub mod validate;
pub mod walker;

pub use context::{FieldVisitor, Flow, Operation, ParseContext};
pub use field::{Field, FieldData};
pub use schema::{FieldHeader, FieldPos, Tag, WireType};
pub use walker::{parse, parse_array, parse_data, parse_object};

use crate::error::{FitError, FitResult};
use crate::memory::Region;
use schema::FIELD_HEADER_SIZE;

/// Payload of the LICENSE field: the span covered by signatures.
///
/// The LICENSE object is always the first payload of the top-level object.
pub fn license_span<'a>(v2c: Region<'a>) -> FitResult<Region<'a>> {
    let field_count = v2c.u16_at(0)? as usize;
    if field_count == 0 || v2c.u16_at(FIELD_HEADER_SIZE)? != 0 {
        return Err(FitError::InvalidV2c);
    }
    v2c.prefixed((field_count + 1) * FIELD_HEADER_SIZE)
}

/// The whole V2C as measured by a validating walk.
pub fn v2c_span<'a>(v2c: Region<'a>, node_locking: bool) -> FitResult<Region<'a>> {
    let mut ctx = ParseContext::validate(node_locking);
    parse(v2c, &mut ctx)?;
    v2c.slice(0, ctx.length())
}

/// First field at `pos`, if the license carries one.
pub fn locate<'a>(v2c: Region<'a>, pos: FieldPos) -> FitResult<Option<Field<'a>>> {
    let mut ctx = ParseContext::data_address(pos);
    parse(v2c, &mut ctx)?;
    Ok(ctx.located())
}
