/// Parse operations and per-walk traversal state
use tracing::trace;

use super::field::Field;
use super::schema::{FieldPos, Tag, WireType};
use super::validate;
use crate::error::FitResult;
use crate::memory::Region;

/// Continue/stop signal raised by operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Stop,
}

/// Receives every field of a license during `get_info`.
pub trait FieldVisitor {
    fn visit(&mut self, tag: Tag, field: &Field<'_>) -> FitResult<Flow>;
}

impl<F> FieldVisitor for F
where
    F: FnMut(Tag, &Field<'_>) -> FitResult<Flow>,
{
    fn visit(&mut self, tag: Tag, field: &Field<'_>) -> FitResult<Flow> {
        self(tag, field)
    }
}

/// What a walk is looking for.
pub enum Operation<'v> {
    /// Stop at the feature with this id and remember its license properties.
    FindFeature { feature_id: u32 },
    /// Stop at the first field with these coordinates.
    GetDataAddress(FieldPos),
    /// Forward every field to a visitor.
    GetInfo(&'v mut dyn FieldVisitor),
    /// Check field ranges and measure the full license length.
    Validate { node_locking: bool },
}

/// Traversal state for one top-level parse.
pub struct ParseContext<'a, 'v> {
    operation: Operation<'v>,
    flow: Flow,
    length: usize,
    located: Option<Field<'a>>,
    feature_found: bool,
    properties: Option<Region<'a>>,
}

impl<'a, 'v> ParseContext<'a, 'v> {
    pub fn new(operation: Operation<'v>) -> Self {
        Self {
            operation,
            flow: Flow::Continue,
            length: 0,
            located: None,
            feature_found: false,
            properties: None,
        }
    }

    pub fn find_feature(feature_id: u32) -> Self {
        Self::new(Operation::FindFeature { feature_id })
    }

    pub fn data_address(pos: FieldPos) -> Self {
        Self::new(Operation::GetDataAddress(pos))
    }

    pub fn get_info(visitor: &'v mut dyn FieldVisitor) -> Self {
        Self::new(Operation::GetInfo(visitor))
    }

    pub fn validate(node_locking: bool) -> Self {
        Self::new(Operation::Validate { node_locking })
    }

    pub fn is_stopped(&self) -> bool {
        self.flow == Flow::Stop
    }

    /// Bytes consumed by the most recently finished object; after a full
    /// walk this is the length of the top-level object.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Field recorded by `GetDataAddress`.
    pub fn located(&self) -> Option<Field<'a>> {
        self.located
    }

    pub fn feature_found(&self) -> bool {
        self.feature_found
    }

    /// License properties object enclosing the feature matched by
    /// `FindFeature`, bounded by its declared payload length.
    pub fn properties(&self) -> Option<Region<'a>> {
        self.properties
    }

    pub(crate) fn deliver(&mut self, field: Field<'a>) -> FitResult<()> {
        trace!(level = field.pos.level, index = field.pos.index, len = field.len(), "field");

        match &mut self.operation {
            Operation::FindFeature { feature_id } => {
                // A feature id of odd width is not a match.
                if field.pos == FieldPos::FEATURE_ID
                    && field.wire_type == Some(WireType::Integer)
                    && field.integer().ok() == Some(*feature_id)
                {
                    self.feature_found = true;
                    self.flow = Flow::Stop;
                }
            }
            Operation::GetDataAddress(target) => {
                if field.pos == *target {
                    self.located = Some(field);
                    self.flow = Flow::Stop;
                }
            }
            Operation::GetInfo(visitor) => {
                if visitor.visit(field.pos.tag(), &field)? == Flow::Stop {
                    self.flow = Flow::Stop;
                }
            }
            Operation::Validate { node_locking } => {
                validate::check_field(&field, *node_locking)?;
            }
        }
        Ok(())
    }

    pub(crate) fn finish_object(&mut self, level: u8, object: Region<'a>, length: usize) {
        self.length = length;

        if matches!(self.operation, Operation::FindFeature { .. })
            && self.feature_found
            && level == FieldPos::FEATURES.level
            && self.properties.is_none()
        {
            self.properties = Some(object);
        }
    }
}
