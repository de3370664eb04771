/// Memory module - Byte sources and bounds-checked views over license memory
pub mod source;
pub mod scalar;
pub mod region;

pub use source::{ByteSource, CallbackSource, RamSource};
pub use scalar::{read_u16, read_u32, read_u8};
pub use region::Region;
