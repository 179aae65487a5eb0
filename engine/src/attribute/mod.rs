//! Attribute construction pipeline: descriptor, builder, staging buffer.

mod builder;
mod descriptor;
mod staging;

pub use builder::{AttributeBuilder, ConstructionRoutine};
pub use descriptor::{
    AttributeDescriptor, Bounds, DefaultValue, DescriptorBuilder, DescriptorError,
    DescriptorResult, EnumDefault, EnumFields, parse_enum_fields,
};
pub use staging::{IncompleteCompound, StagingBuffer, StagingError, StagingResult};
