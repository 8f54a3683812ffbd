//! Composite descriptors, values, the column bridge and the declaration surface.

mod column;
mod declare;
mod descriptor;
mod value;

pub use column::{ColumnDeconstruction, ColumnOptions, CompositeColumn, CompositeColumnType};
pub use declare::{CompositeType, DeclarationScope, Declared, declare_composite};
pub use descriptor::{
    CompositeDescriptor, CompositeDescriptorBuilder, CompositeField, DefaultProvider,
};
pub use value::{CompositeArgs, CompositeValue};
