pub mod error;
pub mod value;

pub use error::{CompositeError, Result};
pub use value::{DataType, Value};
