//! The driver surface the registry needs: installing casters and encoders for
//! composite types, and adapting values to literals.

pub mod catalog;
pub mod memory;

pub use catalog::{CompositeTypeDef, TypeCatalog};
pub use memory::{DriverStats, MemoryDriver};

use std::fmt;
use std::sync::Arc;


use crate::adapter::LiteralAdapter;
use crate::composite::CompositeValue;
use crate::core::{DataType, Result, Value};

/// Builds a composite value from the positional fields of a decoded row.
pub type CompositeFactory = Arc<dyn Fn(Vec<Value>) -> Result<CompositeValue> + Send + Sync>;

/// Encoder hook installed for a composite type on the adapt path.
pub type CompositeEncoder = fn(&dyn LiteralAdapter, &CompositeValue) -> Result<String>;

/// Visibility of a caster registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationScope {
    /// Every cursor on the connection sees the caster.
    #[default]
    Global,
    /// Only the cursor used for discovery sees the caster.
    Cursor,
}

/// What the driver returns for a successful composite registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationHandle {
    pub type_name: String,
    pub oid: u32,
    pub attnames: Vec<String>,
    pub atttypes: Vec<DataType>,
    pub scope: RegistrationScope,
}

/// Database driver as seen by the composite registry.
pub trait CompositeDriver: LiteralAdapter + Send + Sync {
    /// Installs a caster for `type_name`.
    ///
    /// Fails with `SchemaMissing` when the type does not exist server-side.
    fn register_composite(
        &self,
        type_name: &str,
        scope: RegistrationScope,
        factory: CompositeFactory,
    ) -> Result<RegistrationHandle>;

    /// Installs the encoder used when a value of `type_name` is adapted.
    fn register_adapter(&self, type_name: &str, encoder: CompositeEncoder);

    /// Decodes a record of `type_name` in text form through its caster.
    fn decode(&self, type_name: &str, literal: &str) -> Result<Value>;
}

impl fmt::Debug for dyn CompositeDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompositeDriver")
    }
}
