// ============================================================================
// pgcomposite Library
// ============================================================================

//! Composite (row) types for PostgreSQL-style drivers.
//!
//! A composite type is declared once, as a [`CompositeDescriptor`], through
//! [`declare_composite`] or `#[derive(Composite)]`. Declaring it registers the
//! type with the driver: a caster that decodes record text into
//! [`CompositeValue`]s and an encoder that renders values as
//! `(<f1>,<f2>,...)::<type>` literals. If the type does not exist in the
//! database yet, the declaration is kept pending and registration is tried
//! again the first time the type is used.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use pgcomposite::{
//!     CompositeArgs, CompositeField, CompositeRegistry, DataType, MemoryDriver, Value,
//!     declaration_scope, declare_composite,
//! };
//!
//! # fn main() -> pgcomposite::Result<()> {
//! let driver = Arc::new(MemoryDriver::new());
//! driver.execute("CREATE TYPE point AS (x BIGINT, y BIGINT)")?;
//! let registry = CompositeRegistry::new(driver);
//!
//! let point = declare_composite(
//!     &registry,
//!     &declaration_scope!()?,
//!     "Point",
//!     "point",
//!     vec![
//!         CompositeField::new("x", DataType::Integer).default_value(0),
//!         CompositeField::new("y", DataType::Integer).default_value(0),
//!     ],
//! )?;
//!
//! let value = point.construct(CompositeArgs::positional([3, 4]))?;
//! assert_eq!(registry.adapt(&Value::Composite(value))?, "(3,4)::point");
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod composite;
pub mod core;
pub mod driver;
pub mod registry;

// Re-export main types for convenience
pub use core::{CompositeError, DataType, Result, Value};

pub use adapter::{BuiltinAdapter, CompositeScalar, LiteralAdapter, adapt_composite, adapt_scalar};

pub use driver::{
    CompositeDriver, CompositeEncoder, CompositeFactory, DriverStats, MemoryDriver,
    RegistrationHandle, RegistrationScope,
};

pub use registry::{
    CompositeRegistry, DriftPolicy, RegistrationState, RegistryConfig, RegistryEntry,
};

pub use composite::{
    ColumnDeconstruction, ColumnOptions, CompositeArgs, CompositeColumn, CompositeColumnType,
    CompositeDescriptor, CompositeDescriptorBuilder, CompositeField, CompositeType,
    CompositeValue, DeclarationScope, Declared, DefaultProvider, declare_composite,
};

/// Derives [`CompositeType`] for a struct with named fields.
///
/// ```
/// use pgcomposite::Composite;
///
/// #[derive(Debug, Composite)]
/// #[composite(db_type = "time_boolean")]
/// struct TimeBoolean {
///     time: chrono::NaiveTime,
///     #[composite(default = true)]
///     boolean: bool,
/// }
/// ```
pub use pgcomposite_derive::Composite;
