use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::{
    CompositeArgs, CompositeColumn, CompositeColumnType, CompositeDescriptor, CompositeField,
    CompositeValue,
};
use crate::core::{CompositeError, Result};
use crate::registry::CompositeRegistry;

lazy_static! {
    static ref MODULE_PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("valid module path pattern");
    static ref DECLARED_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid declared name pattern");
}

/// Proof that a declaration is made on behalf of a module.
///
/// Obtain one with [`declaration_scope!`](crate::declaration_scope), which
/// captures the calling module's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationScope {
    module: String,
}

impl DeclarationScope {
    pub fn module(path: &str) -> Result<Self> {
        if !MODULE_PATH_RE.is_match(path) {
            return Err(CompositeError::Configuration(format!(
                "Only allowed to declare composite types at module level (got scope '{}')",
                path
            )));
        }
        Ok(Self {
            module: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.module
    }
}

/// Declaration scope of the module this macro is expanded in.
#[macro_export]
macro_rules! declaration_scope {
    () => {
        $crate::DeclarationScope::module(module_path!())
    };
}

/// Outcome of declaring a composite: its descriptor and its column type.
#[derive(Debug, Clone)]
pub struct Declared {
    pub descriptor: Arc<CompositeDescriptor>,
    pub column_type: CompositeColumnType,
}

impl Declared {
    pub fn construct(&self, args: CompositeArgs) -> Result<CompositeValue> {
        self.column_type.registry().construct(&self.descriptor, args)
    }

    pub fn column(&self) -> Result<CompositeColumn> {
        self.column_type.column()
    }
}

/// A Rust struct declared as a composite type, usually through
/// `#[derive(Composite)]`.
pub trait CompositeType: Sized {
    const DB_TYPE: &'static str;

    fn descriptor() -> Result<CompositeDescriptor>;

    /// Field values in declaration order.
    fn into_args(self) -> CompositeArgs;

    fn from_composite(value: &CompositeValue) -> Result<Self>;
}

/// Declares a composite type named `name` for the database type `db_type`.
///
/// Registration is attempted right away; a type missing from the database
/// leaves the declaration pending rather than failing.
pub fn declare_composite(
    registry: &CompositeRegistry,
    scope: &DeclarationScope,
    name: &str,
    db_type: &str,
    fields: Vec<CompositeField>,
) -> Result<Declared> {
    if !DECLARED_NAME_RE.is_match(name) {
        return Err(CompositeError::Configuration(format!(
            "'{}' is not a valid composite type name",
            name
        )));
    }
    if db_type.is_empty() {
        return Err(CompositeError::Configuration("db_type must be set".into()));
    }

    let descriptor = CompositeDescriptor::builder(db_type)
        .name(name)
        .module(scope.path())
        .fields(fields)
        .build()?;

    registry.declare(descriptor)
}
