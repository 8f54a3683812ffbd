use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{CompositeArgs, CompositeDescriptor, CompositeValue};
use crate::core::{Result, Value};
use crate::registry::CompositeRegistry;

const INTERNAL_MODULE: &str = module_path!();

/// Options of one column holding a composite type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOptions {
    pub null: bool,
    pub db_column: Option<String>,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn null(mut self, null: bool) -> Self {
        self.null = null;
        self
    }

    pub fn db_column(mut self, name: impl Into<String>) -> Self {
        self.db_column = Some(name.into());
        self
    }
}

/// Canonical description of a column, as schema tooling records it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDeconstruction {
    pub name: String,
    pub path: String,
    pub args: Vec<serde_json::Value>,
    pub kwargs: BTreeMap<String, serde_json::Value>,
}

/// The column type generated for one declared composite (`<Name>Field`).
#[derive(Debug, Clone)]
pub struct CompositeColumnType {
    registry: CompositeRegistry,
    descriptor: Arc<CompositeDescriptor>,
    label: String,
}

impl CompositeColumnType {
    pub(crate) fn new(registry: CompositeRegistry, descriptor: Arc<CompositeDescriptor>) -> Self {
        let base = descriptor
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| to_pascal_case(descriptor.type_name()));
        Self {
            registry,
            descriptor,
            label: format!("{}Field", base),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn descriptor(&self) -> &Arc<CompositeDescriptor> {
        &self.descriptor
    }

    pub(crate) fn registry(&self) -> &CompositeRegistry {
        &self.registry
    }

    /// Creates a column of this type.
    ///
    /// If the composite type is still pending, registration is attempted
    /// again and its failure is returned.
    pub fn instantiate(&self, options: ColumnOptions) -> Result<CompositeColumn> {
        self.registry.ensure_registered(&self.descriptor)?;
        Ok(CompositeColumn {
            column_type: self.clone(),
            options,
        })
    }

    pub fn column(&self) -> Result<CompositeColumn> {
        self.instantiate(ColumnOptions::default())
    }
}

/// A storable attribute whose values are composites of one type.
#[derive(Debug, Clone)]
pub struct CompositeColumn {
    column_type: CompositeColumnType,
    options: ColumnOptions,
}

impl CompositeColumn {
    pub fn db_type(&self) -> &str {
        self.column_type.descriptor.type_name()
    }

    pub fn options(&self) -> &ColumnOptions {
        &self.options
    }

    pub fn column_type(&self) -> &CompositeColumnType {
        &self.column_type
    }

    /// An all-default instance of the composite.
    pub fn get_default(&self) -> Result<Value> {
        self.construct(CompositeArgs::new()).map(Value::Composite)
    }

    /// Coerces a raw value into what the column stores.
    ///
    /// Values of the column's composite type and NULL pass through; anything
    /// else becomes the first positional field of a new instance.
    pub fn to_stored(&self, raw: Value) -> Result<Value> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Composite(value) if value.type_name() == self.db_type() => {
                Ok(Value::Composite(value))
            }
            other => self
                .construct(CompositeArgs::new().arg(other))
                .map(Value::Composite),
        }
    }

    /// Decodes a column value read from the database.
    pub fn from_db(&self, literal: Option<&str>) -> Result<Value> {
        match literal {
            None => Ok(Value::Null),
            Some(text) => self.column_type.registry.decode(self.db_type(), text),
        }
    }

    /// Literal for a value about to be written to the column.
    pub fn to_db(&self, value: Value) -> Result<String> {
        let stored = self.to_stored(value)?;
        self.column_type.registry.adapt(&stored)
    }

    /// Declaration of this column with its path pointing at the module the
    /// composite was declared in.
    pub fn deconstruct(&self, name: &str) -> ColumnDeconstruction {
        let internal_path = format!("{}::{}", INTERNAL_MODULE, self.column_type.label);
        let path = match self.column_type.descriptor.module() {
            Some(module) => internal_path.replacen(INTERNAL_MODULE, module, 1),
            None => internal_path,
        };

        let mut kwargs = BTreeMap::new();
        if self.options.null {
            kwargs.insert("null".to_string(), serde_json::Value::Bool(true));
        }
        if let Some(db_column) = &self.options.db_column {
            kwargs.insert(
                "db_column".to_string(),
                serde_json::Value::String(db_column.clone()),
            );
        }

        ColumnDeconstruction {
            name: name.to_string(),
            path,
            args: Vec::new(),
            kwargs,
        }
    }

    fn construct(&self, args: CompositeArgs) -> Result<CompositeValue> {
        CompositeValue::construct(
            &self.column_type.registry,
            &self.column_type.descriptor,
            args,
        )
    }
}

fn to_pascal_case(value: &str) -> String {
    let mut out = String::new();
    for chunk in value
        .rsplit('.')
        .next()
        .unwrap_or(value)
        .split('_')
        .filter(|part| !part.is_empty())
    {
        let mut chars = chunk.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() {
        value.to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case_labels() {
        assert_eq!(to_pascal_case("time_boolean"), "TimeBoolean");
        assert_eq!(to_pascal_case("public.money_range"), "MoneyRange");
        assert_eq!(to_pascal_case("point"), "Point");
    }

    #[test]
    fn test_internal_module_path() {
        assert_eq!(INTERNAL_MODULE, "pgcomposite::composite::column");
    }
}
