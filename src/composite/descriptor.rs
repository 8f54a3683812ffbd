use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::{CompositeError, DataType, Result, Value};

lazy_static! {
    static ref SQL_TYPE_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)?$")
            .expect("valid type name pattern");
}

/// Produces the value of a field nobody supplied.
pub type DefaultProvider = Arc<dyn Fn() -> Value + Send + Sync>;

/// Checks a database type name. An empty name is not checked here.
fn validate_type_name(type_name: &str) -> Result<()> {
    if !type_name.is_empty() && !SQL_TYPE_NAME_RE.is_match(type_name) {
        return Err(CompositeError::Configuration(format!(
            "'{}' is not a valid database type name",
            type_name
        )));
    }
    Ok(())
}

/// One attribute of a composite type.
#[derive(Clone)]
pub struct CompositeField {
    attribute_name: String,
    storage_name: String,
    data_type: DataType,
    nullable: bool,
    default: Option<DefaultProvider>,
}

impl CompositeField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let attribute_name = name.into();
        Self {
            storage_name: attribute_name.clone(),
            attribute_name,
            data_type,
            nullable: false,
            default: None,
        }
    }

    /// Sets the database-side attribute name when it differs from the Rust one.
    pub fn column(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = storage_name.into();
        self
    }

    /// Accepts NULL; defaults to NULL unless a default is set.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        if self.default.is_none() {
            self.default = Some(Arc::new(|| Value::Null));
        }
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default = Some(Arc::new(move || value.clone()));
        self
    }

    /// Default computed on demand, only when the field is left unset.
    pub fn default_with<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(provider));
        self
    }

    pub fn default_opt(self, value: Option<Value>) -> Self {
        match value {
            Some(value) => self.default_value(value),
            None => self,
        }
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn get_default(&self) -> Option<Value> {
        self.default.as_ref().map(|provider| provider())
    }

    pub fn validate(&self, type_name: &str, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(CompositeError::TypeMismatch(format!(
                    "field '{}' of composite type '{}' cannot be NULL",
                    self.attribute_name, type_name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(CompositeError::TypeMismatch(format!(
                "field '{}' of composite type '{}' expects {}, got {}",
                self.attribute_name,
                type_name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for CompositeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeField")
            .field("attribute_name", &self.attribute_name)
            .field("storage_name", &self.storage_name)
            .field("data_type", &self.data_type)
            .field("nullable", &self.nullable)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Metadata of a declared composite type: its database name and ordered fields.
///
/// Immutable once built. Shared as `Arc<CompositeDescriptor>` between the
/// registry, the decode factory and every value of the type.
#[derive(Debug, Clone)]
pub struct CompositeDescriptor {
    type_name: String,
    name: Option<String>,
    module: Option<String>,
    fields: Vec<CompositeField>,
}

impl CompositeDescriptor {
    pub fn builder(type_name: impl Into<String>) -> CompositeDescriptorBuilder {
        CompositeDescriptorBuilder {
            type_name: type_name.into(),
            name: None,
            module: None,
            fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared (Rust-side) name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Module the type was declared in, if known.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn fields(&self) -> &[CompositeField] {
        &self.fields
    }

    pub fn field(&self, attribute_name: &str) -> Option<&CompositeField> {
        self.fields
            .iter()
            .find(|field| field.attribute_name == attribute_name)
    }

    pub fn field_index(&self, attribute_name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.attribute_name == attribute_name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// A descriptor without a database type name cannot have instances.
    pub fn is_abstract(&self) -> bool {
        self.type_name.is_empty()
    }

    /// Ordered storage names and types; two descriptors with equal
    /// signatures marshal identically.
    pub fn signature(&self) -> Vec<(String, DataType)> {
        self.fields
            .iter()
            .map(|field| (field.storage_name.clone(), field.data_type.clone()))
            .collect()
    }

    pub fn signature_string(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("{} {}", field.storage_name, field.data_type))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn require_type_name(&self) -> Result<()> {
        if self.type_name.is_empty() {
            return Err(CompositeError::Configuration("db_type must be set".into()));
        }
        Ok(())
    }
}

pub struct CompositeDescriptorBuilder {
    type_name: String,
    name: Option<String>,
    module: Option<String>,
    fields: Vec<CompositeField>,
}

impl CompositeDescriptorBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn field(mut self, field: CompositeField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = CompositeField>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn build(self) -> Result<CompositeDescriptor> {
        validate_type_name(&self.type_name)?;

        let mut attribute_names = HashSet::new();
        let mut storage_names = HashSet::new();
        for field in &self.fields {
            if field.attribute_name.is_empty() || field.storage_name.is_empty() {
                return Err(CompositeError::Configuration(format!(
                    "composite type '{}' has a field without a name",
                    self.type_name
                )));
            }
            if !attribute_names.insert(field.attribute_name.as_str()) {
                return Err(CompositeError::Configuration(format!(
                    "composite type '{}' declares field '{}' twice",
                    self.type_name, field.attribute_name
                )));
            }
            if !storage_names.insert(field.storage_name.as_str()) {
                return Err(CompositeError::Configuration(format!(
                    "composite type '{}' maps two fields to attribute '{}'",
                    self.type_name, field.storage_name
                )));
            }
        }

        Ok(CompositeDescriptor {
            type_name: self.type_name,
            name: self.name,
            module: self.module,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builder_keeps_field_order() {
        let descriptor = CompositeDescriptor::builder("time_boolean")
            .field(CompositeField::new("time", DataType::Time))
            .field(CompositeField::new("boolean", DataType::Boolean).default_value(false))
            .build()
            .unwrap();

        let names: Vec<_> = descriptor.fields().iter().map(|f| f.attribute_name()).collect();
        assert_eq!(names, vec!["time", "boolean"]);
        assert_eq!(descriptor.field_index("boolean"), Some(1));
        assert_eq!(descriptor.signature_string(), "time TIME, boolean BOOLEAN");
    }

    #[test]
    fn test_invalid_type_name() {
        let err = CompositeDescriptor::builder("bad name;").build().unwrap_err();
        assert!(matches!(err, CompositeError::Configuration(_)));
        assert!(CompositeDescriptor::builder("public.point").build().is_ok());
    }

    #[test]
    fn test_empty_type_name_is_abstract() {
        let descriptor = CompositeDescriptor::builder("").build().unwrap();
        assert!(descriptor.is_abstract());
        assert!(matches!(
            descriptor.require_type_name(),
            Err(CompositeError::Configuration(msg)) if msg == "db_type must be set"
        ));
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let result = CompositeDescriptor::builder("pair")
            .field(CompositeField::new("a", DataType::Integer))
            .field(CompositeField::new("a", DataType::Text))
            .build();
        assert!(matches!(result, Err(CompositeError::Configuration(_))));

        let result = CompositeDescriptor::builder("pair")
            .field(CompositeField::new("a", DataType::Integer))
            .field(CompositeField::new("b", DataType::Text).column("a"))
            .build();
        assert!(matches!(result, Err(CompositeError::Configuration(_))));
    }

    #[test]
    fn test_default_provider_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let field = CompositeField::new("n", DataType::Integer).default_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Integer(7)
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(field.get_default(), Some(Value::Integer(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_field_validation() {
        let field = CompositeField::new("x", DataType::Integer);
        assert!(field.validate("point", &Value::Integer(1)).is_ok());
        assert!(field.validate("point", &Value::Null).is_err());
        assert!(field.validate("point", &Value::Text("1".into())).is_err());
        assert!(field.nullable().validate("point", &Value::Null).is_ok());
    }
}
