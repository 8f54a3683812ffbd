use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{CompositeError, DataType, Result};

/// A composite type as defined on the database side.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeTypeDef {
    pub name: String,
    pub oid: u32,
    pub attributes: Vec<(String, DataType)>,
}

impl CompositeTypeDef {
    pub fn attnames(&self) -> Vec<String> {
        self.attributes.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn atttypes(&self) -> Vec<DataType> {
        self.attributes.iter().map(|(_, ty)| ty.clone()).collect()
    }
}

/// Server-side type catalog.
///
/// Immutable once built; every change produces a new catalog, so readers can
/// hold a clone without locking.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: Arc<HashMap<String, CompositeTypeDef>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self {
            types: Arc::new(HashMap::new()),
        }
    }

    /// Adds a type, returning the new catalog.
    pub fn with_type(self, def: CompositeTypeDef) -> Result<Self> {
        if self.types.contains_key(&def.name) {
            return Err(CompositeError::TypeExists(def.name));
        }

        for (attr, ty) in &def.attributes {
            if let DataType::Composite(nested) = ty {
                if !self.types.contains_key(nested) {
                    return Err(CompositeError::Driver(format!(
                        "type \"{}\" of attribute \"{}\" does not exist",
                        nested, attr
                    )));
                }
            }
        }

        let mut new_types = (*self.types).clone();
        new_types.insert(def.name.clone(), def);

        Ok(Self {
            types: Arc::new(new_types),
        })
    }

    /// Removes a type, returning the new catalog.
    pub fn without_type(self, name: &str) -> Result<Self> {
        if !self.types.contains_key(name) {
            return Err(CompositeError::SchemaMissing(name.to_string()));
        }

        let dependent = self.types.values().find(|def| {
            def.attributes
                .iter()
                .any(|(_, ty)| matches!(ty, DataType::Composite(nested) if nested == name))
        });
        if let Some(dependent) = dependent {
            return Err(CompositeError::Driver(format!(
                "cannot drop type {} because type {} depends on it",
                name, dependent.name
            )));
        }

        let mut new_types = (*self.types).clone();
        new_types.remove(name);

        Ok(Self {
            types: Arc::new(new_types),
        })
    }

    pub fn get_type(&self, name: &str) -> Result<&CompositeTypeDef> {
        self.types
            .get(name)
            .ok_or_else(|| CompositeError::SchemaMissing(name.to_string()))
    }

    pub fn type_exists(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn list_types(&self) -> Vec<&str> {
        self.types.keys().map(|s| s.as_str()).collect()
    }
}
