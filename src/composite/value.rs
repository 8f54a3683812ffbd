use std::collections::BTreeMap;
use std::sync::Arc;

use super::{CompositeDescriptor, CompositeField};
use crate::adapter::{BuiltinAdapter, adapt_composite};
use crate::core::{CompositeError, Result, Value};
use crate::registry::CompositeRegistry;

/// Constructor arguments: positional values in field order plus named values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl CompositeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            named: BTreeMap::new(),
        }
    }

    /// Appends a positional value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named value.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// A record conforming to one [`CompositeDescriptor`].
///
/// Field values are kept in declaration order.
#[derive(Debug, Clone)]
pub struct CompositeValue {
    descriptor: Arc<CompositeDescriptor>,
    values: Vec<Value>,
}

impl CompositeValue {
    /// Constructs a value, first re-attempting registration if the type is
    /// still pending.
    pub fn construct(
        registry: &CompositeRegistry,
        descriptor: &Arc<CompositeDescriptor>,
        args: CompositeArgs,
    ) -> Result<Self> {
        descriptor.require_type_name()?;
        registry.ensure_registered(descriptor)?;
        Self::assemble(descriptor, args)
    }

    /// Builds a value from the positional fields of a decoded row.
    pub fn from_row(descriptor: &Arc<CompositeDescriptor>, values: Vec<Value>) -> Result<Self> {
        descriptor.require_type_name()?;
        Self::assemble(descriptor, CompositeArgs::positional(values))
    }

    fn assemble(descriptor: &Arc<CompositeDescriptor>, args: CompositeArgs) -> Result<Self> {
        let CompositeArgs { positional, mut named } = args;
        let given = positional.len();
        let mut positional = positional.into_iter();
        let mut values = Vec::with_capacity(descriptor.field_count());
        let mut supplied_slots = Vec::with_capacity(descriptor.field_count());

        for field in descriptor.fields() {
            if let Some(value) = positional.next() {
                // A keyword for a slot already filled positionally is dropped.
                named.remove(field.attribute_name());
                values.push(value);
                supplied_slots.push(true);
                continue;
            }

            let supplied = if named.is_empty() {
                None
            } else {
                named.remove(field.attribute_name())
            };
            supplied_slots.push(supplied.is_some());
            let value = match supplied {
                Some(value) => value,
                None => default_for(descriptor, field)?,
            };
            values.push(value);
        }

        if given > descriptor.field_count() {
            return Err(CompositeError::TooManyArguments {
                type_name: descriptor.type_name().to_string(),
                expected: descriptor.field_count(),
                given,
            });
        }

        Self::apply_remaining(descriptor, &mut values, &supplied_slots, named)?;

        for (field, value) in descriptor.fields().iter().zip(values.iter()) {
            field.validate(descriptor.type_name(), value)?;
        }

        Ok(Self {
            descriptor: Arc::clone(descriptor),
            values,
        })
    }

    /// Base construction step for named values no field claimed by attribute
    /// name: a storage name sets its field unless the slot was already
    /// supplied, in which case the value is dropped; anything else is
    /// rejected.
    fn apply_remaining(
        descriptor: &CompositeDescriptor,
        values: &mut [Value],
        supplied_slots: &[bool],
        remaining: BTreeMap<String, Value>,
    ) -> Result<()> {
        for (name, value) in remaining {
            let index = descriptor
                .fields()
                .iter()
                .position(|field| field.storage_name() == name);
            match index {
                Some(index) if supplied_slots[index] => {}
                Some(index) => values[index] = value,
                None => {
                    return Err(CompositeError::UnexpectedArgument {
                        type_name: descriptor.type_name().to_string(),
                        argument: name,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.type_name()
    }

    pub fn descriptor(&self) -> &Arc<CompositeDescriptor> {
        &self.descriptor
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, attribute_name: &str) -> Option<&Value> {
        self.descriptor
            .field_index(attribute_name)
            .map(|index| &self.values[index])
    }

    /// Like [`get`](Self::get), but a missing field is an error.
    pub fn require(&self, attribute_name: &str) -> Result<&Value> {
        self.get(attribute_name)
            .ok_or_else(|| CompositeError::MissingField {
                type_name: self.type_name().to_string(),
                field: attribute_name.to_string(),
            })
    }

    pub fn set(&mut self, attribute_name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let index = self.descriptor.field_index(attribute_name).ok_or_else(|| {
            CompositeError::UnexpectedArgument {
                type_name: self.type_name().to_string(),
                argument: attribute_name.to_string(),
            }
        })?;
        self.descriptor.fields()[index].validate(self.descriptor.type_name(), &value)?;
        self.values[index] = value;
        Ok(())
    }

    pub fn field_values(&self) -> impl Iterator<Item = (&CompositeField, &Value)> {
        self.descriptor.fields().iter().zip(self.values.iter())
    }

    /// Wire literal of this value, `(<f1>,<f2>,...)::<type_name>`.
    ///
    /// See [`adapt_composite`] for the single-field form.
    pub fn to_literal(&self) -> Result<String> {
        adapt_composite(&BuiltinAdapter, self)
    }
}

fn default_for(descriptor: &CompositeDescriptor, field: &CompositeField) -> Result<Value> {
    field
        .get_default()
        .ok_or_else(|| CompositeError::MissingField {
            type_name: descriptor.type_name().to_string(),
            field: field.attribute_name().to_string(),
        })
}

impl PartialEq for CompositeValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.values == other.values
    }
}
