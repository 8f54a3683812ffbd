//! Registry of composite types known to one driver connection.
//!
//! Each database type name is in exactly one state: unregistered (no entry),
//! pending (declared, but the type was missing in the database when last
//! tried) or registered (caster and encoder installed). Registered is
//! terminal; nothing removes it.

pub mod config;
mod protocol;

pub use config::{DriftPolicy, RegistryConfig};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::warn;

use crate::composite::{
    CompositeArgs, CompositeDescriptor, CompositeType, CompositeValue, Declared,
};
use crate::core::{CompositeError, Result, Value};
use crate::driver::{CompositeDriver, RegistrationHandle};

/// Registry entry for one database type name.
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Pending {
        descriptor: Arc<CompositeDescriptor>,
        error: CompositeError,
    },
    Registered {
        descriptor: Arc<CompositeDescriptor>,
        handle: RegistrationHandle,
    },
}

impl RegistryEntry {
    pub fn descriptor(&self) -> &Arc<CompositeDescriptor> {
        match self {
            Self::Pending { descriptor, .. } | Self::Registered { descriptor, .. } => descriptor,
        }
    }

    pub fn state(&self) -> RegistrationState {
        match self {
            Self::Pending { .. } => RegistrationState::Pending,
            Self::Registered { .. } => RegistrationState::Registered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Pending,
    Registered,
}

struct RegistryInner {
    driver: Arc<dyn CompositeDriver>,
    config: RegistryConfig,
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

/// Handle to a composite registry. Clones share the same state.
#[derive(Clone)]
pub struct CompositeRegistry {
    inner: Arc<RegistryInner>,
}

impl CompositeRegistry {
    pub fn new(driver: Arc<dyn CompositeDriver>) -> Self {
        Self::with_config(driver, RegistryConfig::default())
    }

    pub fn with_config(driver: Arc<dyn CompositeDriver>, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                driver,
                config,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn driver(&self) -> &Arc<dyn CompositeDriver> {
        &self.inner.driver
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, RegistryEntry>>> {
        Ok(self.inner.entries.lock()?)
    }

    fn entries_or_poisoned(&self) -> MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================
    // State queries
    // ========================================

    pub fn state(&self, type_name: &str) -> RegistrationState {
        self.entries_or_poisoned()
            .get(type_name)
            .map(RegistryEntry::state)
            .unwrap_or(RegistrationState::Unregistered)
    }

    pub fn is_pending(&self, type_name: &str) -> bool {
        self.state(type_name) == RegistrationState::Pending
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.state(type_name) == RegistrationState::Registered
    }

    /// The error captured when `type_name` was parked as pending.
    pub fn pending_error(&self, type_name: &str) -> Option<CompositeError> {
        match self.entries_or_poisoned().get(type_name) {
            Some(RegistryEntry::Pending { error, .. }) => Some(error.clone()),
            _ => None,
        }
    }

    pub fn handle(&self, type_name: &str) -> Option<RegistrationHandle> {
        match self.entries_or_poisoned().get(type_name) {
            Some(RegistryEntry::Registered { handle, .. }) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Descriptor held for `type_name`, pending or registered.
    pub fn descriptor(&self, type_name: &str) -> Option<Arc<CompositeDescriptor>> {
        self.entries_or_poisoned()
            .get(type_name)
            .map(|entry| Arc::clone(entry.descriptor()))
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.types_in(RegistrationState::Registered)
    }

    pub fn pending_types(&self) -> Vec<String> {
        self.types_in(RegistrationState::Pending)
    }

    fn types_in(&self, state: RegistrationState) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries_or_poisoned()
            .iter()
            .filter(|(_, entry)| entry.state() == state)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    // ========================================
    // State transitions
    // ========================================

    /// Parks `type_name` as pending.
    ///
    /// A registered type stays registered. A type that is already pending
    /// keeps the error captured first.
    pub fn mark_pending(
        &self,
        type_name: &str,
        descriptor: Arc<CompositeDescriptor>,
        error: CompositeError,
    ) -> Result<()> {
        let mut entries = self.entries()?;
        mark_pending_locked(&mut entries, type_name, descriptor, error);
        Ok(())
    }

    /// Records `type_name` as registered, replacing any pending entry.
    pub fn mark_registered(
        &self,
        type_name: &str,
        descriptor: Arc<CompositeDescriptor>,
        handle: RegistrationHandle,
    ) -> Result<()> {
        let mut entries = self.entries()?;
        entries.insert(
            type_name.to_string(),
            RegistryEntry::Registered { descriptor, handle },
        );
        Ok(())
    }

    // ========================================
    // Values
    // ========================================

    pub fn construct(
        &self,
        descriptor: &Arc<CompositeDescriptor>,
        args: CompositeArgs,
    ) -> Result<CompositeValue> {
        CompositeValue::construct(self, descriptor, args)
    }

    /// Converts a typed composite into a value of its declared descriptor.
    pub fn to_composite<T: CompositeType>(&self, value: T) -> Result<CompositeValue> {
        let descriptor = match self.descriptor(T::DB_TYPE) {
            Some(descriptor) => descriptor,
            None => Arc::new(T::descriptor()?),
        };
        self.construct(&descriptor, value.into_args())
    }

    /// Literal for `value`, through the driver's adapt path.
    pub fn adapt(&self, value: &Value) -> Result<String> {
        self.inner.driver.adapt(value)
    }

    /// Decodes a record of `type_name` read from the database.
    pub fn decode(&self, type_name: &str, literal: &str) -> Result<Value> {
        self.inner.driver.decode(type_name, literal)
    }

    pub fn decode_as<T: CompositeType>(&self, literal: &str) -> Result<T> {
        match self.decode(T::DB_TYPE, literal)? {
            Value::Composite(value) => T::from_composite(&value),
            other => Err(CompositeError::TypeMismatch(format!(
                "expected composite {}, got {}",
                T::DB_TYPE,
                other.type_name()
            ))),
        }
    }

    // ========================================
    // Declarations
    // ========================================

    /// Declares a composite type and attempts to register it.
    ///
    /// A type missing from the database is parked as pending; every other
    /// failure is returned.
    pub fn declare(&self, descriptor: CompositeDescriptor) -> Result<Declared> {
        let descriptor = Arc::new(descriptor);
        match self.register(&descriptor) {
            Ok(_) => {}
            Err(err) if err.is_schema_missing() => {}
            Err(err) => return Err(err),
        }

        Ok(Declared {
            column_type: crate::composite::CompositeColumnType::new(
                self.clone(),
                Arc::clone(&descriptor),
            ),
            descriptor,
        })
    }

    pub fn declare_type<T: CompositeType>(&self) -> Result<Declared> {
        self.declare(T::descriptor()?)
    }
}

fn mark_pending_locked(
    entries: &mut HashMap<String, RegistryEntry>,
    type_name: &str,
    descriptor: Arc<CompositeDescriptor>,
    error: CompositeError,
) {
    let error = match entries.get(type_name) {
        Some(RegistryEntry::Registered { .. }) => {
            warn!("ignoring pending mark for registered composite type {}", type_name);
            return;
        }
        Some(RegistryEntry::Pending { error: captured, .. }) => captured.clone(),
        None => error,
    };
    entries.insert(
        type_name.to_string(),
        RegistryEntry::Pending { descriptor, error },
    );
}

impl fmt::Debug for CompositeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeRegistry")
            .field("config", &self.inner.config)
            .field("registered", &self.registered_types())
            .field("pending", &self.pending_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::CompositeField;
    use crate::core::DataType;
    use crate::driver::{MemoryDriver, RegistrationScope};

    fn pair() -> Arc<CompositeDescriptor> {
        Arc::new(
            CompositeDescriptor::builder("pair")
                .field(CompositeField::new("a", DataType::Integer))
                .field(CompositeField::new("b", DataType::Integer))
                .build()
                .unwrap(),
        )
    }

    fn pair_handle() -> RegistrationHandle {
        RegistrationHandle {
            type_name: "pair".into(),
            oid: 16384,
            attnames: vec!["a".into(), "b".into()],
            atttypes: vec![DataType::Integer, DataType::Integer],
            scope: RegistrationScope::Global,
        }
    }

    #[test]
    fn test_unknown_type_is_unregistered() {
        let registry = CompositeRegistry::new(Arc::new(MemoryDriver::new()));
        assert_eq!(registry.state("pair"), RegistrationState::Unregistered);
        assert!(!registry.is_pending("pair"));
        assert!(!registry.is_registered("pair"));
        assert!(registry.descriptor("pair").is_none());
    }

    #[test]
    fn test_mark_registered_clears_pending() {
        let registry = CompositeRegistry::new(Arc::new(MemoryDriver::new()));
        registry
            .mark_pending("pair", pair(), CompositeError::SchemaMissing("pair".into()))
            .unwrap();
        assert!(registry.is_pending("pair"));

        registry.mark_registered("pair", pair(), pair_handle()).unwrap();
        assert!(registry.is_registered("pair"));
        assert!(registry.pending_error("pair").is_none());
        assert_eq!(registry.handle("pair"), Some(pair_handle()));
        assert!(registry.pending_types().is_empty());
    }

    #[test]
    fn test_debug_lists_types() {
        let registry = CompositeRegistry::new(Arc::new(MemoryDriver::new()));
        registry.mark_registered("pair", pair(), pair_handle()).unwrap();
        let rendered = format!("{:?}", registry);
        assert!(rendered.contains("registered: [\"pair\"]"));
    }
}
