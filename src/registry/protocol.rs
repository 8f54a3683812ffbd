use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tracing::{Level, event, info_span};

use super::{CompositeRegistry, DriftPolicy, RegistryEntry, mark_pending_locked};
use crate::adapter::adapt_composite;
use crate::composite::{CompositeDescriptor, CompositeValue};
use crate::core::{CompositeError, Result};
use crate::driver::{CompositeFactory, RegistrationHandle, RegistrationScope};

impl CompositeRegistry {
    /// Registers `descriptor` with the driver.
    ///
    /// Installs the caster and the encoder hook in one step. An already
    /// registered type is a no-op returning the existing handle. When the
    /// driver reports the type missing, the descriptor is parked as pending
    /// and `SchemaMissing` is returned.
    pub fn register(&self, descriptor: &Arc<CompositeDescriptor>) -> Result<RegistrationHandle> {
        descriptor.require_type_name()?;
        let mut entries = self.entries()?;
        self.register_locked(&mut entries, descriptor)
    }

    /// Makes sure a pending type gets another registration attempt before use.
    ///
    /// Unregistered and registered types pass through. If the type is still
    /// missing, the error captured when it was first parked is returned.
    pub fn ensure_registered(&self, descriptor: &Arc<CompositeDescriptor>) -> Result<()> {
        let type_name = descriptor.type_name();
        let mut entries = self.entries()?;

        let captured = match entries.get(type_name) {
            Some(RegistryEntry::Pending { error, .. }) => error.clone(),
            _ => return Ok(()),
        };

        if !self.inner.config.retry_on_use {
            return Err(captured);
        }

        debug!("retrying registration of pending composite type {}", type_name);
        match self.register_locked(&mut entries, descriptor) {
            Ok(_) => Ok(()),
            Err(err) if err.is_schema_missing() => Err(captured),
            Err(err) => Err(err),
        }
    }

    fn register_locked(
        &self,
        entries: &mut HashMap<String, RegistryEntry>,
        descriptor: &Arc<CompositeDescriptor>,
    ) -> Result<RegistrationHandle> {
        let type_name = descriptor.type_name();

        let target = match entries.get(type_name) {
            Some(RegistryEntry::Registered {
                descriptor: existing,
                handle,
            }) => {
                self.check_drift(existing, descriptor)?;
                debug!("composite type {} already registered", type_name);
                return Ok(handle.clone());
            }
            Some(RegistryEntry::Pending {
                descriptor: existing,
                ..
            }) => {
                if self.check_drift(existing, descriptor)? {
                    Arc::clone(descriptor)
                } else {
                    Arc::clone(existing)
                }
            }
            None => Arc::clone(descriptor),
        };

        let span = info_span!("composite_register", type_name = %type_name);
        let _guard = span.enter();

        // casters are always installed connection-wide
        let result = self.inner.driver.register_composite(
            type_name,
            RegistrationScope::Global,
            decode_factory(&target),
        );

        match result {
            Ok(handle) => {
                self.inner.driver.register_adapter(type_name, adapt_composite);
                event!(Level::INFO, oid = handle.oid, "composite caster and encoder installed");
                info!("registered composite type {} (oid {})", type_name, handle.oid);
                entries.insert(
                    type_name.to_string(),
                    RegistryEntry::Registered {
                        descriptor: target,
                        handle: handle.clone(),
                    },
                );
                Ok(handle)
            }
            Err(err) if err.is_schema_missing() => {
                event!(Level::WARN, error = %err, "composite type missing in the database");
                warn!(
                    "composite type {} not found in the database; \
                     registration deferred until first use",
                    type_name
                );
                mark_pending_locked(entries, type_name, target, err.clone());
                Err(err)
            }
            Err(err) => {
                event!(Level::ERROR, error = %err, "composite registration failed");
                Err(err)
            }
        }
    }

    /// Compares the field list of a redeclaration with the one on record.
    ///
    /// Returns `true` when `declared` may be used, `false` when the recorded
    /// descriptor is kept.
    fn check_drift(
        &self,
        existing: &Arc<CompositeDescriptor>,
        declared: &Arc<CompositeDescriptor>,
    ) -> Result<bool> {
        if Arc::ptr_eq(existing, declared) || existing.signature() == declared.signature() {
            return Ok(true);
        }

        match self.inner.config.drift_policy {
            DriftPolicy::Reject => Err(CompositeError::FieldDrift {
                type_name: declared.type_name().to_string(),
                registered: existing.signature_string(),
                declared: declared.signature_string(),
            }),
            DriftPolicy::KeepFirst => {
                warn!(
                    "composite type {} redeclared as ({}); keeping ({})",
                    declared.type_name(),
                    declared.signature_string(),
                    existing.signature_string()
                );
                Ok(false)
            }
        }
    }
}

/// Decode factory bound to `descriptor`: positional row fields map onto the
/// descriptor's fields in declaration order.
fn decode_factory(descriptor: &Arc<CompositeDescriptor>) -> CompositeFactory {
    let descriptor = Arc::clone(descriptor);
    Arc::new(move |values| CompositeValue::from_row(&descriptor, values))
}
