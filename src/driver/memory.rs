use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use super::{
    CompositeDriver, CompositeEncoder, CompositeFactory, CompositeTypeDef, RegistrationHandle,
    RegistrationScope, TypeCatalog,
};
use crate::adapter::{LiteralAdapter, adapt_scalar, parse_record};
use crate::core::{CompositeError, DataType, Result, Value};

lazy_static! {
    static ref CREATE_TYPE_RE: Regex =
        Regex::new(r"(?is)^\s*CREATE\s+TYPE\s+([A-Za-z_][A-Za-z0-9_$.]*)\s+AS\s*\((.*)\)\s*;?\s*$")
            .expect("valid CREATE TYPE pattern");
    static ref DROP_TYPE_RE: Regex =
        Regex::new(r"(?is)^\s*DROP\s+TYPE\s+(IF\s+EXISTS\s+)?([A-Za-z_][A-Za-z0-9_$.]*)\s*;?\s*$")
            .expect("valid DROP TYPE pattern");
}

/// First OID handed out for user-defined types, as in PostgreSQL.
const FIRST_USER_OID: u32 = 16384;

struct InstalledCaster {
    handle: RegistrationHandle,
    factory: CompositeFactory,
}

/// Driver statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverStats {
    /// Calls to `register_composite`, successful or not
    pub registration_attempts: u64,
    /// Casters installed by successful registrations
    pub casters_installed: u64,
    /// Encoder hooks installed on the adapt path
    pub adapters_installed: u64,
}

/// In-process driver backed by a server-side type catalog.
///
/// Behaves like a connection to a database whose schema can be changed with
/// `CREATE TYPE` / `DROP TYPE`. Useful wherever a live server is not.
pub struct MemoryDriver {
    catalog: RwLock<TypeCatalog>,
    casters: RwLock<HashMap<String, InstalledCaster>>,
    encoders: RwLock<HashMap<String, CompositeEncoder>>,
    next_oid: AtomicU32,
    registration_attempts: AtomicU64,
    casters_installed: AtomicU64,
    adapters_installed: AtomicU64,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(TypeCatalog::new()),
            casters: RwLock::new(HashMap::new()),
            encoders: RwLock::new(HashMap::new()),
            next_oid: AtomicU32::new(FIRST_USER_OID),
            registration_attempts: AtomicU64::new(0),
            casters_installed: AtomicU64::new(0),
            adapters_installed: AtomicU64::new(0),
        }
    }

    /// Creates a composite type on the database side. Returns its OID.
    pub fn create_type<N: Into<String>>(
        &self,
        name: &str,
        attributes: Vec<(N, DataType)>,
    ) -> Result<u32> {
        if name.is_empty() {
            return Err(CompositeError::Driver("type name must not be empty".into()));
        }

        let def = CompositeTypeDef {
            name: name.to_string(),
            oid: self.next_oid.fetch_add(1, Ordering::SeqCst),
            attributes: attributes
                .into_iter()
                .map(|(attr, ty)| (attr.into(), ty))
                .collect(),
        };
        let oid = def.oid;

        let mut catalog = self.catalog.write()?;
        *catalog = catalog.clone().with_type(def)?;
        debug!("created composite type {} (oid {})", name, oid);
        Ok(oid)
    }

    pub fn drop_type(&self, name: &str) -> Result<()> {
        let mut catalog = self.catalog.write()?;
        *catalog = catalog.clone().without_type(name)?;
        debug!("dropped composite type {}", name);
        Ok(())
    }

    pub fn type_exists(&self, name: &str) -> bool {
        self.catalog
            .read()
            .map(|catalog| catalog.type_exists(name))
            .unwrap_or(false)
    }

    /// Snapshot of the server-side catalog.
    pub fn catalog(&self) -> Result<TypeCatalog> {
        Ok(self.catalog.read()?.clone())
    }

    /// Runs a type DDL statement.
    ///
    /// Supports `CREATE TYPE <name> AS (<attr> <type>, ...)` and
    /// `DROP TYPE [IF EXISTS] <name>`.
    pub fn execute(&self, sql: &str) -> Result<()> {
        if let Some(caps) = CREATE_TYPE_RE.captures(sql) {
            let name = &caps[1];
            let attributes = parse_attribute_list(&caps[2])?;
            self.create_type(name, attributes)?;
            return Ok(());
        }

        if let Some(caps) = DROP_TYPE_RE.captures(sql) {
            let if_exists = caps.get(1).is_some();
            let name = &caps[2];
            return match self.drop_type(name) {
                Err(err) if if_exists && err.is_schema_missing() => Ok(()),
                other => other,
            };
        }

        Err(CompositeError::Driver(format!("unsupported statement: {}", sql.trim())))
    }

    pub fn stats(&self) -> DriverStats {
        DriverStats {
            registration_attempts: self.registration_attempts.load(Ordering::SeqCst),
            casters_installed: self.casters_installed.load(Ordering::SeqCst),
            adapters_installed: self.adapters_installed.load(Ordering::SeqCst),
        }
    }

    /// Whether a caster is installed for `type_name`.
    pub fn has_caster(&self, type_name: &str) -> bool {
        self.casters
            .read()
            .map(|casters| casters.contains_key(type_name))
            .unwrap_or(false)
    }

    /// Whether an encoder hook is installed for `type_name`.
    pub fn has_encoder(&self, type_name: &str) -> bool {
        self.encoders
            .read()
            .map(|encoders| encoders.contains_key(type_name))
            .unwrap_or(false)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralAdapter for MemoryDriver {
    fn adapt(&self, value: &Value) -> Result<String> {
        match value {
            Value::Composite(composite) => {
                let encoder = self.encoders.read()?.get(composite.type_name()).copied();
                match encoder {
                    Some(encoder) => encoder(self, composite),
                    None => Err(CompositeError::NotAdaptable(
                        composite.type_name().to_string(),
                    )),
                }
            }
            other => adapt_scalar(other),
        }
    }
}

impl CompositeDriver for MemoryDriver {
    fn register_composite(
        &self,
        type_name: &str,
        scope: RegistrationScope,
        factory: CompositeFactory,
    ) -> Result<RegistrationHandle> {
        self.registration_attempts.fetch_add(1, Ordering::SeqCst);

        let def = self.catalog.read()?.get_type(type_name)?.clone();
        let handle = RegistrationHandle {
            type_name: def.name.clone(),
            oid: def.oid,
            attnames: def.attnames(),
            atttypes: def.atttypes(),
            scope,
        };

        self.casters.write()?.insert(
            type_name.to_string(),
            InstalledCaster {
                handle: handle.clone(),
                factory,
            },
        );
        self.casters_installed.fetch_add(1, Ordering::SeqCst);
        debug!("installed caster for {} (oid {}, {:?})", type_name, def.oid, scope);

        Ok(handle)
    }

    fn register_adapter(&self, type_name: &str, encoder: CompositeEncoder) {
        self.encoders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.to_string(), encoder);
        self.adapters_installed.fetch_add(1, Ordering::SeqCst);
        debug!("installed encoder for {}", type_name);
    }

    fn decode(&self, type_name: &str, literal: &str) -> Result<Value> {
        let (atttypes, factory) = {
            let casters = self.casters.read()?;
            let caster = casters.get(type_name).ok_or_else(|| {
                CompositeError::Driver(format!("no caster registered for type {}", type_name))
            })?;
            (caster.handle.atttypes.clone(), caster.factory.clone())
        };

        let raw = parse_record(literal, atttypes.len())?;
        if raw.len() != atttypes.len() {
            return Err(CompositeError::Decode(format!(
                "record for {} has {} fields, expected {}",
                type_name,
                raw.len(),
                atttypes.len()
            )));
        }

        let values = raw
            .into_iter()
            .zip(atttypes.iter())
            .map(|(field, ty)| match (field, ty) {
                (None, _) => Ok(Value::Null),
                (Some(text), DataType::Composite(nested)) => self.decode(nested, &text),
                (Some(text), ty) => ty.decode_text(&text),
            })
            .collect::<Result<Vec<_>>>()?;

        factory(values).map(Value::Composite)
    }
}

/// Splits `a integer, b numeric(10,2)` into attribute/type pairs, keeping
/// commas inside parentheses.
fn parse_attribute_list(body: &str) -> Result<Vec<(String, DataType)>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in body.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);

    let mut attributes = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (name, ty) = part.split_once(char::is_whitespace).ok_or_else(|| {
            CompositeError::Driver(format!("attribute definition without a type: {}", part))
        })?;
        attributes.push((name.trim_matches('"').to_string(), DataType::from_sql_name(ty)));
    }

    Ok(attributes)
}
