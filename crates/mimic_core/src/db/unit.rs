//! Process-wide persistence unit registry.
//!
//! # Responsibility
//! - Hold named session configurations for the whole process.
//! - Open sessions bound to a named unit.
//!
//! # Invariants
//! - Registering the same unit twice is idempotent.
//! - Re-registering a name with different settings is rejected.
//! - The default unit resolves lazily on first use when not registered.

use crate::db::open::{open_storage, SessionOptions};
use crate::db::session::Session;
use crate::db::{DbError, DbResult};
use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Unit used by repositories that do not name one.
pub const DEFAULT_UNIT_NAME: &str = "mimic-repo";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

static UNITS: Lazy<Mutex<BTreeMap<String, PersistenceUnit>>> =
    Lazy::new(|| Mutex::new(BTreeMap::new()));

/// Where a unit keeps its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum Storage {
    /// Private in-memory database per session.
    Memory,
    /// In-memory database shared by every session of the unit while one is open.
    SharedMemory,
    File(PathBuf),
}

/// What a repository does with its entity table at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// `CREATE TABLE IF NOT EXISTS` from entity metadata.
    Create,
    /// Require the table and every attribute column to exist.
    Validate,
    /// Touch nothing.
    None,
}

/// Named session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceUnit {
    pub name: String,
    pub storage: Storage,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    #[serde(default = "default_schema_mode")]
    pub schema_mode: SchemaMode,
}

impl PersistenceUnit {
    pub fn new(name: impl Into<String>, storage: Storage) -> Self {
        Self {
            name: name.into(),
            storage,
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
            schema_mode: default_schema_mode(),
        }
    }

    pub fn with_schema_mode(mut self, schema_mode: SchemaMode) -> Self {
        self.schema_mode = schema_mode;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    fn validate(&self) -> DbResult<()> {
        let invalid = |message: &str| DbError::InvalidUnit {
            name: self.name.clone(),
            message: message.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if !self
            .name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        {
            return Err(invalid("name may only contain ASCII letters, digits, `-`, `_` and `.`"));
        }
        if let Storage::File(path) = &self.storage {
            if path.as_os_str().is_empty() {
                return Err(invalid("file storage path cannot be empty"));
            }
        }
        Ok(())
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            foreign_keys: self.foreign_keys,
        }
    }

    /// SQLite URI naming the shared in-memory database of this unit.
    ///
    /// The unit name is hex-encoded byte for byte, so distinct names never
    /// share a database.
    pub(crate) fn shared_memory_uri(&self) -> String {
        let encoded: String = self
            .name
            .bytes()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        format!("file:mimic-unit-{encoded}?mode=memory&cache=shared")
    }
}

impl Default for PersistenceUnit {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_NAME, Storage::SharedMemory)
    }
}

/// Registers `unit` for the whole process.
pub fn register_unit(unit: PersistenceUnit) -> DbResult<()> {
    unit.validate()?;
    let mut units = lock_units();

    if let Some(existing) = units.get(&unit.name) {
        if *existing == unit {
            return Ok(());
        }
        return Err(DbError::UnitConflict(unit.name));
    }

    info!(
        "event=unit_register module=db status=ok unit={} storage={}",
        unit.name,
        storage_label(&unit.storage)
    );
    units.insert(unit.name.clone(), unit);
    Ok(())
}

/// Returns the registered settings of `name`, resolving the default unit lazily.
pub fn registered_unit(name: &str) -> DbResult<PersistenceUnit> {
    let mut units = lock_units();
    if let Some(unit) = units.get(name) {
        return Ok(unit.clone());
    }

    if name == DEFAULT_UNIT_NAME {
        let unit = PersistenceUnit::default();
        info!(
            "event=unit_register module=db status=ok unit={} storage={} source=default",
            unit.name,
            storage_label(&unit.storage)
        );
        units.insert(unit.name.clone(), unit.clone());
        return Ok(unit);
    }

    Err(DbError::UnknownUnit(name.to_string()))
}

/// Opens a new session for the unit registered as `name`.
pub fn create_session(name: &str) -> DbResult<Session> {
    let unit = registered_unit(name)?;
    let conn = open_storage(&unit, &unit.session_options())?;
    Ok(Session::new(conn, unit.name, unit.schema_mode))
}

pub(crate) fn storage_label(storage: &Storage) -> &'static str {
    match storage {
        Storage::Memory => "memory",
        Storage::SharedMemory => "shared_memory",
        Storage::File(_) => "file",
    }
}

fn lock_units() -> std::sync::MutexGuard<'static, BTreeMap<String, PersistenceUnit>> {
    // A panic while holding the lock cannot leave the map half-written.
    UNITS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_foreign_keys() -> bool {
    true
}

fn default_schema_mode() -> SchemaMode {
    SchemaMode::Create
}

#[cfg(test)]
mod tests {
    use super::{PersistenceUnit, Storage};
    use std::collections::BTreeSet;

    #[test]
    fn shared_memory_uri_encodes_name_verbatim() {
        let unit = PersistenceUnit::new("a-B.1", Storage::SharedMemory);
        assert_eq!(
            unit.shared_memory_uri(),
            "file:mimic-unit-612d422e31?mode=memory&cache=shared"
        );
    }

    #[test]
    fn shared_memory_uri_distinguishes_separators_and_case() {
        let uris: BTreeSet<String> = ["shop-a", "shop_a", "shop.a", "shopA", "shopa"]
            .into_iter()
            .map(|name| PersistenceUnit::new(name, Storage::SharedMemory).shared_memory_uri())
            .collect();
        assert_eq!(uris.len(), 5);
    }

    #[test]
    fn validate_rejects_bad_names() {
        assert!(PersistenceUnit::new("", Storage::Memory).validate().is_err());
        assert!(PersistenceUnit::new("a b", Storage::Memory)
            .validate()
            .is_err());
        assert!(PersistenceUnit::new("ok-name_1.x", Storage::Memory)
            .validate()
            .is_ok());
    }
}
