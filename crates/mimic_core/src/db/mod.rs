//! SQLite session bootstrap and persistence unit entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections used as repository sessions.
//! - Resolve named persistence units once per process.
//! - Provision entity tables from resolved metadata.
//!
//! # Invariants
//! - Returned sessions have `foreign_keys` and `busy_timeout` applied.
//! - A session never hands out its connection for concurrent use.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;
pub mod session;
pub mod unit;

pub use open::{open_session, open_session_in_memory};
pub use session::{Session, TransactionControl};
pub use unit::{
    create_session, register_unit, registered_unit, PersistenceUnit, SchemaMode, Storage,
    DEFAULT_UNIT_NAME,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// No persistence unit is registered under this name.
    UnknownUnit(String),
    /// A unit with the same name but different settings is already registered.
    UnitConflict(String),
    InvalidUnit {
        name: String,
        message: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnknownUnit(name) => write!(f, "persistence unit `{name}` is not registered"),
            Self::UnitConflict(name) => write!(
                f,
                "persistence unit `{name}` is already registered with different settings"
            ),
            Self::InvalidUnit { name, message } => {
                write!(f, "invalid persistence unit `{name}`: {message}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnknownUnit(_) => None,
            Self::UnitConflict(_) => None,
            Self::InvalidUnit { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
