//! Convention-driven repository engine over SQLite.
//! Entities declare their shape once; repositories derive CRUD and
//! filtered queries from it.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use db::{
    create_session, open_session, open_session_in_memory, register_unit, DbError, DbResult,
    PersistenceUnit, SchemaMode, Session, Storage, TransactionControl, DEFAULT_UNIT_NAME,
};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::metadata::EntityMetadata;
pub use model::schema::{Attribute, AttributeKind, Entity, EntitySchema};
pub use query::builder::{BoundQuery, QueryDescriptor, QueryForm};
pub use query::convention::{parse as parse_method, parse_attributes, ParsedMethod};
pub use repo::engine::{CrudRepository, MimicRepository, SaveOutcome};
pub use repo::error::{
    CrudOperation, DerivationReason, InitReason, RepoError, RepoResult, TransactionStage,
};
pub use repo::transaction::{TransactionExecutor, TransactionOutcome, TransactionState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
