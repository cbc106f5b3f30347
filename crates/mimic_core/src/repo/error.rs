//! Repository error taxonomy.
//!
//! # Invariants
//! - Persistence failures always carry the entity and operation that failed.
//! - Transaction failures carry the stage (`begin`/`commit`) that failed.
//! - A rollback failure is never reported in place of the original error.

use crate::db::DbError;
use crate::query::builder::QueryForm;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Why an entity type cannot back a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitReason {
    NoIdentifier,
    MultipleIdentifiers,
    NoIdentifierAccessor,
    NoAttributeAccessor(&'static str),
    DuplicateAttribute(&'static str),
    /// Two attributes map to the same storage column.
    DuplicateColumn(String),
    InvalidName(String),
    MissingTable(String),
    MissingColumn { table: String, column: String },
}

impl Display for InitReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoIdentifier => write!(f, "no identifier attribute declared"),
            Self::MultipleIdentifiers => write!(f, "multiple identifier attributes declared"),
            Self::NoIdentifierAccessor => write!(f, "identifier attribute has no accessor"),
            Self::NoAttributeAccessor(name) => write!(f, "attribute `{name}` has no accessor"),
            Self::DuplicateAttribute(name) => write!(f, "attribute `{name}` declared twice"),
            Self::DuplicateColumn(column) => {
                write!(f, "several attributes map to column `{column}`")
            }
            Self::InvalidName(name) => write!(f, "`{name}` is not a valid entity/attribute name"),
            Self::MissingTable(table) => write!(f, "table `{table}` does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "column `{column}` is missing from table `{table}`")
            }
        }
    }
}

/// Why a method identifier could not become a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationReason {
    MissingPrefix,
    EmptyAttributeChain,
    MalformedAttribute(String),
    UnknownAttribute(String),
    DuplicateAttribute(String),
    UnexpectedConditions,
    AlreadyRegistered,
    UnknownQuery,
    FormMismatch {
        registered: QueryForm,
        requested: QueryForm,
    },
    ArgumentCount {
        expected: usize,
        actual: usize,
    },
}

impl Display for DerivationReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrefix => write!(f, "expected a findBy/find/countBy/deleteBy prefix"),
            Self::EmptyAttributeChain => write!(f, "no filter attributes after the prefix"),
            Self::MalformedAttribute(token) => write!(f, "malformed attribute token `{token}`"),
            Self::UnknownAttribute(name) => write!(f, "entity has no attribute `{name}`"),
            Self::DuplicateAttribute(name) => write!(f, "attribute `{name}` filtered twice"),
            Self::UnexpectedConditions => write!(f, "unfiltered query forms take no conditions"),
            Self::AlreadyRegistered => write!(f, "a query is already registered under this key"),
            Self::UnknownQuery => write!(f, "no query is registered under this key"),
            Self::FormMismatch {
                registered,
                requested,
            } => write!(
                f,
                "query registered as {} cannot run as {}",
                registered.label(),
                requested.label()
            ),
            Self::ArgumentCount { expected, actual } => {
                write!(f, "expected {expected} arguments, got {actual}")
            }
        }
    }
}

/// Persistence operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOperation {
    Persist,
    Merge,
    Remove,
    Find,
    FindAll,
    Count,
    DeleteAll,
    Query,
}

impl CrudOperation {
    pub fn label(self) -> &'static str {
        match self {
            Self::Persist => "persist",
            Self::Merge => "merge",
            Self::Remove => "remove",
            Self::Find => "find",
            Self::FindAll => "find_all",
            Self::Count => "count",
            Self::DeleteAll => "delete_all",
            Self::Query => "query",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    Begin,
    Commit,
}

impl TransactionStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
        }
    }
}

/// Error surfaced by every repository operation.
#[derive(Debug)]
pub enum RepoError {
    /// Entity shape or table violates repository invariants. Fatal for the instance.
    Initialization {
        entity: &'static str,
        reason: InitReason,
    },
    /// A method identifier or registered query could not be used.
    QueryDerivation {
        method: String,
        reason: DerivationReason,
    },
    /// persist/merge/remove/find/query failed in the underlying store.
    Crud {
        entity: &'static str,
        operation: CrudOperation,
        source: DbError,
    },
    /// The transaction could not begin or commit.
    Transaction {
        stage: TransactionStage,
        source: DbError,
    },
    /// Session could not be created.
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    pub fn crud(entity: &'static str, operation: CrudOperation, source: impl Into<DbError>) -> Self {
        Self::Crud {
            entity,
            operation,
            source: source.into(),
        }
    }

    pub fn derivation(method: impl Into<String>, reason: DerivationReason) -> Self {
        Self::QueryDerivation {
            method: method.into(),
            reason,
        }
    }

    /// Short stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "init_failed",
            Self::QueryDerivation { .. } => "query_derivation_failed",
            Self::Crud { .. } => "crud_failed",
            Self::Transaction { .. } => "transaction_failed",
            Self::Db(_) => "db_failed",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialization { entity, reason } => {
                write!(f, "cannot build repository for `{entity}`: {reason}")
            }
            Self::QueryDerivation { method, reason } => {
                write!(f, "cannot derive query from `{method}`: {reason}")
            }
            Self::Crud {
                entity,
                operation,
                source,
            } => write!(f, "{} failed for `{entity}`: {source}", operation.label()),
            Self::Transaction { stage, source } => {
                write!(f, "transaction {} failed: {source}", stage.label())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Crud { source, .. } => Some(source),
            Self::Transaction { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::Initialization { .. } => None,
            Self::QueryDerivation { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}
