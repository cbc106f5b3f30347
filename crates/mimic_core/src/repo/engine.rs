//! Generic repository engine.
//!
//! # Responsibility
//! - Provide CRUD over any [`Entity`] without hand-written SQL.
//! - Register and run convention queries by stable key.
//!
//! # Invariants
//! - Metadata is resolved once, at construction, and never changes.
//! - Writes (`save`, `delete_all`, `delete_by_id`, `delete_by`) run inside
//!   one transaction each; reads never open one.
//! - `save` persists when the identifier is absent or unknown to the store,
//!   and merges otherwise.

use crate::db::schema::prepare_entity_table;
use crate::db::session::Session;
use crate::db::unit::{create_session, DEFAULT_UNIT_NAME};
use crate::model::metadata::{is_absent_identifier, EntityMetadata};
use crate::model::schema::Entity;
use crate::query::builder::{QueryDescriptor, QueryForm};
use crate::query::convention;
use crate::query::registry::QueryRegistry;
use crate::repo::error::{CrudOperation, RepoError, RepoResult};
use crate::repo::transaction::TransactionExecutor;
use log::{debug, error, info};
use rusqlite::ToSql;
use std::marker::PhantomData;

/// Which write path `save` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted,
    Merged,
}

/// CRUD contract shared by every repository.
pub trait CrudRepository<E, K> {
    /// Persists a new entity or merges an existing one; returns it with its identifier.
    fn save(&mut self, entity: E) -> RepoResult<E>;
    fn find_by_id(&self, id: K) -> RepoResult<Option<E>>;
    /// Every instance, ordered by identifier.
    fn find_all(&self) -> RepoResult<Vec<E>>;
    fn count(&self) -> RepoResult<u64>;
    fn delete_all(&mut self) -> RepoResult<()>;
    /// Removes the entity with `id`; a missing id is a no-op.
    fn delete_by_id(&mut self, id: K) -> RepoResult<()>;
}

/// Repository over entity `E` addressed by identifiers of type `K`.
///
/// Owns one session; not meant to be shared across threads.
pub struct MimicRepository<E, K> {
    session: Session,
    metadata: EntityMetadata<E>,
    queries: QueryRegistry,
    executor: TransactionExecutor,
    _key: PhantomData<fn(K)>,
}

impl<E: Entity, K: ToSql> MimicRepository<E, K> {
    /// Builds a repository over `session`, resolving metadata and preparing the table.
    pub fn new(session: Session) -> RepoResult<Self> {
        let metadata = match EntityMetadata::<E>::resolve() {
            Ok(metadata) => metadata,
            Err(err) => {
                error!(
                    "event=repo_init module=repo status=error error_code={} error={err}",
                    err.code()
                );
                return Err(err);
            }
        };
        prepare_entity_table(&session, &metadata, session.schema_mode())?;

        info!(
            "event=repo_init module=repo status=ok entity={} unit={}",
            metadata.entity_name(),
            session.unit()
        );
        Ok(Self {
            session,
            metadata,
            queries: QueryRegistry::new(),
            executor: TransactionExecutor::new(),
            _key: PhantomData,
        })
    }

    /// Builds a repository on a new session of the named persistence unit.
    pub fn open(unit: &str) -> RepoResult<Self> {
        Self::new(create_session(unit)?)
    }

    /// Builds a repository on the default persistence unit.
    pub fn open_default() -> RepoResult<Self> {
        Self::open(DEFAULT_UNIT_NAME)
    }

    pub fn metadata(&self) -> &EntityMetadata<E> {
        &self.metadata
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    /// Like [`CrudRepository::save`], also reporting which write path ran.
    pub fn save_with_outcome(&mut self, mut entity: E) -> RepoResult<(E, SaveOutcome)> {
        let entity_name = self.metadata.entity_name();
        let id = self.metadata.identifier_value(&entity);
        let is_new = is_absent_identifier(&id)
            || !self
                .session
                .contains(&self.metadata, &id)
                .map_err(|err| RepoError::crud(entity_name, CrudOperation::Find, err))?;

        let metadata = &self.metadata;
        let outcome = if is_new {
            self.executor.run(&self.session, |session| {
                let key = session
                    .persist(metadata, &entity)
                    .map_err(|err| RepoError::crud(entity_name, CrudOperation::Persist, err))?;
                if let Some(key) = key {
                    metadata.assign_identifier(&mut entity, key);
                }
                Ok(SaveOutcome::Persisted)
            })
        } else {
            self.executor.run(&self.session, |session| {
                session
                    .merge(metadata, &entity)
                    .map_err(|err| RepoError::crud(entity_name, CrudOperation::Merge, err))?;
                Ok(SaveOutcome::Merged)
            })
        };

        match outcome {
            Ok(outcome) => {
                debug!(
                    "event=repo_save module=repo status=ok entity={entity_name} outcome={}",
                    save_outcome_label(outcome)
                );
                Ok((entity, outcome))
            }
            Err(err) => {
                error!(
                    "event=repo_save module=repo status=error entity={entity_name} error_code={} error={err}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Parses `method` by naming convention and registers it under its own name.
    pub fn register_query(&mut self, method: &str) -> RepoResult<()> {
        let parsed = convention::parse(method)?;
        self.register(method, parsed.form, &parsed.attributes)
    }

    /// Registers `key` with an explicit attribute list.
    pub fn register_query_with(
        &mut self,
        key: &str,
        form: QueryForm,
        attributes: &[&str],
    ) -> RepoResult<()> {
        let attributes: Vec<String> = attributes.iter().map(|name| name.to_string()).collect();
        self.register(key, form, &attributes)
    }

    /// Keys of every registered query, sorted.
    pub fn registered_queries(&self) -> Vec<&str> {
        self.queries.keys().collect()
    }

    /// Runs the select query registered as `key`.
    pub fn find_by(&self, key: &str, args: &[&dyn ToSql]) -> RepoResult<Vec<E>> {
        let descriptor = self.lookup(key, QueryForm::SelectFiltered)?;
        let bound = descriptor
            .bind(args)
            .map_err(|reason| RepoError::derivation(key, reason))?;
        self.session
            .query_rows(bound.sql(), &bound.named_params(), E::from_row)
            .map_err(|err| self.crud_error(CrudOperation::Query, err))
    }

    /// Runs the count query registered as `key`.
    pub fn count_by(&self, key: &str, args: &[&dyn ToSql]) -> RepoResult<u64> {
        let descriptor = self.lookup(key, QueryForm::CountFiltered)?;
        let bound = descriptor
            .bind(args)
            .map_err(|reason| RepoError::derivation(key, reason))?;
        let total = self
            .session
            .query_scalar(bound.sql(), &bound.named_params())
            .map_err(|err| self.crud_error(CrudOperation::Query, err))?;
        non_negative(total)
    }

    /// Runs the delete query registered as `key` in one transaction.
    ///
    /// Returns the number of removed rows.
    pub fn delete_by(&mut self, key: &str, args: &[&dyn ToSql]) -> RepoResult<u64> {
        let entity_name = self.metadata.entity_name();
        let descriptor = self.lookup(key, QueryForm::DeleteFiltered)?;
        let bound = descriptor
            .bind(args)
            .map_err(|reason| RepoError::derivation(key, reason))?;
        let removed = self.executor.run(&self.session, |session| {
            session
                .execute_update(bound.sql(), &bound.named_params())
                .map_err(|err| RepoError::crud(entity_name, CrudOperation::Remove, err))
        })?;
        debug!(
            "event=repo_delete module=repo status=ok entity={entity_name} query={key} removed={removed}"
        );
        Ok(removed as u64)
    }

    fn register(&mut self, key: &str, form: QueryForm, attributes: &[String]) -> RepoResult<()> {
        let descriptor = QueryDescriptor::build(&self.metadata, attributes, form)
            .map_err(|reason| RepoError::derivation(key, reason))?;
        self.queries
            .insert(key, descriptor)
            .map_err(|reason| RepoError::derivation(key, reason))?;
        info!(
            "event=query_register module=repo status=ok entity={} query={key} form={} attributes={}",
            self.metadata.entity_name(),
            form.label(),
            attributes.join(",")
        );
        Ok(())
    }

    fn lookup(&self, key: &str, form: QueryForm) -> RepoResult<&QueryDescriptor> {
        self.queries
            .lookup(key, form)
            .map_err(|reason| RepoError::derivation(key, reason))
    }

    fn unfiltered(&self, form: QueryForm) -> RepoResult<QueryDescriptor> {
        QueryDescriptor::build(&self.metadata, &[], form)
            .map_err(|reason| RepoError::derivation(form.label(), reason))
    }

    fn crud_error(&self, operation: CrudOperation, err: crate::db::DbError) -> RepoError {
        RepoError::crud(self.metadata.entity_name(), operation, err)
    }
}

impl<E: Entity, K: ToSql> CrudRepository<E, K> for MimicRepository<E, K> {
    fn save(&mut self, entity: E) -> RepoResult<E> {
        self.save_with_outcome(entity).map(|(entity, _)| entity)
    }

    fn find_by_id(&self, id: K) -> RepoResult<Option<E>> {
        self.session
            .find(&self.metadata, &id, E::from_row)
            .map_err(|err| self.crud_error(CrudOperation::Find, err))
    }

    fn find_all(&self) -> RepoResult<Vec<E>> {
        let descriptor = self.unfiltered(QueryForm::SelectAll)?;
        self.session
            .query_rows(&descriptor.sql(), &[], E::from_row)
            .map_err(|err| self.crud_error(CrudOperation::FindAll, err))
    }

    fn count(&self) -> RepoResult<u64> {
        let descriptor = self.unfiltered(QueryForm::Count)?;
        let total = self
            .session
            .query_scalar(&descriptor.sql(), &[])
            .map_err(|err| self.crud_error(CrudOperation::Count, err))?;
        non_negative(total)
    }

    fn delete_all(&mut self) -> RepoResult<()> {
        let entity_name = self.metadata.entity_name();
        let sql = self.unfiltered(QueryForm::DeleteAll)?.sql();
        let removed = self.executor.run(&self.session, |session| {
            session
                .execute_update(&sql, &[])
                .map_err(|err| RepoError::crud(entity_name, CrudOperation::DeleteAll, err))
        })?;
        debug!("event=repo_delete module=repo status=ok entity={entity_name} scope=all removed={removed}");
        Ok(())
    }

    fn delete_by_id(&mut self, id: K) -> RepoResult<()> {
        let entity_name = self.metadata.entity_name();
        let Some(entity) = self.find_by_id(id)? else {
            debug!("event=repo_delete module=repo status=skipped entity={entity_name} reason=not_found");
            return Ok(());
        };

        let id = self.metadata.identifier_value(&entity);
        let metadata = &self.metadata;
        self.executor.run(&self.session, |session| {
            session
                .remove(metadata, &id)
                .map_err(|err| RepoError::crud(entity_name, CrudOperation::Remove, err))
        })?;
        debug!("event=repo_delete module=repo status=ok entity={entity_name} scope=id");
        Ok(())
    }
}

fn non_negative(total: i64) -> RepoResult<u64> {
    u64::try_from(total).map_err(|_| RepoError::InvalidData(format!("negative row count {total}")))
}

fn save_outcome_label(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Persisted => "persist",
        SaveOutcome::Merged => "merge",
    }
}
