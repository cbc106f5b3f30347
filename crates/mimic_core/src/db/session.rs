//! Persistence session over one SQLite connection.
//!
//! # Responsibility
//! - Expose begin/commit/rollback/is-active transaction control.
//! - Persist, merge, remove and find entity instances.
//! - Run named-parameter queries returning rows, a scalar or a row count.
//!
//! # Invariants
//! - Transaction activity is read from SQLite itself (`is_autocommit`).
//! - A session is owned by exactly one repository and never shared.

use crate::db::unit::SchemaMode;
use crate::db::DbResult;
use crate::model::metadata::{is_absent_identifier, EntityMetadata};
use crate::query::builder::{insert_sql, update_sql};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, ToSql};

/// Begin/commit/rollback surface consumed by the transaction executor.
pub trait TransactionControl {
    fn begin(&self) -> DbResult<()>;
    fn commit(&self) -> DbResult<()>;
    fn rollback(&self) -> DbResult<()>;
    fn is_active(&self) -> bool;
}

/// One SQLite connection plus the unit settings it was opened with.
pub struct Session {
    conn: Connection,
    unit: String,
    schema_mode: SchemaMode,
}

impl Session {
    pub(crate) fn new(conn: Connection, unit: impl Into<String>, schema_mode: SchemaMode) -> Self {
        Self {
            conn,
            unit: unit.into(),
            schema_mode,
        }
    }

    /// Name of the persistence unit this session belongs to.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn schema_mode(&self) -> SchemaMode {
        self.schema_mode
    }

    /// Raw connection access for callers that need plain SQL.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `sql` and maps every returned row.
    pub fn query_rows<T, F>(
        &self,
        sql: &str,
        params: &[(&str, &dyn ToSql)],
        mut map_row: F,
    ) -> DbResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut mapped = Vec::new();
        while let Some(row) = rows.next()? {
            mapped.push(map_row(row)?);
        }
        Ok(mapped)
    }

    /// Runs `sql` and returns the integer in the first column of the first row.
    pub fn query_scalar(&self, sql: &str, params: &[(&str, &dyn ToSql)]) -> DbResult<i64> {
        let value = self.conn.query_row(sql, params, |row| row.get::<_, i64>(0))?;
        Ok(value)
    }

    /// Runs a data-changing statement and returns the affected row count.
    pub fn execute_update(&self, sql: &str, params: &[(&str, &dyn ToSql)]) -> DbResult<usize> {
        let changed = self.conn.execute(sql, params)?;
        Ok(changed)
    }

    /// Inserts `entity` as a new row.
    ///
    /// Returns the store-assigned row id when the identifier was absent.
    pub fn persist<E>(&self, metadata: &EntityMetadata<E>, entity: &E) -> DbResult<Option<i64>> {
        let include_identifier = !is_absent_identifier(&metadata.identifier_value(entity));
        let values = attribute_values(metadata, entity, include_identifier);
        self.execute_update(
            &insert_sql(metadata, include_identifier),
            &named(&values),
        )?;

        if include_identifier {
            Ok(None)
        } else {
            Ok(Some(self.conn.last_insert_rowid()))
        }
    }

    /// Updates the row addressed by the identifier of `entity`.
    pub fn merge<E>(&self, metadata: &EntityMetadata<E>, entity: &E) -> DbResult<usize> {
        let Some(sql) = update_sql(metadata) else {
            return Ok(0);
        };
        let values = attribute_values(metadata, entity, true);
        self.execute_update(&sql, &named(&values))
    }

    /// Deletes the row addressed by `id`.
    pub fn remove<E>(&self, metadata: &EntityMetadata<E>, id: &dyn ToSql) -> DbResult<usize> {
        let identifier = metadata.identifier();
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = :id;",
            metadata.table_name(),
            identifier.column
        );
        self.execute_update(&sql, &[(":id", id)])
    }

    /// Loads the row addressed by `id`.
    pub fn find<E, F>(
        &self,
        metadata: &EntityMetadata<E>,
        id: &dyn ToSql,
        map_row: F,
    ) -> DbResult<Option<E>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<E>,
    {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = :id;",
            metadata.select_list(),
            metadata.table_name(),
            metadata.identifier().column
        );
        let mut found = self.query_rows(&sql, &[(":id", id)], map_row)?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Returns whether a row with identifier `id` exists.
    pub fn contains<E>(&self, metadata: &EntityMetadata<E>, id: &dyn ToSql) -> DbResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE \"{}\" = :id);",
            metadata.table_name(),
            metadata.identifier().column
        );
        Ok(self.query_scalar(&sql, &[(":id", id)])? == 1)
    }
}

impl TransactionControl for Session {
    fn begin(&self) -> DbResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit(&self) -> DbResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&self) -> DbResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

fn attribute_values<E>(
    metadata: &EntityMetadata<E>,
    entity: &E,
    include_identifier: bool,
) -> Vec<(String, Value)> {
    metadata
        .attributes()
        .iter()
        .filter(|mapped| include_identifier || !mapped.attribute.identifier)
        .map(|mapped| {
            (
                format!(":{}", mapped.attribute.name),
                (mapped.accessor)(entity),
            )
        })
        .collect()
}

fn named(values: &[(String, Value)]) -> Vec<(&str, &dyn ToSql)> {
    values
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::TransactionControl;
    use crate::db::open_session_in_memory;

    #[test]
    fn transaction_activity_follows_sqlite_state() {
        let session = open_session_in_memory().unwrap();
        assert!(!session.is_active());
        session.begin().unwrap();
        assert!(session.is_active());
        session.rollback().unwrap();
        assert!(!session.is_active());
    }

    #[test]
    fn nested_begin_is_rejected() {
        let session = open_session_in_memory().unwrap();
        session.begin().unwrap();
        assert!(session.begin().is_err());
        assert!(session.is_active());
        session.commit().unwrap();
    }

    #[test]
    fn named_parameter_queries() {
        let session = open_session_in_memory().unwrap();
        session
            .connection()
            .execute_batch("CREATE TABLE t (v INTEGER NOT NULL);")
            .unwrap();
        let changed = session
            .execute_update("INSERT INTO t (v) VALUES (:v);", &[(":v", &5_i64)])
            .unwrap();
        assert_eq!(changed, 1);
        let total = session
            .query_scalar("SELECT COUNT(*) FROM t WHERE v = :v;", &[(":v", &5_i64)])
            .unwrap();
        assert_eq!(total, 1);
        let values = session
            .query_rows("SELECT v FROM t;", &[], |row| row.get::<_, i64>(0))
            .unwrap();
        assert_eq!(values, vec![5]);
    }
}
