//! Entity table provisioning and validation.
//!
//! # Responsibility
//! - Create the table backing an entity from its resolved metadata.
//! - Check that an existing table carries every attribute column.
//!
//! # Invariants
//! - Creation is idempotent (`CREATE TABLE IF NOT EXISTS`).
//! - Existing tables are never altered; this is not a migration tool.

use crate::db::session::Session;
use crate::db::unit::SchemaMode;
use crate::db::DbResult;
use crate::model::metadata::EntityMetadata;
use crate::model::schema::AttributeKind;
use crate::repo::error::{InitReason, RepoError, RepoResult};
use log::info;
use rusqlite::Connection;

/// Applies `mode` to the table backing `metadata`.
pub fn prepare_entity_table<E>(
    session: &Session,
    metadata: &EntityMetadata<E>,
    mode: SchemaMode,
) -> RepoResult<()> {
    let entity = metadata.entity_name();
    match mode {
        SchemaMode::Create => {
            session
                .connection()
                .execute_batch(&create_table_sql(metadata))
                .map_err(|err| RepoError::Db(err.into()))?;
            info!(
                "event=table_prepare module=db status=ok entity={entity} table={} mode=create",
                metadata.table_name()
            );
            Ok(())
        }
        SchemaMode::Validate => validate_entity_table(session.connection(), metadata),
        SchemaMode::None => Ok(()),
    }
}

/// Renders the `CREATE TABLE IF NOT EXISTS` statement for an entity.
pub fn create_table_sql<E>(metadata: &EntityMetadata<E>) -> String {
    let columns = metadata
        .attributes()
        .iter()
        .map(|mapped| {
            let attribute = &mapped.attribute;
            let mut definition = format!("\"{}\" {}", mapped.column, attribute.kind.sql_type());
            if attribute.identifier {
                definition.push_str(" PRIMARY KEY");
                if attribute.generated && attribute.kind == AttributeKind::Integer {
                    definition.push_str(" AUTOINCREMENT");
                } else {
                    definition.push_str(" NOT NULL");
                }
            } else {
                if !attribute.nullable {
                    definition.push_str(" NOT NULL");
                }
                if attribute.unique {
                    definition.push_str(" UNIQUE");
                }
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(",\n    ");

    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {columns}\n);",
        metadata.table_name()
    )
}

fn validate_entity_table<E>(conn: &Connection, metadata: &EntityMetadata<E>) -> RepoResult<()> {
    let entity = metadata.entity_name();
    let table = metadata.table_name();

    if !table_exists(conn, table)? {
        return Err(RepoError::Initialization {
            entity,
            reason: InitReason::MissingTable(table.to_string()),
        });
    }

    let columns = table_columns(conn, table)?;
    for mapped in metadata.attributes() {
        if !columns.iter().any(|column| *column == mapped.column) {
            return Err(RepoError::Initialization {
                entity,
                reason: InitReason::MissingColumn {
                    table: table.to_string(),
                    column: mapped.column.clone(),
                },
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\");"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
