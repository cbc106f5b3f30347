//! Connection bootstrap utilities for SQLite sessions.
//!
//! # Responsibility
//! - Open file, private in-memory or shared in-memory SQLite connections.
//! - Configure connection pragmas required by repository behavior.
//!
//! # Invariants
//! - Returned connections have `busy_timeout` set.
//! - Returned connections have `foreign_keys=ON` unless the unit disables it.

use super::session::Session;
use super::unit::{storage_label, PersistenceUnit, SchemaMode, Storage};
use super::DbResult;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const ADHOC_UNIT_NAME: &str = "adhoc";

/// Connection pragmas applied during bootstrap.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionOptions {
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }
}

/// Opens a file-backed session outside any registered unit.
///
/// Entity tables are created on demand (`SchemaMode::Create`).
pub fn open_session(path: impl AsRef<Path>) -> DbResult<Session> {
    let path = path.as_ref();
    let conn = open_logged("file", SessionOptions::default(), || Connection::open(path))?;
    Ok(Session::new(conn, ADHOC_UNIT_NAME, SchemaMode::Create))
}

/// Opens a private in-memory session outside any registered unit.
pub fn open_session_in_memory() -> DbResult<Session> {
    let conn = open_logged("memory", SessionOptions::default(), Connection::open_in_memory)?;
    Ok(Session::new(conn, ADHOC_UNIT_NAME, SchemaMode::Create))
}

/// Opens a connection for a registered unit.
pub(crate) fn open_storage(unit: &PersistenceUnit, options: &SessionOptions) -> DbResult<Connection> {
    let mode = storage_label(&unit.storage);
    match &unit.storage {
        Storage::Memory => open_logged(mode, *options, Connection::open_in_memory),
        Storage::SharedMemory => {
            let uri = unit.shared_memory_uri();
            open_logged(mode, *options, || {
                Connection::open_with_flags(&uri, OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI)
            })
        }
        Storage::File(path) => open_logged(mode, *options, || Connection::open(path)),
    }
}

fn open_logged<F>(mode: &str, options: SessionOptions, open: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    info!("event=session_open module=db status=start mode={mode}");

    let conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=session_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, options) {
        Ok(()) => {
            info!(
                "event=session_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=session_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, options: SessionOptions) -> DbResult<()> {
    let foreign_keys = if options.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(options.busy_timeout)?;
    Ok(())
}
