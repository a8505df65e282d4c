// src/db/mod.rs

//! Repository database access
//!
//! The query engine only ever reads. Connections are opened read-only, one
//! per request, and closed when the owning session drops. `init` exists to
//! lay down the repository schema for fixture repositories and local
//! experiments; nothing in the engine writes through it.

pub mod migrations;
pub mod schema;
pub mod stream;
pub mod troveinfo;

use crate::error::Result;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info};

/// Open an existing repository database read-only
pub fn open(db_path: impl AsRef<Path>) -> Result<Connection> {
    let db_path = db_path.as_ref();
    debug!("Opening repository database read-only: {}", db_path.display());

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Create a repository database with the current schema
pub fn init(db_path: impl AsRef<Path>) -> Result<()> {
    let db_path = db_path.as_ref();
    info!("Initializing repository database at {}", db_path.display());

    let conn = Connection::open(db_path)?;
    schema::migrate(&conn)?;
    Ok(())
}

/// Open a database read-write, for seeding fixtures
pub fn open_rw(db_path: impl AsRef<Path>) -> Result<Connection> {
    Ok(Connection::open(db_path)?)
}

/// Run `f` inside a transaction, committing on success
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_open_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repos.db");
        init(&path).unwrap();

        let conn = open(&path).unwrap();
        let version = schema::get_schema_version(&conn).unwrap();
        assert_eq!(version, schema::SCHEMA_VERSION);

        let err = conn.execute("INSERT INTO Items (item) VALUES ('x')", []);
        assert!(err.is_err());
    }

    #[test]
    fn test_open_missing_database_fails() {
        let dir = TempDir::new().unwrap();
        assert!(open(dir.path().join("missing.db")).is_err());
    }
}
