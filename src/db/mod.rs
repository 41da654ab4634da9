//! Read-only database access for the analyst core.
//!
//! The core never writes to the database under analysis: the lexical guard
//! in [`validate`] rejects write statements before they reach the engine,
//! the connection itself is opened read-only, and prepared statements are
//! re-checked with `sqlite3_stmt_readonly`. Seeding the demo dataset is
//! the one writer and uses its own read-write connection.

pub mod executor;
pub mod inspector;
pub mod seed;
pub mod validate;

pub use executor::QueryExecutor;
pub use inspector::SchemaInspector;

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open a read-only connection to the analysis database.
pub fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_connection_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guard.db");

        let rw = Connection::open(&path).unwrap();
        rw.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        drop(rw);

        let ro = open_read_only(&path).unwrap();
        let err = ro.execute("INSERT INTO t (x) VALUES (1)", []);
        assert!(err.is_err());
    }

    #[test]
    fn open_read_only_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_read_only(&dir.path().join("absent.db")).is_err());
    }
}
