//! Fresh schema snapshots from the live database.

use crate::error::ToolError;
use crate::types::{ColumnInfo, SchemaSnapshot, TableInfo};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Reads table and column metadata on demand.
///
/// Stateless by construction: every call opens its own read-only
/// connection and re-reads the catalog, so schema changes made between
/// turns (seeding, external tooling) show up immediately.
pub struct SchemaInspector {
    db_path: PathBuf,
}

impl SchemaInspector {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Describe every user table with its columns in declared order.
    pub async fn describe(&self) -> Result<SchemaSnapshot, ToolError> {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || read_snapshot(&path))
            .await
            .map_err(|e| ToolError::Schema(format!("schema worker failed: {e}")))?
    }
}

fn read_snapshot(path: &Path) -> Result<SchemaSnapshot, ToolError> {
    let conn = crate::db::open_read_only(path).map_err(schema_err)?;

    let names = table_names(&conn)?;
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = table_columns(&conn, &name)?;
        tables.push(TableInfo { name, columns });
    }

    Ok(SchemaSnapshot { tables })
}

fn table_names(conn: &Connection) -> Result<Vec<String>, ToolError> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(schema_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(schema_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(schema_err)?;
    Ok(names)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, ToolError> {
    let mut stmt = conn
        .prepare(
            "SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid",
        )
        .map_err(schema_err)?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                decl_type: row.get(1)?,
                nullable: row.get::<_, i64>(2)? == 0,
            })
        })
        .map_err(schema_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(schema_err)?;
    Ok(columns)
}

fn schema_err(err: rusqlite::Error) -> ToolError {
    ToolError::Schema(err.to_string())
}
