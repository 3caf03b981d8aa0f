use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::error::ImportError;

pub const CONTENT_ENTRIES_TABLE: &str = "content_entries";

/// Opens an existing store. Creating the database itself is left to whoever
/// owns the content entries.
pub fn open_store_connection(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open content store: {}", db_path.display()))?;

    configure_connection(&connection)?;
    Ok(connection)
}

pub fn open_store_read_only(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open content store: {}", db_path.display()))
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_embedding_schema(connection: &Connection) -> Result<(), ImportError> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS embeddings (
              id TEXT PRIMARY KEY,
              entry_id TEXT NOT NULL,
              embedding BLOB NOT NULL,
              embedding_dim INTEGER NOT NULL,
              type TEXT NOT NULL,
              content TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_embeddings_entry_id ON embeddings(entry_id);
            ",
        )
        .map_err(ImportError::store("create embeddings schema"))
}

pub fn ensure_content_table(connection: &Connection) -> Result<(), ImportError> {
    if table_exists(connection, CONTENT_ENTRIES_TABLE)? {
        Ok(())
    } else {
        Err(ImportError::MissingContentTable {
            table: CONTENT_ENTRIES_TABLE,
        })
    }
}

pub fn table_exists(connection: &Connection, table: &str) -> Result<bool, ImportError> {
    let found = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(ImportError::store("inspect schema"))?;

    Ok(found.is_some())
}
