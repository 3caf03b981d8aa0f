use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::{StatusArgs, resolve_db_path};
use crate::commands::import::{CONTENT_ENTRIES_TABLE, open_store_read_only, table_exists};
use crate::vector::{EMBEDDING_SIZE, decode_embedding_blob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSummary {
    pub entries: i64,
    pub embeddings: i64,
    pub entries_without_embedding: i64,
    /// Stored vectors that do not decode to `EMBEDDING_SIZE` values.
    pub malformed_embeddings: usize,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_ref());

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = open_store_read_only(&db_path)?;
    if !table_exists(&connection, CONTENT_ENTRIES_TABLE)? {
        warn!(path = %db_path.display(), "content entries table missing");
        return Ok(());
    }

    let summary = summarize_store(&connection)?;
    info!(
        path = %db_path.display(),
        entries = summary.entries,
        embeddings = summary.embeddings,
        entries_without_embedding = summary.entries_without_embedding,
        "database status"
    );
    if summary.malformed_embeddings > 0 {
        warn!(
            malformed_embeddings = summary.malformed_embeddings,
            expected_dim = EMBEDDING_SIZE,
            "stored embeddings with unexpected size"
        );
    }

    Ok(())
}

pub fn summarize_store(connection: &Connection) -> Result<StoreSummary> {
    let entries = query_count(connection, "SELECT COUNT(*) FROM content_entries")?;

    if !table_exists(connection, "embeddings")? {
        return Ok(StoreSummary {
            entries,
            embeddings: 0,
            entries_without_embedding: entries,
            malformed_embeddings: 0,
        });
    }

    Ok(StoreSummary {
        entries,
        embeddings: query_count(connection, "SELECT COUNT(*) FROM embeddings")?,
        entries_without_embedding: query_count(
            connection,
            "
            SELECT COUNT(*)
            FROM content_entries AS entry
            WHERE NOT EXISTS (SELECT 1 FROM embeddings WHERE entry_id = entry.id)
            ",
        )?,
        malformed_embeddings: count_malformed_embeddings(connection)?,
    })
}

fn count_malformed_embeddings(connection: &Connection) -> Result<usize> {
    let mut statement = connection.prepare("SELECT embedding FROM embeddings")?;
    let mut rows = statement.query([])?;
    let mut malformed = 0usize;

    while let Some(row) = rows.next()? {
        let blob: Vec<u8> = row.get(0)?;
        if decode_embedding_blob(&blob, EMBEDDING_SIZE).is_none() {
            malformed += 1;
        }
    }

    Ok(malformed)
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::encode_embedding_blob;

    fn store_with_entries(ids: &[&str]) -> Connection {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        connection
            .execute_batch("CREATE TABLE content_entries (id TEXT PRIMARY KEY, entry_data TEXT);")
            .expect("content table should be created");
        for id in ids {
            connection
                .execute(
                    "INSERT INTO content_entries(id, entry_data) VALUES(?1, '{}')",
                    [*id],
                )
                .expect("entry insert should succeed");
        }
        connection
    }

    #[test]
    fn summary_without_embeddings_table_counts_every_entry_as_missing() {
        let connection = store_with_entries(&["a", "b"]);

        let summary = summarize_store(&connection).expect("summary should succeed");
        assert_eq!(
            summary,
            StoreSummary {
                entries: 2,
                embeddings: 0,
                entries_without_embedding: 2,
                malformed_embeddings: 0,
            }
        );
    }

    #[test]
    fn summary_counts_entries_lacking_embeddings() {
        let connection = store_with_entries(&["a", "b", "c"]);
        connection
            .execute_batch(
                "CREATE TABLE embeddings (id TEXT PRIMARY KEY, entry_id TEXT NOT NULL, embedding BLOB NOT NULL);",
            )
            .expect("embeddings table should be created");
        let valid = encode_embedding_blob(&[0.25_f32; EMBEDDING_SIZE]);
        let truncated = encode_embedding_blob(&[0.25_f32; 8]);
        for (id, entry_id, blob) in [("e1", "a", valid), ("e2", "c", truncated)] {
            connection
                .execute(
                    "INSERT INTO embeddings(id, entry_id, embedding) VALUES(?1, ?2, ?3)",
                    rusqlite::params![id, entry_id, blob],
                )
                .expect("embedding insert should succeed");
        }

        let summary = summarize_store(&connection).expect("summary should succeed");
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.embeddings, 2);
        assert_eq!(summary.entries_without_embedding, 1);
        assert_eq!(summary.malformed_embeddings, 1);
    }
}
