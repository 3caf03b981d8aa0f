use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::ImportError;
use crate::model::EmbeddingRecord;
use crate::vector::encode_embedding_blob;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLookup {
    Found(Uuid),
    NotFound,
}

/// Result of the pre-insert existence check. A failed lookup is kept apart
/// from a confirmed absence so the caller decides how to treat it.
#[derive(Debug)]
pub enum ExistenceCheck {
    Present,
    Absent,
    LookupFailed(ImportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Operations the import pipeline needs from the backing store.
pub trait EmbeddingStore {
    fn resolve_entry_by_url(&self, url: &str) -> Result<EntryLookup, ImportError>;

    fn embedding_exists(&self, entry_id: Uuid) -> ExistenceCheck;

    /// Inserts `record`, doing nothing when its id is already taken.
    fn insert(&self, record: &EmbeddingRecord) -> Result<InsertOutcome, ImportError>;
}

pub struct SqliteStore<'conn> {
    connection: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(connection: &'conn Connection) -> Self {
        Self { connection }
    }
}

impl EmbeddingStore for SqliteStore<'_> {
    fn resolve_entry_by_url(&self, url: &str) -> Result<EntryLookup, ImportError> {
        let raw_id = self
            .connection
            .query_row(
                "
                SELECT id
                FROM content_entries
                WHERE json_extract(entry_data, '$.url') = ?1
                LIMIT 1
                ",
                [url],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(ImportError::store("find entry by url"))?;

        let Some(raw_id) = raw_id else {
            return Ok(EntryLookup::NotFound);
        };

        let entry_id = Uuid::parse_str(&raw_id)
            .map_err(|source| ImportError::InvalidEntryId { value: raw_id, source })?;
        Ok(EntryLookup::Found(entry_id))
    }

    fn embedding_exists(&self, entry_id: Uuid) -> ExistenceCheck {
        let found = self
            .connection
            .query_row(
                "SELECT 1 FROM embeddings WHERE entry_id = ?1 LIMIT 1",
                [entry_id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional();

        match found {
            Ok(Some(_)) => ExistenceCheck::Present,
            Ok(None) => ExistenceCheck::Absent,
            Err(source) => ExistenceCheck::LookupFailed(ImportError::Store {
                operation: "check existing embedding",
                source,
            }),
        }
    }

    fn insert(&self, record: &EmbeddingRecord) -> Result<InsertOutcome, ImportError> {
        let changed = self
            .connection
            .execute(
                "
                INSERT INTO embeddings(id, entry_id, embedding, embedding_dim, type, content, created_at)
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO NOTHING
                ",
                params![
                    record.id.to_string(),
                    record.entry_id.to_string(),
                    encode_embedding_blob(&record.embedding),
                    record.embedding.len() as i64,
                    record.kind,
                    record.content,
                    record.created_at,
                ],
            )
            .map_err(ImportError::store("insert embedding"))?;

        if changed == 0 {
            Ok(InsertOutcome::AlreadyPresent)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}
