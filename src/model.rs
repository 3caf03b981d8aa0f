use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One row of the `embeddings` table.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub embedding: Vec<f32>,
    /// Provider, model and kind of content, e.g. `azure_ada2_title_summary`.
    pub kind: String,
    /// Original content the embedding was generated from.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A converted CSV row that has not been attached to an entry yet.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingDraft {
    pub embedding: Vec<f32>,
    pub kind: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl EmbeddingDraft {
    pub fn attach(self, entry_id: Uuid, id: Uuid) -> EmbeddingRecord {
        EmbeddingRecord {
            id,
            entry_id,
            embedding: self.embedding,
            kind: self.kind,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub rows_read: usize,
    pub inserted: usize,
    pub skipped_entry_not_found: usize,
    pub skipped_embedding_exists: usize,
    pub existence_check_failures: usize,
    pub id_collisions_absorbed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub input_path: String,
    pub input_sha256: String,
    pub db_path: String,
    pub embedding_size: usize,
    pub counts: ImportCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyMismatch {
    pub line: u64,
    pub position: usize,
    pub original: String,
    pub converted: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub rows_inspected: usize,
    pub values_checked: usize,
    pub mismatches: Vec<VerifyMismatch>,
}
