use chrono::{DateTime, Utc};

use crate::error::ImportError;
use crate::model::EmbeddingDraft;
use crate::vector::parse_embedding;

use super::reader::RawRecord;

/// Builds the in-memory embedding for one row. `created_at` is the run start
/// time and is shared by every row of the run.
pub fn convert_record(
    record: &RawRecord,
    created_at: DateTime<Utc>,
) -> Result<EmbeddingDraft, ImportError> {
    let embedding = parse_embedding(&record.embedding)?;

    Ok(EmbeddingDraft {
        embedding,
        kind: record.kind.clone(),
        content: record.content.clone(),
        created_at,
    })
}
