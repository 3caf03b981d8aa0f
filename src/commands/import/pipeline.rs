use std::io::Read;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ImportError;
use crate::model::ImportCounts;

use super::convert::convert_record;
use super::gateway::{EmbeddingStore, EntryLookup, ExistenceCheck, InsertOutcome};
use super::reader::{RawRecord, RecordReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EntryNotFound { url: String },
    EmbeddingExists { entry_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted {
        id: Uuid,
        entry_id: Uuid,
        collision_absorbed: bool,
        existence_check_failed: bool,
    },
    Skipped(SkipReason),
}

/// Runs one row through resolve, check, convert and insert. Skips come back
/// as `Ok`; anything returned as `Err` must end the run.
pub fn process_row<S: EmbeddingStore>(
    store: &S,
    record: &RawRecord,
    created_at: DateTime<Utc>,
) -> Result<RowOutcome, ImportError> {
    let entry_id = match store.resolve_entry_by_url(&record.url)? {
        EntryLookup::Found(entry_id) => entry_id,
        EntryLookup::NotFound => {
            return Ok(RowOutcome::Skipped(SkipReason::EntryNotFound {
                url: record.url.clone(),
            }));
        }
    };

    // Fail-open: a failed lookup proceeds as if no embedding existed.
    let existence_check_failed = match store.embedding_exists(entry_id) {
        ExistenceCheck::Present => {
            return Ok(RowOutcome::Skipped(SkipReason::EmbeddingExists { entry_id }));
        }
        ExistenceCheck::Absent => false,
        ExistenceCheck::LookupFailed(err) => {
            warn!(
                line = record.line,
                entry_id = %entry_id,
                error = %err,
                "existing embedding check failed, treating entry as unembedded"
            );
            true
        }
    };

    let draft = convert_record(record, created_at)?;
    let id = Uuid::new_v4();
    let outcome = store.insert(&draft.attach(entry_id, id))?;

    Ok(RowOutcome::Inserted {
        id,
        entry_id,
        collision_absorbed: outcome == InsertOutcome::AlreadyPresent,
        existence_check_failed,
    })
}

/// Drains `reader` one row at a time, stopping at the first fatal error.
pub fn import_records<R: Read, S: EmbeddingStore>(
    reader: &mut RecordReader<R>,
    store: &S,
    created_at: DateTime<Utc>,
) -> Result<ImportCounts> {
    let mut counts = ImportCounts::default();

    for record in reader {
        let record = record.context("unable to read CSV record")?;
        counts.rows_read += 1;

        let outcome = process_row(store, &record, created_at)
            .with_context(|| format!("failed to import row at line {}", record.line))?;

        match outcome {
            RowOutcome::Inserted {
                id,
                entry_id,
                collision_absorbed,
                existence_check_failed,
            } => {
                debug!(line = record.line, id = %id, entry_id = %entry_id, "embedding inserted");
                if collision_absorbed {
                    counts.id_collisions_absorbed += 1;
                } else {
                    counts.inserted += 1;
                }
                if existence_check_failed {
                    counts.existence_check_failures += 1;
                }
            }
            RowOutcome::Skipped(SkipReason::EntryNotFound { url }) => {
                info!(line = record.line, url = %url, "record url not found, skipping row");
                counts.skipped_entry_not_found += 1;
            }
            RowOutcome::Skipped(SkipReason::EmbeddingExists { entry_id }) => {
                info!(line = record.line, entry_id = %entry_id, "embedding exists, skipping row");
                counts.skipped_embedding_exists += 1;
            }
        }
    }

    Ok(counts)
}
