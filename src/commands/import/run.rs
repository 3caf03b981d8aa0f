use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::cli::{ImportArgs, resolve_db_path};
use crate::model::ImportRunManifest;
use crate::util::{HashingReader, utc_compact_string, write_json_pretty};
use crate::vector::EMBEDDING_SIZE;

use super::db_setup::{ensure_content_table, ensure_embedding_schema, open_store_connection};
use super::gateway::SqliteStore;
use super::pipeline::import_records;
use super::reader::RecordReader;

pub fn run(args: ImportArgs) -> Result<()> {
    let started_at = Utc::now();
    let run_id = format!("import-{}", utc_compact_string(started_at));

    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_ref());
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join(format!("import_run_{}.json", utc_compact_string(started_at)))
    });

    info!(
        run_id = %run_id,
        input = %args.input.display(),
        db = %db_path.display(),
        "starting import"
    );

    let connection = open_store_connection(&db_path)?;
    ensure_content_table(&connection).context("content store is not ready")?;
    ensure_embedding_schema(&connection).context("content store is not ready")?;

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open input: {}", args.input.display()))?;
    let mut reader = RecordReader::new(HashingReader::new(BufReader::new(file)))
        .with_context(|| format!("unable to parse {} as CSV", args.input.display()))?;
    info!(columns = ?reader.columns(), "decoded CSV header");

    let counts = import_records(&mut reader, &SqliteStore::new(&connection), started_at)?;
    let input_sha256 = reader.get_ref().hex_digest();

    let manifest = ImportRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        completed_at: Utc::now(),
        input_path: args.input.display().to_string(),
        input_sha256,
        db_path: db_path.display().to_string(),
        embedding_size: EMBEDDING_SIZE,
        counts,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote import run manifest");
    info!(
        rows_read = manifest.counts.rows_read,
        inserted = manifest.counts.inserted,
        skipped_entry_not_found = manifest.counts.skipped_entry_not_found,
        skipped_embedding_exists = manifest.counts.skipped_embedding_exists,
        existence_check_failures = manifest.counts.existence_check_failures,
        "import completed"
    );
    println!("processing complete");

    Ok(())
}
