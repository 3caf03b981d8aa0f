use std::fs::File;
use std::io::{BufReader, Read};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::VerifyArgs;
use crate::commands::import::RecordReader;
use crate::error::ImportError;
use crate::model::{VerifyMismatch, VerifyReport};
use crate::util::{utc_compact_string, utc_string, write_json_pretty};
use crate::vector::{EMBEDDING_SIZE, parse_value, render_value, split_vector_tokens};

#[derive(Debug, Default)]
pub struct VerifyOutcome {
    pub rows_inspected: usize,
    pub values_checked: usize,
    pub mismatches: Vec<VerifyMismatch>,
}

/// Read-only sanity check of the vector column: every token must parse, and
/// tokens whose shortest f32 rendering differs are reported.
pub fn run(args: VerifyArgs) -> Result<()> {
    let generated = Utc::now();
    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join(format!("verify_{}.json", utc_compact_string(generated)))
    });

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open input: {}", args.input.display()))?;
    let reader = RecordReader::new(BufReader::new(file))
        .with_context(|| format!("unable to parse {} as CSV", args.input.display()))?;

    let outcome = verify_records(reader, args.max_rows)?;
    if !outcome.mismatches.is_empty() {
        warn!(
            mismatches = outcome.mismatches.len(),
            "some vector values do not re-serialize to their original text"
        );
    }

    let report = VerifyReport {
        manifest_version: 1,
        generated_at: utc_string(generated),
        input_path: args.input.display().to_string(),
        rows_inspected: outcome.rows_inspected,
        values_checked: outcome.values_checked,
        mismatches: outcome.mismatches,
    };
    write_json_pretty(&report_path, &report)?;

    info!(
        path = %report_path.display(),
        rows_inspected = report.rows_inspected,
        values_checked = report.values_checked,
        mismatches = report.mismatches.len(),
        "verify completed"
    );

    Ok(())
}

pub fn verify_records<R: Read>(reader: RecordReader<R>, max_rows: usize) -> Result<VerifyOutcome> {
    let mut outcome = VerifyOutcome::default();

    for record in reader.take(max_rows) {
        let record = record.context("unable to read CSV record")?;

        let tokens = split_vector_tokens(&record.embedding);
        if tokens.len() != EMBEDDING_SIZE {
            return Err(ImportError::VectorSizeMismatch {
                expected: EMBEDDING_SIZE,
                observed: tokens.len(),
            })
            .with_context(|| format!("invalid vector at line {}", record.line));
        }

        for (position, token) in tokens.iter().enumerate() {
            let value = parse_value(token, position)
                .with_context(|| format!("invalid vector at line {}", record.line))?;

            let converted = render_value(value);
            if converted != *token {
                outcome.mismatches.push(VerifyMismatch {
                    line: record.line,
                    position,
                    original: token.to_string(),
                    converted,
                });
            }
            outcome.values_checked += 1;
        }

        outcome.rows_inspected += 1;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn row_with(replacements: &[(usize, &str)]) -> String {
        let mut tokens = (0..EMBEDDING_SIZE)
            .map(|index| render_value(index as f32 / 512.0))
            .collect::<Vec<String>>();
        for (position, token) in replacements {
            tokens[*position] = token.to_string();
        }
        format!("\"[{}]\",https://v.example,body,kind\n", tokens.join(", "))
    }

    fn input(rows: &[String]) -> Cursor<String> {
        let mut text = String::from("embedding,url,content,type\n");
        for row in rows {
            text.push_str(row);
        }
        Cursor::new(text)
    }

    #[test]
    fn verify_reports_tokens_with_different_rendering() {
        let reader = RecordReader::new(input(&[row_with(&[(4, "1.50"), (9, "2e-3")])]))
            .expect("header should decode");

        let outcome = verify_records(reader, 10).expect("verify should succeed");
        assert_eq!(outcome.rows_inspected, 1);
        assert_eq!(outcome.values_checked, EMBEDDING_SIZE);
        assert_eq!(
            outcome.mismatches,
            vec![
                VerifyMismatch {
                    line: 2,
                    position: 4,
                    original: "1.50".to_string(),
                    converted: "1.5".to_string(),
                },
                VerifyMismatch {
                    line: 2,
                    position: 9,
                    original: "2e-3".to_string(),
                    converted: "0.002".to_string(),
                },
            ]
        );
    }

    #[test]
    fn verify_stops_after_max_rows() {
        let rows = (0..5).map(|_| row_with(&[])).collect::<Vec<String>>();
        let reader = RecordReader::new(input(&rows)).expect("header should decode");

        let outcome = verify_records(reader, 3).expect("verify should succeed");
        assert_eq!(outcome.rows_inspected, 3);
        assert!(outcome.mismatches.is_empty());
    }

    #[test]
    fn verify_fails_on_unparseable_value() {
        let reader = RecordReader::new(input(&[row_with(&[(12, "nope")])]))
            .expect("header should decode");

        let err = verify_records(reader, 10).expect_err("bad token should fail");
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::VectorValueParseError { position: 12, .. })
        ));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn verify_fails_on_wrong_vector_size() {
        let reader = RecordReader::new(input(&["\"[1, 2, 3]\",https://v.example,body,kind\n"
            .to_string()]))
        .expect("header should decode");

        let err = verify_records(reader, 10).expect_err("short vector should fail");
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::VectorSizeMismatch { observed: 3, .. })
        ));
    }
}
