use std::num::ParseFloatError;

use thiserror::Error;

/// Fatal conditions of an import run. Recoverable per-row skips are not
/// errors and never show up here.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("input has no header row")]
    MissingHeader,

    #[error("unable to parse input as CSV")]
    MalformedInput(#[source] CsvSyntaxError),

    #[error("header has {columns} columns, expected at least {expected}")]
    NarrowHeader { columns: usize, expected: usize },

    #[error("vector size not equal embedding size {expected}: got {observed}")]
    VectorSizeMismatch { expected: usize, observed: usize },

    #[error("error parsing vector value {token:?} at position {position}")]
    VectorValueParseError {
        position: usize,
        token: String,
        #[source]
        source: ValueError,
    },

    #[error("content entry id {value:?} is not a valid uuid")]
    InvalidEntryId {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("content entry table {table} is missing from the database")]
    MissingContentTable { table: &'static str },

    #[error("{operation} failed")]
    Store {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl ImportError {
    pub fn store(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Store { operation, source }
    }
}

#[derive(Debug, Error)]
pub enum CsvSyntaxError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("bare \" in non-quoted field at line {line}")]
    BareQuote { line: u64 },

    #[error("extraneous \" after quoted field at line {line}")]
    ExtraneousQuote { line: u64 },

    #[error("quoted field starting at line {line} is never closed")]
    UnterminatedQuote { line: u64 },
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error(transparent)]
    Syntax(#[from] ParseFloatError),

    #[error("value out of range for f32")]
    OutOfRange,
}
