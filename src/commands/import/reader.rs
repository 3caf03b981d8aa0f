use std::io::{self, Read};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::{CsvSyntaxError, ImportError};

const REQUIRED_COLUMNS: usize = 4;

/// A data row with its columns resolved by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub line: u64,
    pub embedding: String,
    pub url: String,
    pub content: String,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub embedding: usize,
    pub url: usize,
    pub content: usize,
    pub kind: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            embedding: 0,
            url: 1,
            content: 2,
            kind: 3,
        }
    }
}

impl ColumnMap {
    /// Uses the header's column names when all four are present and falls
    /// back to positional order otherwise.
    pub fn from_header(header: &StringRecord) -> Result<Self, ImportError> {
        if header.len() < REQUIRED_COLUMNS {
            return Err(ImportError::NarrowHeader {
                columns: header.len(),
                expected: REQUIRED_COLUMNS,
            });
        }

        let position = |name: &str| {
            header
                .iter()
                .position(|column| column.trim().eq_ignore_ascii_case(name))
        };

        match (
            position("embedding"),
            position("url"),
            position("content"),
            position("type"),
        ) {
            (Some(embedding), Some(url), Some(content), Some(kind)) => Ok(Self {
                embedding,
                url,
                content,
                kind,
            }),
            _ => Ok(Self::default()),
        }
    }

    fn decode(&self, record: &StringRecord) -> RawRecord {
        let field = |index: usize| record.get(index).unwrap_or_default().to_string();
        RawRecord {
            line: record.position().map(|pos| pos.line()).unwrap_or_default(),
            embedding: field(self.embedding),
            url: field(self.url),
            content: field(self.content),
            kind: field(self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteViolation {
    Bare { line: u64 },
    Extraneous { line: u64 },
    Unterminated { line: u64 },
}

impl QuoteViolation {
    fn line(self) -> u64 {
        match self {
            Self::Bare { line } | Self::Extraneous { line } | Self::Unterminated { line } => line,
        }
    }

    fn into_error(self) -> ImportError {
        let syntax = match self {
            Self::Bare { line } => CsvSyntaxError::BareQuote { line },
            Self::Extraneous { line } => CsvSyntaxError::ExtraneousQuote { line },
            Self::Unterminated { line } => CsvSyntaxError::UnterminatedQuote { line },
        };
        ImportError::MalformedInput(syntax)
    }
}

/// Scans the raw bytes handed to the CSV parser for quoting the parser
/// tolerates: a `"` inside an unquoted field, text after a closing quote,
/// and a quoted field still open at end of input. Only the first
/// violation is kept.
struct QuoteCheckedInput<R> {
    inner: R,
    state: QuoteState,
    line: u64,
    quote_opened_at: u64,
    violation: Option<QuoteViolation>,
}

impl<R> QuoteCheckedInput<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            state: QuoteState::FieldStart,
            line: 1,
            quote_opened_at: 1,
            violation: None,
        }
    }

    fn flag(&mut self, violation: QuoteViolation) {
        self.violation.get_or_insert(violation);
    }

    fn scan(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = match (self.state, byte) {
                (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
                (QuoteState::Quoted, _) => QuoteState::Quoted,
                (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
                (QuoteState::QuoteInQuoted, b'\r') => QuoteState::QuoteInQuoted,
                (QuoteState::FieldStart, b'"') => {
                    self.quote_opened_at = self.line;
                    QuoteState::Quoted
                }
                (_, b',' | b'\n') => QuoteState::FieldStart,
                (QuoteState::Unquoted, b'"') => {
                    self.flag(QuoteViolation::Bare { line: self.line });
                    QuoteState::Unquoted
                }
                (QuoteState::QuoteInQuoted, _) => {
                    self.flag(QuoteViolation::Extraneous { line: self.line });
                    QuoteState::Unquoted
                }
                (QuoteState::FieldStart | QuoteState::Unquoted, _) => QuoteState::Unquoted,
            };
            if byte == b'\n' {
                self.line += 1;
            }
        }
    }

    fn finish(&mut self) {
        if self.state == QuoteState::Quoted {
            self.flag(QuoteViolation::Unterminated {
                line: self.quote_opened_at,
            });
        }
    }

    /// First violation located on or before `line`.
    fn violation_through(&self, line: u64) -> Option<QuoteViolation> {
        self.violation.filter(|violation| violation.line() <= line)
    }
}

impl<R: Read> Read for QuoteCheckedInput<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        if count == 0 && !buf.is_empty() {
            self.finish();
        } else {
            self.scan(&buf[..count]);
        }
        Ok(count)
    }
}

/// Last physical line a record occupies; quoted fields may span lines.
fn record_end_line(record: &StringRecord) -> u64 {
    let start = record.position().map(|pos| pos.line()).unwrap_or(1);
    let embedded = record
        .iter()
        .map(|field| field.matches('\n').count() as u64)
        .sum::<u64>();
    start + embedded
}

/// Forward-only reader over the data rows of an embeddings CSV. The header
/// row is consumed on construction.
pub struct RecordReader<R: Read> {
    records: StringRecordsIntoIter<QuoteCheckedInput<R>>,
    columns: ColumnMap,
}

impl<R: Read> RecordReader<R> {
    pub fn new(input: R) -> Result<Self, ImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(QuoteCheckedInput::new(input));

        let header = reader
            .headers()
            .map_err(|err| ImportError::MalformedInput(err.into()))?
            .clone();
        if header.is_empty() {
            return Err(ImportError::MissingHeader);
        }
        if let Some(violation) = reader.get_ref().violation_through(record_end_line(&header)) {
            return Err(violation.into_error());
        }
        let columns = ColumnMap::from_header(&header)?;

        Ok(Self {
            records: reader.into_records(),
            columns,
        })
    }

    pub fn columns(&self) -> ColumnMap {
        self.columns
    }

    pub fn get_ref(&self) -> &R {
        &self.records.reader().get_ref().inner
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RawRecord, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(ImportError::MalformedInput(err.into()))),
        };

        let input = self.records.reader().get_ref();
        if let Some(violation) = input.violation_through(record_end_line(&record)) {
            return Some(Err(violation.into_error()));
        }

        Some(Ok(self.columns.decode(&record)))
    }
}
