//! Per-file ingestion: one raw export in, one tagged outcome out.
//!
//! A bad file never aborts a run. Every recoverable problem is reported as
//! [`FileOutcome::Skipped`] with a [`SkipReason`]; only a header mismatch under
//! strict column validation is a hard [`ParseError`].

use std::fs;
use std::path::Path;

use crate::data::decode::decode_bytes;
use crate::data::source::{trade_date_from_stem, SourceFile};
use crate::data::table::{ColumnMapping, RawTable};
use crate::snapshot::Snapshot;

/// Result of ingesting one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Parsed(Snapshot),
    Skipped(SkipReason),
}

impl FileOutcome {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            FileOutcome::Parsed(s) => Some(s),
            FileOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped(_))
    }
}

/// Why a file contributed nothing to the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("cannot derive trade date from '{0}'")]
    UnparseableDate(String),

    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("no table found")]
    NoTable,

    #[error("too few columns ({found}, need {required})")]
    TooFewColumns { found: usize, required: usize },

    #[error("no numeric buy/sell values")]
    NoNumericData,

    #[error("no rows with a non-empty entity")]
    EmptyEntities,
}

/// Fatal ingestion errors.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{file}: header at column {position} is '{found}', expected '{expected}'")]
    HeaderMismatch {
        file: String,
        position: usize,
        expected: String,
        found: String,
    },
}

/// Turns raw daily exports into snapshots.
#[derive(Debug, Clone)]
pub struct SourceIngestor {
    mapping: ColumnMapping,
    prefix: String,
}

impl SourceIngestor {
    pub fn new(mapping: ColumnMapping, prefix: impl Into<String>) -> Self {
        Self {
            mapping,
            prefix: prefix.into(),
        }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Ingest a file from disk.
    pub fn ingest_file(&self, source: &SourceFile) -> Result<FileOutcome, ParseError> {
        let Some(trade_date) = trade_date_from_stem(&source.stem, &self.prefix) else {
            return Ok(FileOutcome::Skipped(SkipReason::UnparseableDate(
                source.stem.clone(),
            )));
        };

        let bytes = match fs::read(&source.path) {
            Ok(b) => b,
            Err(e) => return Ok(FileOutcome::Skipped(SkipReason::Unreadable(e.to_string()))),
        };

        self.ingest_content(&source.name, trade_date, &bytes)
    }

    /// Ingest in-memory content named like a file (`re20241009.xls`).
    pub fn ingest_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<FileOutcome, ParseError> {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match trade_date_from_stem(&stem, &self.prefix) {
            Some(date) => self.ingest_content(file_name, date, bytes),
            None => Ok(FileOutcome::Skipped(SkipReason::UnparseableDate(stem))),
        }
    }

    fn ingest_content(
        &self,
        file_name: &str,
        trade_date: chrono::NaiveDate,
        bytes: &[u8],
    ) -> Result<FileOutcome, ParseError> {
        let text = decode_bytes(bytes);
        let Some(table) = RawTable::from_html(&text) else {
            return Ok(FileOutcome::Skipped(SkipReason::NoTable));
        };

        let required = self.mapping.required_columns();
        let found = table.column_count();
        if found < required {
            return Ok(FileOutcome::Skipped(SkipReason::TooFewColumns { found, required }));
        }

        if let Some((position, expected, found)) = self.mapping.check_header(table.header()) {
            return Err(ParseError::HeaderMismatch {
                file: file_name.to_string(),
                position,
                expected,
                found,
            });
        }

        let rows = table.extract(&self.mapping);
        if rows.iter().all(|r| r.buy.is_nan() && r.sell.is_nan()) {
            return Ok(FileOutcome::Skipped(SkipReason::NoNumericData));
        }

        let snapshot = Snapshot::build(trade_date, rows);
        if snapshot.is_empty() {
            return Ok(FileOutcome::Skipped(SkipReason::EmptyEntities));
        }

        Ok(FileOutcome::Parsed(snapshot))
    }
}

impl Default for SourceIngestor {
    fn default() -> Self {
        Self::new(ColumnMapping::default(), "re")
    }
}
