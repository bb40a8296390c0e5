//! Column layout of the persisted ledger and summary tables.
//!
//! The header text is part of the contract with the downstream dashboard,
//! which reads these files by column name.

use crate::indicators::WindowSet;

pub const ENTITY: &str = "종목명";
pub const BUY: &str = "매수";
pub const SELL: &str = "매도";
pub const NET: &str = "순매수";
pub const DATE: &str = "날짜";

pub const SUMMARY_COUNT: &str = "행수";
pub const SUMMARY_FIRST: &str = "최초일";
pub const SUMMARY_LAST: &str = "최종일";

/// Expected schema for ledger tables.
pub struct LedgerSchema;

impl LedgerSchema {
    /// Base columns every ledger must carry.
    pub fn base_columns() -> [&'static str; 5] {
        [ENTITY, BUY, SELL, NET, DATE]
    }

    /// Full header for a ledger enriched with `windows`.
    pub fn columns(windows: &WindowSet) -> Vec<String> {
        Self::base_columns()
            .iter()
            .map(|c| c.to_string())
            .chain(windows.iter().map(WindowSet::column_name))
            .collect()
    }

    /// Summary table header.
    pub fn summary_columns() -> [&'static str; 4] {
        [ENTITY, SUMMARY_COUNT, SUMMARY_FIRST, SUMMARY_LAST]
    }

    /// Check that `header` carries every base column; extra columns are fine.
    pub fn validate<S: AsRef<str>>(header: &[S]) -> Result<(), SchemaError> {
        for col in Self::base_columns() {
            if !header.iter().any(|h| h.as_ref().trim() == col) {
                return Err(SchemaError::MissingColumn(col.to_string()));
            }
        }
        Ok(())
    }

    /// Position of `column` in `header`.
    pub fn position<S: AsRef<str>>(header: &[S], column: &str) -> Result<usize, SchemaError> {
        header
            .iter()
            .position(|h| h.as_ref().trim() == column)
            .ok_or_else(|| SchemaError::MissingColumn(column.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}
