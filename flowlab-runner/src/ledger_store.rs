//! Persisted ledger format: read the previous run's ledger, encode the next.
//!
//! The ledger file doubles as the enriched output: indicator columns are
//! written for the dashboard and ignored on load, since they are always
//! recomputed from the full history.

use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use flowlab_core::data::schema::{BUY, DATE, ENTITY, NET, SELL};
use flowlab_core::data::table::clean_amount;
use flowlab_core::data::{LedgerSchema, SchemaError};
use flowlab_core::domain::{DailyRecord, EnrichedLedger};
use flowlab_core::ledger::{Ledger, LedgerError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ledger CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("ledger header: {0}")]
    Schema(#[from] SchemaError),

    #[error("ledger line {line}: unparseable date '{value}'")]
    BadDate { line: u64, value: String },

    #[error("ledger line {line}: empty entity id")]
    EmptyEntity { line: u64 },

    #[error("ledger content: {0}")]
    Ledger(#[from] LedgerError),
}

/// Load the ledger at `path`. `Ok(None)` when no ledger exists yet.
pub fn read_ledger(path: &Path) -> Result<Option<Ledger>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_ledger(&bytes).map(Some)
}

/// Parse ledger CSV bytes (optional UTF-8 BOM).
pub fn parse_ledger(bytes: &[u8]) -> Result<Ledger, StoreError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    LedgerSchema::validate(&header)?;
    let entity_col = LedgerSchema::position(&header, ENTITY)?;
    let buy_col = LedgerSchema::position(&header, BUY)?;
    let sell_col = LedgerSchema::position(&header, SELL)?;
    let net_col = LedgerSchema::position(&header, NET)?;
    let date_col = LedgerSchema::position(&header, DATE)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let cell = |i: usize| row.get(i).unwrap_or("");

        let entity = cell(entity_col).trim();
        if entity.is_empty() {
            return Err(StoreError::EmptyEntity { line });
        }
        let raw_date = cell(date_col).trim();
        let trade_date = parse_date(raw_date).ok_or_else(|| StoreError::BadDate {
            line,
            value: raw_date.to_string(),
        })?;

        records.push(DailyRecord {
            entity_id: entity.to_string(),
            trade_date,
            buy_amount: clean_amount(cell(buy_col)),
            sell_amount: clean_amount(cell(sell_col)),
            net_amount: clean_amount(cell(net_col)),
        });
    }

    Ok(Ledger::from_records(records)?)
}

/// `YYYY-MM-DD`, or the legacy `YYYY-MM-DD HH:MM:SS` form.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Encode the enriched ledger as BOM-prefixed UTF-8 CSV, rows by (date, entity).
pub fn encode_ledger_csv(ledger: &EnrichedLedger) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(LedgerSchema::columns(ledger.windows()))?;

    for row in ledger.rows_by_date() {
        let r = &row.record;
        let mut fields = vec![
            r.entity_id.clone(),
            format_amount(r.buy_amount),
            format_amount(r.sell_amount),
            format_amount(r.net_amount),
            r.trade_date.format("%Y-%m-%d").to_string(),
        ];
        fields.extend(
            row.averages
                .iter()
                .map(|v| v.map(format_amount).unwrap_or_default()),
        );
        writer.write_record(&fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::Csv(csv::Error::from(e.into_error())))
}

/// Shortest round-trip decimal; missing is an empty cell.
pub fn format_amount(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}
