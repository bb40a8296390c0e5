//! Ledger manifest export (JSON).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use flowlab_core::domain::EnrichedLedger;
use flowlab_core::summary::ledger_status;

pub const SCHEMA_VERSION: u32 = 1;

/// Describes one emitted ledger. Carries no wall-clock time, so identical
/// inputs produce an identical manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerManifest {
    pub schema_version: u32,
    /// BLAKE3 of the ledger CSV bytes, hex.
    pub ledger_hash: String,
    pub rows: usize,
    pub entities: usize,
    pub dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub windows: Vec<usize>,
}

impl LedgerManifest {
    pub fn describe(ledger: &EnrichedLedger, ledger_csv: &[u8]) -> Self {
        let status = ledger_status(ledger.rows().iter().map(|r| &r.record));
        Self {
            schema_version: SCHEMA_VERSION,
            ledger_hash: blake3::hash(ledger_csv).to_hex().to_string(),
            rows: status.rows,
            entities: status.entities,
            dates: status.dates,
            first_date: status.first_date,
            last_date: status.last_date,
            windows: ledger.windows().as_slice().to_vec(),
        }
    }
}

pub fn render_manifest(manifest: &LedgerManifest) -> Result<Vec<u8>> {
    let mut json =
        serde_json::to_vec_pretty(manifest).context("Failed to serialize ledger manifest")?;
    json.push(b'\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlab_core::domain::DailyRecord;
    use flowlab_core::indicators::{enrich, WindowSet};
    use flowlab_core::ledger::Ledger;

    #[test]
    fn manifest_describes_ledger() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 10, d).unwrap();
        let ledger = Ledger::from_records(vec![
            DailyRecord::new("A", day(8), 1.0, 0.0),
            DailyRecord::new("B", day(9), 1.0, 0.0),
        ])
        .unwrap();
        let enriched = enrich(&ledger, &WindowSet::default());
        let manifest = LedgerManifest::describe(&enriched, b"csv bytes");

        assert_eq!(manifest.rows, 2);
        assert_eq!(manifest.entities, 2);
        assert_eq!(manifest.first_date, Some(day(8)));
        assert_eq!(manifest.windows, vec![5, 10, 20]);
        assert_eq!(manifest.ledger_hash, blake3::hash(b"csv bytes").to_hex().to_string());

        let json = render_manifest(&manifest).unwrap();
        let back: LedgerManifest = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, manifest);
    }
}
