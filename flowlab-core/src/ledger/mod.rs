//! The historical ledger and its accumulation rules.
//!
//! Invariants held by every `Ledger` value:
//! - at most one record per (entity, date)
//! - records sorted by (entity, date)
//!
//! Both are checked on construction; a violation is a [`LedgerError`], never
//! silently repaired.

pub mod canonicalize;
pub mod merge;

pub use canonicalize::{AnomalyReport, AnomalyType, Canonicalizer, Severity};
pub use merge::{merge, MergeOutcome};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::DailyRecord;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("duplicate ledger row for entity '{entity}' on {date}")]
    DuplicateKey { entity: String, date: NaiveDate },

    #[error("ledger row on {date} has an empty entity id")]
    EmptyEntity { date: NaiveDate },
}

/// What to do with missing amounts once they reach the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Replace each missing buy/sell/net with zero, field by field.
    #[default]
    ZeroFill,
    /// Keep missing values; any indicator window touching one has no value.
    Propagate,
}

impl MissingPolicy {
    pub fn apply(self, mut record: DailyRecord) -> DailyRecord {
        if self == MissingPolicy::ZeroFill {
            for v in [
                &mut record.buy_amount,
                &mut record.sell_amount,
                &mut record.net_amount,
            ] {
                if v.is_nan() {
                    *v = 0.0;
                }
            }
        }
        record
    }
}

/// Deduplicated accumulation of daily snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Vec<DailyRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary-order records, enforcing the ledger invariants.
    pub fn from_records(mut records: Vec<DailyRecord>) -> Result<Self, LedgerError> {
        if let Some(r) = records.iter().find(|r| r.entity_id.trim().is_empty()) {
            return Err(LedgerError::EmptyEntity { date: r.trade_date });
        }
        Canonicalizer::canonicalize(&mut records);
        if let Some((entity, date)) = Canonicalizer::find_duplicate(&records) {
            return Err(LedgerError::DuplicateKey { entity, date });
        }
        Ok(Self { records })
    }

    /// Records sorted by (entity, date).
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DailyRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, entity_id: &str, date: NaiveDate) -> Option<&DailyRecord> {
        self.records
            .binary_search_by(|r| r.key().cmp(&(entity_id, date)))
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records.iter().map(|r| r.trade_date).collect()
    }

    pub fn entities(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.entity_id.as_str()).collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.trade_date).min()?;
        let last = self.records.iter().map(|r| r.trade_date).max()?;
        Some((first, last))
    }
}
