//! Ledger accumulation with overwrite-by-date semantics.
//!
//! For every trade date carried by the incoming snapshots, all existing rows on
//! that date are dropped before the new rows are added. Re-ingesting the same
//! export therefore replaces identical data with itself.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::{Ledger, LedgerError, MissingPolicy};
use crate::snapshot::Snapshot;

/// Result of one merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub ledger: Ledger,
    /// Existing rows removed because their date was re-ingested.
    pub replaced_rows: usize,
    /// Rows contributed by the snapshots.
    pub appended_rows: usize,
    /// Distinct dates taken from the snapshots, ascending.
    pub dates: Vec<NaiveDate>,
    /// Dates supplied by more than one snapshot; the last one won.
    pub superseded: Vec<NaiveDate>,
}

impl MergeOutcome {
    /// True when nothing new reached the ledger.
    pub fn is_noop(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Merge `snapshots` into `existing`, returning a new ledger.
///
/// Snapshots are applied in order; when two carry the same date the later one
/// replaces the earlier. With no snapshots the existing ledger is returned
/// unchanged. `policy` is applied to every row of the merged result.
pub fn merge(
    existing: &Ledger,
    snapshots: &[Snapshot],
    policy: MissingPolicy,
) -> Result<MergeOutcome, LedgerError> {
    if snapshots.is_empty() {
        return Ok(MergeOutcome {
            ledger: existing.clone(),
            replaced_rows: 0,
            appended_rows: 0,
            dates: Vec::new(),
            superseded: Vec::new(),
        });
    }

    let mut by_date: BTreeMap<NaiveDate, &Snapshot> = BTreeMap::new();
    let mut superseded = Vec::new();
    for snapshot in snapshots {
        if by_date.insert(snapshot.trade_date(), snapshot).is_some() {
            superseded.push(snapshot.trade_date());
        }
    }
    superseded.sort_unstable();
    superseded.dedup();

    let (kept, replaced): (Vec<_>, Vec<_>) = existing
        .records()
        .iter()
        .partition(|r| !by_date.contains_key(&r.trade_date));

    let incoming: Vec<_> = by_date
        .values()
        .flat_map(|s| s.records().iter())
        .cloned()
        .collect();
    let appended_rows = incoming.len();

    let merged = kept
        .into_iter()
        .cloned()
        .chain(incoming)
        .map(|r| policy.apply(r))
        .collect();

    Ok(MergeOutcome {
        ledger: Ledger::from_records(merged)?,
        replaced_rows: replaced.len(),
        appended_rows,
        dates: by_date.keys().copied().collect(),
        superseded,
    })
}
