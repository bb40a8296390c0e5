//! Rolling-window indicators over each entity's net-flow history.
//!
//! Indicators are pure functions: a chronological series in, a series of the
//! same length out. The engine recomputes every column from the full ledger on
//! each run, so a retroactive overwrite of an old date is always reflected.

pub mod rolling_mean;

pub use rolling_mean::RollingMean;

use serde::{Deserialize, Serialize};

use crate::domain::{EnrichedLedger, EnrichedRow};
use crate::ledger::Ledger;

/// Windows used when nothing else is configured.
pub const DEFAULT_WINDOWS: [usize; 3] = [5, 10, 20];

/// Trait for per-entity series indicators.
///
/// The first `lookback()` values are always `None`. No value at position `t`
/// may depend on observations after `t`.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "MA20").
    fn name(&self) -> &str;

    /// Observations needed before the first defined value, minus one.
    fn lookback(&self) -> usize;

    /// Compute over a full chronological series.
    fn compute(&self, series: &[f64]) -> Vec<Option<f64>>;
}

/// Validated, ascending, duplicate-free set of window sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct WindowSet(Vec<usize>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window sizes must be >= 1")]
    Zero,
}

impl WindowSet {
    pub fn new(windows: impl IntoIterator<Item = usize>) -> Result<Self, WindowError> {
        let mut windows: Vec<usize> = windows.into_iter().collect();
        if windows.contains(&0) {
            return Err(WindowError::Zero);
        }
        windows.sort_unstable();
        windows.dedup();
        Ok(Self(windows))
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slot index of `window` within enriched rows.
    pub fn position(&self, window: usize) -> Option<usize> {
        self.0.binary_search(&window).ok()
    }

    pub fn column_name(window: usize) -> String {
        format!("MA{window}")
    }
}

impl Default for WindowSet {
    fn default() -> Self {
        Self(DEFAULT_WINDOWS.to_vec())
    }
}

impl TryFrom<Vec<usize>> for WindowSet {
    type Error = WindowError;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WindowSet> for Vec<usize> {
    fn from(value: WindowSet) -> Self {
        value.0
    }
}

/// Compute every configured moving average for every entity.
///
/// Relies on the ledger invariant: rows sorted by (entity, date), one per pair,
/// so each entity's history is a contiguous chronological run.
pub fn enrich(ledger: &Ledger, windows: &WindowSet) -> EnrichedLedger {
    let indicators: Vec<RollingMean> = windows.iter().map(RollingMean::new).collect();
    let records = ledger.records();
    let mut rows = Vec::with_capacity(records.len());

    let mut start = 0;
    while start < records.len() {
        let entity = &records[start].entity_id;
        let end = start
            + records[start..]
                .iter()
                .take_while(|r| &r.entity_id == entity)
                .count();
        let group = &records[start..end];
        start = end;

        let series: Vec<f64> = group.iter().map(|r| r.net_amount).collect();
        let columns: Vec<Vec<Option<f64>>> =
            indicators.iter().map(|ind| ind.compute(&series)).collect();

        for (i, record) in group.iter().enumerate() {
            rows.push(EnrichedRow {
                record: record.clone(),
                averages: columns.iter().map(|col| col[i]).collect(),
            });
        }
    }

    EnrichedLedger::new(windows.clone(), rows)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyRecord;
    use chrono::NaiveDate;

    fn rec(entity: &str, day: u32, net: f64) -> DailyRecord {
        let date = NaiveDate::from_ymd_opt(2024, 10, day).unwrap();
        DailyRecord::new(entity, date, net.max(0.0), (-net).max(0.0))
    }

    #[test]
    fn window_set_sorts_and_dedups() {
        let ws = WindowSet::new([20, 5, 10, 5]).unwrap();
        assert_eq!(ws.as_slice(), &[5, 10, 20]);
        assert_eq!(ws.position(10), Some(1));
        assert_eq!(ws.position(7), None);
    }

    #[test]
    fn window_set_rejects_zero() {
        assert_eq!(WindowSet::new([0, 5]), Err(WindowError::Zero));
    }

    #[test]
    fn entities_are_computed_independently() {
        let mut records = Vec::new();
        for d in 1..=3 {
            records.push(rec("A", d, d as f64));
            records.push(rec("B", d, 100.0));
        }
        let ledger = Ledger::from_records(records).unwrap();
        let windows = WindowSet::new([2]).unwrap();
        let enriched = enrich(&ledger, &windows);

        let a = enriched.entity_rows("A");
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].averages, vec![None]);
        assert_eq!(a[1].averages, vec![Some(1.5)]);
        assert_eq!(a[2].averages, vec![Some(2.5)]);

        let b = enriched.entity_rows("B");
        assert_eq!(b[1].averages, vec![Some(100.0)]);
    }

    #[test]
    fn short_history_never_gets_long_windows() {
        let records = (1..=4).map(|d| rec("A", d, 10.0)).collect();
        let ledger = Ledger::from_records(records).unwrap();
        let enriched = enrich(&ledger, &WindowSet::default());
        for row in enriched.rows() {
            assert_eq!(enriched.average(row, 5), None);
            assert_eq!(enriched.average(row, 20), None);
        }
    }
}
