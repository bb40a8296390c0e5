//! Ledger rows carrying rolling-window indicator values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::DailyRecord;
use crate::indicators::WindowSet;

/// A ledger row plus one moving-average slot per configured window.
///
/// `None` means insufficient history (or a missing value inside the window),
/// which is not the same thing as a zero average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub record: DailyRecord,
    pub averages: Vec<Option<f64>>,
}

/// The enriched ledger, sorted by (entity, date).
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedLedger {
    windows: WindowSet,
    rows: Vec<EnrichedRow>,
}

impl EnrichedLedger {
    pub(crate) fn new(windows: WindowSet, rows: Vec<EnrichedRow>) -> Self {
        Self { windows, rows }
    }

    pub fn windows(&self) -> &WindowSet {
        &self.windows
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Moving average for `window` on `row`, if that window is configured and defined.
    pub fn average(&self, row: &EnrichedRow, window: usize) -> Option<f64> {
        let slot = self.windows.position(window)?;
        row.averages.get(slot).copied().flatten()
    }

    /// Rows in persistence order: (date, entity).
    pub fn rows_by_date(&self) -> Vec<&EnrichedRow> {
        let mut rows: Vec<&EnrichedRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            (a.record.trade_date, a.record.entity_id.as_str())
                .cmp(&(b.record.trade_date, b.record.entity_id.as_str()))
        });
        rows
    }

    /// Rows for one entity, in date order.
    pub fn entity_rows(&self, entity_id: &str) -> &[EnrichedRow] {
        let start = self
            .rows
            .partition_point(|r| r.record.entity_id.as_str() < entity_id);
        let end = self
            .rows
            .partition_point(|r| r.record.entity_id.as_str() <= entity_id);
        &self.rows[start..end]
    }

    /// Distinct trade dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.rows.iter().map(|r| r.record.trade_date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }
}
