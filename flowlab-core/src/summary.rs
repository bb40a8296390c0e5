//! Derived summaries: per-entity coverage, the distinct entity list, and
//! overall ledger status. Always regenerated in full from the ledger.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::DailyRecord;

/// Observation count and date span of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageRow {
    pub entity_id: String,
    pub count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// One row per entity, sorted by count descending then entity ascending.
pub fn coverage<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Vec<CoverageRow> {
    let mut by_entity: BTreeMap<&str, CoverageRow> = BTreeMap::new();
    for r in records {
        by_entity
            .entry(r.entity_id.as_str())
            .and_modify(|row| {
                row.count += 1;
                row.first_date = row.first_date.min(r.trade_date);
                row.last_date = row.last_date.max(r.trade_date);
            })
            .or_insert_with(|| CoverageRow {
                entity_id: r.entity_id.clone(),
                count: 1,
                first_date: r.trade_date,
                last_date: r.trade_date,
            });
    }

    let mut rows: Vec<CoverageRow> = by_entity.into_values().collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.entity_id.cmp(&b.entity_id)));
    rows
}

/// Distinct entity ids, case preserved, sorted.
pub fn entity_list<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Vec<String> {
    records
        .into_iter()
        .map(|r| r.entity_id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Headline numbers for a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStatus {
    pub rows: usize,
    pub entities: usize,
    pub dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn ledger_status<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> LedgerStatus {
    let mut rows = 0;
    let mut entities = BTreeSet::new();
    let mut dates = BTreeSet::new();
    for r in records {
        rows += 1;
        entities.insert(r.entity_id.as_str());
        dates.insert(r.trade_date);
    }
    LedgerStatus {
        rows,
        entities: entities.len(),
        dates: dates.len(),
        first_date: dates.first().copied(),
        last_date: dates.last().copied(),
    }
}
