//! Snapshot builder: parsed rows for one trade date → one record per entity.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::data::table::RawRow;
use crate::domain::DailyRecord;

/// All records observed for exactly one trade date, sorted by entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    trade_date: NaiveDate,
    records: Vec<DailyRecord>,
}

impl Snapshot {
    /// Attach `trade_date` to parsed rows and collapse duplicates.
    ///
    /// - Entities are trimmed; rows with an empty entity are dropped.
    /// - `net = buy - sell` per row, missing propagates.
    /// - Rows sharing an entity are summed. A missing value contributes nothing
    ///   to the sum; the sum stays missing only if every contribution is missing.
    pub fn build(trade_date: NaiveDate, rows: impl IntoIterator<Item = RawRow>) -> Self {
        let mut grouped: BTreeMap<String, (f64, f64, f64)> = BTreeMap::new();

        for row in rows {
            let entity = row.entity.trim();
            if entity.is_empty() {
                continue;
            }
            let net = row.buy - row.sell;
            grouped
                .entry(entity.to_string())
                .and_modify(|(buy, sell, acc_net)| {
                    *buy = sum_present(*buy, row.buy);
                    *sell = sum_present(*sell, row.sell);
                    *acc_net = sum_present(*acc_net, net);
                })
                .or_insert((row.buy, row.sell, net));
        }

        let records = grouped
            .into_iter()
            .map(|(entity_id, (buy, sell, net))| DailyRecord {
                entity_id,
                trade_date,
                buy_amount: buy,
                sell_amount: sell,
                net_amount: net,
            })
            .collect();

        Self {
            trade_date,
            records,
        }
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn sum_present(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a + b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 9).unwrap()
    }

    fn row(entity: &str, buy: f64, sell: f64) -> RawRow {
        RawRow {
            entity: entity.to_string(),
            buy,
            sell,
        }
    }

    #[test]
    fn computes_net_and_sorts_by_entity() {
        let snap = Snapshot::build(day(), vec![row("B", 20.0, 20.0), row("A", 100.0, 40.0)]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.records()[0].entity_id, "A");
        assert_eq!(snap.records()[0].net_amount, 60.0);
        assert_eq!(snap.records()[1].net_amount, 0.0);
        assert!(snap.records().iter().all(|r| r.trade_date == day()));
    }

    #[test]
    fn duplicates_are_summed() {
        let snap = Snapshot::build(day(), vec![row("A", 10.0, 5.0), row(" A ", 30.0, 1.0)]);
        assert_eq!(snap.len(), 1);
        let a = &snap.records()[0];
        assert_eq!(a.buy_amount, 40.0);
        assert_eq!(a.sell_amount, 6.0);
        assert_eq!(a.net_amount, 34.0);
    }

    #[test]
    fn empty_entities_are_dropped() {
        let snap = Snapshot::build(day(), vec![row("  ", 1.0, 1.0), row("", 2.0, 2.0)]);
        assert!(snap.is_empty());
    }

    #[test]
    fn missing_amount_propagates_for_single_row() {
        let snap = Snapshot::build(day(), vec![row("A", f64::NAN, 5.0)]);
        let a = &snap.records()[0];
        assert!(a.buy_amount.is_nan());
        assert_eq!(a.sell_amount, 5.0);
        assert!(a.net_amount.is_nan());
    }

    #[test]
    fn missing_amount_is_skipped_in_group_sum() {
        let snap = Snapshot::build(day(), vec![row("A", f64::NAN, 5.0), row("A", 10.0, 5.0)]);
        let a = &snap.records()[0];
        assert_eq!(a.buy_amount, 10.0);
        assert_eq!(a.sell_amount, 10.0);
        assert_eq!(a.net_amount, 5.0);
    }
}
