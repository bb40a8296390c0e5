//! Read-only queries over the enriched ledger: period rankings and the
//! recent-flow screen.
//!
//! Sums skip missing amounts, so a ledger kept with
//! [`MissingPolicy::Propagate`](crate::ledger::MissingPolicy) still ranks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::EnrichedLedger;

/// Per-entity sums over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTotals {
    pub entity_id: String,
    pub buy: f64,
    pub sell: f64,
    pub net: f64,
}

/// Sum buy/sell/net per entity over `start..=end`, sorted by entity.
pub fn period_totals(ledger: &EnrichedLedger, start: NaiveDate, end: NaiveDate) -> Vec<EntityTotals> {
    let mut totals: BTreeMap<&str, EntityTotals> = BTreeMap::new();
    for row in ledger.rows() {
        let r = &row.record;
        if r.trade_date < start || r.trade_date > end {
            continue;
        }
        let t = totals.entry(r.entity_id.as_str()).or_insert_with(|| EntityTotals {
            entity_id: r.entity_id.clone(),
            buy: 0.0,
            sell: 0.0,
            net: 0.0,
        });
        t.buy += present_or_zero(r.buy_amount);
        t.sell += present_or_zero(r.sell_amount);
        t.net += present_or_zero(r.net_amount);
    }
    totals.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    /// Largest positive net inflow first.
    NetBuy,
    /// Largest positive net outflow first.
    NetSell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub totals: EntityTotals,
    /// Net buy for `NetBuy`, net sell (−net) for `NetSell`. Always > 0.
    pub score: f64,
}

/// Top `limit` entities by net flow over `start..=end`.
pub fn rank(
    ledger: &EnrichedLedger,
    start: NaiveDate,
    end: NaiveDate,
    mode: RankMode,
    limit: usize,
) -> Vec<RankEntry> {
    let mut entries: Vec<RankEntry> = period_totals(ledger, start, end)
        .into_iter()
        .map(|totals| {
            let score = match mode {
                RankMode::NetBuy => totals.net,
                RankMode::NetSell => -totals.net,
            };
            RankEntry { totals, score }
        })
        .filter(|e| e.score > 0.0)
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.totals.entity_id.cmp(&b.totals.entity_id))
    });
    entries.truncate(limit);
    entries
}

/// Conditions for the recent-flow screen. All enabled conditions must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenCriteria {
    /// Number of most recent distinct trading dates in the ledger.
    pub lookback_days: usize,
    /// Keep entities with `buy_sum / sell_sum <= max_ratio`. `None` disables.
    pub max_ratio: Option<f64>,
    /// Keep entities whose latest `MA{w}` in the period is `<= 0`, for each `w`.
    pub nonpositive_windows: Vec<usize>,
}

impl Default for ScreenCriteria {
    fn default() -> Self {
        Self {
            lookback_days: 20,
            max_ratio: Some(0.9),
            nonpositive_windows: vec![5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenHit {
    pub entity_id: String,
    pub buy_sum: f64,
    pub sell_sum: f64,
    /// `+inf` when nothing was sold.
    pub ratio: f64,
    /// Latest present value per configured window, in window order.
    pub averages: Vec<(usize, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenResult {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub trading_days: usize,
    pub hits: Vec<ScreenHit>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScreenError {
    #[error("MA{0} is not a computed window")]
    UnknownWindow(usize),

    #[error("lookback must be at least one trading day")]
    ZeroLookback,
}

/// Screen entities by recent buy/sell ratio and latest moving averages.
///
/// Returns `Ok(None)` for an empty ledger.
pub fn screen(
    ledger: &EnrichedLedger,
    criteria: &ScreenCriteria,
) -> Result<Option<ScreenResult>, ScreenError> {
    if criteria.lookback_days == 0 {
        return Err(ScreenError::ZeroLookback);
    }
    if let Some(&w) = criteria
        .nonpositive_windows
        .iter()
        .find(|w| ledger.windows().position(**w).is_none())
    {
        return Err(ScreenError::UnknownWindow(w));
    }

    let dates = ledger.dates();
    let Some(&last_day) = dates.last() else {
        return Ok(None);
    };
    let period = &dates[dates.len().saturating_sub(criteria.lookback_days)..];
    let first_day = period[0];

    let windows: Vec<usize> = ledger.windows().iter().collect();
    let mut per_entity: BTreeMap<&str, (f64, f64, Vec<Option<f64>>)> = BTreeMap::new();
    for row in ledger.rows() {
        let r = &row.record;
        if r.trade_date < first_day {
            continue;
        }
        let entry = per_entity
            .entry(r.entity_id.as_str())
            .or_insert_with(|| (0.0, 0.0, vec![None; windows.len()]));
        entry.0 += present_or_zero(r.buy_amount);
        entry.1 += present_or_zero(r.sell_amount);
        // Rows are date-ordered within an entity, so the last present value wins.
        for (slot, value) in row.averages.iter().enumerate() {
            if value.is_some() {
                entry.2[slot] = *value;
            }
        }
    }

    let mut hits: Vec<ScreenHit> = per_entity
        .into_iter()
        .map(|(entity, (buy_sum, sell_sum, latest))| ScreenHit {
            entity_id: entity.to_string(),
            buy_sum,
            sell_sum,
            ratio: if sell_sum == 0.0 {
                f64::INFINITY
            } else {
                buy_sum / sell_sum
            },
            averages: windows.iter().copied().zip(latest).collect(),
        })
        .filter(|hit| passes(hit, criteria))
        .collect();

    hits.sort_by(|a, b| {
        a.ratio
            .total_cmp(&b.ratio)
            .then_with(|| b.buy_sum.partial_cmp(&a.buy_sum).unwrap_or(Ordering::Equal))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    Ok(Some(ScreenResult {
        first_day,
        last_day,
        trading_days: period.len(),
        hits,
    }))
}

fn passes(hit: &ScreenHit, criteria: &ScreenCriteria) -> bool {
    if let Some(max) = criteria.max_ratio {
        if hit.ratio > max {
            return false;
        }
    }
    criteria.nonpositive_windows.iter().all(|w| {
        hit.averages
            .iter()
            .find(|(window, _)| window == w)
            .and_then(|(_, value)| *value)
            .is_some_and(|v| v <= 0.0)
    })
}

fn present_or_zero(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyRecord;
    use crate::indicators::{enrich, WindowSet};
    use crate::ledger::Ledger;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn ledger(records: Vec<DailyRecord>, windows: &[usize]) -> EnrichedLedger {
        let ledger = Ledger::from_records(records).unwrap();
        enrich(&ledger, &WindowSet::new(windows.iter().copied()).unwrap())
    }

    #[test]
    fn period_totals_respects_range() {
        let l = ledger(
            vec![
                DailyRecord::new("A", day(1), 10.0, 1.0),
                DailyRecord::new("A", day(2), 10.0, 1.0),
                DailyRecord::new("A", day(3), 10.0, 1.0),
            ],
            &[2],
        );
        let totals = period_totals(&l, day(2), day(3));
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].buy, 20.0);
        assert_eq!(totals[0].net, 18.0);
    }

    #[test]
    fn rank_net_buy_and_sell() {
        let l = ledger(
            vec![
                DailyRecord::new("A", day(1), 100.0, 10.0),
                DailyRecord::new("B", day(1), 10.0, 60.0),
                DailyRecord::new("C", day(1), 50.0, 10.0),
                DailyRecord::new("D", day(1), 5.0, 5.0),
            ],
            &[5],
        );
        let buys = rank(&l, day(1), day(1), RankMode::NetBuy, 50);
        let names: Vec<&str> = buys.iter().map(|e| e.totals.entity_id.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);

        let sells = rank(&l, day(1), day(1), RankMode::NetSell, 50);
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].totals.entity_id, "B");
        assert_eq!(sells[0].score, 50.0);

        assert_eq!(rank(&l, day(1), day(1), RankMode::NetBuy, 1).len(), 1);
    }

    #[test]
    fn screen_filters_by_ratio_and_ma() {
        let mut records = Vec::new();
        for d in 1..=3 {
            // A: selling pressure, negative net
            records.push(DailyRecord::new("A", day(d), 10.0, 30.0));
            // B: buying pressure
            records.push(DailyRecord::new("B", day(d), 30.0, 10.0));
        }
        let l = ledger(records, &[2]);
        let criteria = ScreenCriteria {
            lookback_days: 20,
            max_ratio: Some(0.9),
            nonpositive_windows: vec![2],
        };
        let result = screen(&l, &criteria).unwrap().unwrap();
        assert_eq!(result.trading_days, 3);
        assert_eq!(result.first_day, day(1));
        assert_eq!(result.hits.len(), 1);
        let hit = &result.hits[0];
        assert_eq!(hit.entity_id, "A");
        assert_eq!(hit.buy_sum, 30.0);
        assert_eq!(hit.sell_sum, 90.0);
        assert_eq!(hit.averages, vec![(2, Some(-20.0))]);
    }

    #[test]
    fn screen_lookback_limits_period() {
        let records = (1..=5)
            .map(|d| DailyRecord::new("A", day(d), d as f64, 100.0))
            .collect();
        let l = ledger(records, &[5]);
        let criteria = ScreenCriteria {
            lookback_days: 2,
            max_ratio: None,
            nonpositive_windows: vec![],
        };
        let result = screen(&l, &criteria).unwrap().unwrap();
        assert_eq!(result.first_day, day(4));
        assert_eq!(result.hits[0].buy_sum, 9.0);
    }

    #[test]
    fn absent_ma_fails_condition() {
        let l = ledger(vec![DailyRecord::new("A", day(1), 1.0, 100.0)], &[5]);
        let result = screen(&l, &ScreenCriteria::default()).unwrap().unwrap();
        assert!(result.hits.is_empty());
    }

    #[test]
    fn zero_sell_gives_infinite_ratio() {
        let l = ledger(vec![DailyRecord::new("A", day(1), 5.0, 0.0)], &[1]);
        let criteria = ScreenCriteria {
            lookback_days: 20,
            max_ratio: None,
            nonpositive_windows: vec![],
        };
        let result = screen(&l, &criteria).unwrap().unwrap();
        assert!(result.hits[0].ratio.is_infinite());
    }

    #[test]
    fn unknown_window_is_an_error() {
        let l = ledger(vec![DailyRecord::new("A", day(1), 5.0, 0.0)], &[5]);
        let criteria = ScreenCriteria {
            nonpositive_windows: vec![7],
            ..ScreenCriteria::default()
        };
        assert_eq!(screen(&l, &criteria), Err(ScreenError::UnknownWindow(7)));
    }

    #[test]
    fn empty_ledger_has_no_result() {
        let l = ledger(vec![], &[5]);
        assert_eq!(screen(&l, &ScreenCriteria::default()), Ok(None));
    }
}
