//! One entity's flow on one trade date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single (entity, date) observation.
///
/// Amounts are `f64::NAN` when unknown. Whether missing values survive into
/// the ledger is decided by [`crate::ledger::MissingPolicy`], not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub entity_id: String,
    pub trade_date: NaiveDate,
    pub buy_amount: f64,
    pub sell_amount: f64,
    pub net_amount: f64,
}

impl DailyRecord {
    /// Build a record with `net = buy - sell` (missing propagates).
    pub fn new(entity_id: impl Into<String>, trade_date: NaiveDate, buy: f64, sell: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            trade_date,
            buy_amount: buy,
            sell_amount: sell,
            net_amount: buy - sell,
        }
    }

    /// Uniqueness key within a ledger.
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.entity_id.as_str(), self.trade_date)
    }

    pub fn has_missing(&self) -> bool {
        self.buy_amount.is_nan() || self.sell_amount.is_nan() || self.net_amount.is_nan()
    }
}
