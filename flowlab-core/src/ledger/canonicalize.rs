use chrono::NaiveDate;

use crate::domain::DailyRecord;

/// Canonical ordering and integrity checks for ledger records.
pub struct Canonicalizer;

impl Canonicalizer {
    /// Sort by (entity, date), the order the indicator engine walks.
    pub fn canonicalize(records: &mut [DailyRecord]) {
        records.sort_by(|a, b| a.key().cmp(&b.key()));
    }

    /// First (entity, date) pair that occurs more than once.
    ///
    /// Expects canonically sorted input.
    pub fn find_duplicate(records: &[DailyRecord]) -> Option<(String, NaiveDate)> {
        records
            .windows(2)
            .find(|pair| pair[0].key() == pair[1].key())
            .map(|pair| (pair[0].entity_id.clone(), pair[0].trade_date))
    }

    /// Flag suspicious but legal content (missing or negative amounts).
    pub fn detect_anomalies(records: &[DailyRecord]) -> Vec<AnomalyReport> {
        let mut anomalies = Vec::new();

        let missing = records.iter().filter(|r| r.has_missing()).count();
        if missing > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::MissingAmount,
                count: missing,
                severity: Severity::Warning,
            });
        }

        let negative = records
            .iter()
            .filter(|r| r.buy_amount < 0.0 || r.sell_amount < 0.0)
            .count();
        if negative > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::NegativeAmount,
                count: negative,
                severity: Severity::Warning,
            });
        }

        anomalies
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyReport {
    pub anomaly_type: AnomalyType,
    pub count: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnomalyType {
    MissingAmount,
    NegativeAmount,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Warning,
}
