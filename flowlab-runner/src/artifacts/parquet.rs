//! Columnar copy of the enriched ledger (Parquet).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, DataType, ParquetWriter};
use std::fs::File;
use std::path::Path;

use flowlab_core::data::schema::{BUY, DATE, ENTITY, NET, SELL};
use flowlab_core::domain::EnrichedLedger;
use flowlab_core::indicators::WindowSet;

fn present(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

/// Same columns and row order as the ledger CSV; missing values are nulls.
pub fn ledger_dataframe(ledger: &EnrichedLedger) -> Result<DataFrame> {
    let rows = ledger.rows_by_date();
    let epoch = NaiveDate::default();

    let entities: Vec<&str> = rows.iter().map(|r| r.record.entity_id.as_str()).collect();
    let buys: Vec<Option<f64>> = rows.iter().map(|r| present(r.record.buy_amount)).collect();
    let sells: Vec<Option<f64>> = rows.iter().map(|r| present(r.record.sell_amount)).collect();
    let nets: Vec<Option<f64>> = rows.iter().map(|r| present(r.record.net_amount)).collect();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.record.trade_date - epoch).num_days() as i32)
        .collect();

    let mut columns = vec![
        Column::new(ENTITY.into(), entities),
        Column::new(BUY.into(), buys),
        Column::new(SELL.into(), sells),
        Column::new(NET.into(), nets),
        Column::new(DATE.into(), dates)
            .cast(&DataType::Date)
            .context("Failed to cast ledger dates")?,
    ];
    for (slot, window) in ledger.windows().iter().enumerate() {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.averages[slot]).collect();
        columns.push(Column::new(WindowSet::column_name(window).into(), values));
    }

    DataFrame::new(columns).context("Failed to build ledger dataframe")
}

pub fn write_ledger_parquet(path: &Path, ledger: &EnrichedLedger) -> Result<()> {
    let mut df = ledger_dataframe(ledger)?;
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create ledger parquet {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .context("Failed to write ledger parquet")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlab_core::domain::DailyRecord;
    use flowlab_core::indicators::enrich;
    use flowlab_core::ledger::Ledger;

    #[test]
    fn dataframe_matches_ledger_layout() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 10, d).unwrap();
        let ledger = Ledger::from_records(vec![
            DailyRecord::new("A", day(8), 1.0, 0.0),
            DailyRecord::new("A", day(9), 3.0, 0.0),
            DailyRecord::new("B", day(9), f64::NAN, 2.0),
        ])
        .unwrap();
        let enriched = enrich(&ledger, &WindowSet::new([2]).unwrap());
        let df = ledger_dataframe(&enriched).unwrap();

        assert_eq!(df.height(), 3);
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["종목명", "매수", "매도", "순매수", "날짜", "MA2"]);
        assert_eq!(df.column(BUY).unwrap().null_count(), 1);
        assert_eq!(df.column("MA2").unwrap().null_count(), 2);
    }

    #[test]
    fn parquet_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.parquet");
        let enriched = enrich(&Ledger::new(), &WindowSet::default());
        write_ledger_parquet(&path, &enriched).unwrap();
        assert!(path.exists());
    }
}
