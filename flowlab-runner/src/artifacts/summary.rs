//! Coverage summary (CSV) and entity list (text).

use anyhow::{Context, Result};

use flowlab_core::data::LedgerSchema;
use flowlab_core::domain::DailyRecord;
use flowlab_core::summary::{coverage, entity_list};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `종목명,행수,최초일,최종일`, BOM-prefixed, busiest entities first.
pub fn render_summary_csv<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(LedgerSchema::summary_columns())?;
    for row in coverage(records) {
        writer.write_record([
            row.entity_id,
            row.count.to_string(),
            row.first_date.format("%Y-%m-%d").to_string(),
            row.last_date.format("%Y-%m-%d").to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush summary CSV")
}

/// Distinct entity ids joined by `\n`, no BOM, no trailing newline.
pub fn render_entity_list<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Vec<u8> {
    entity_list(records).join("\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(entity: &str, d: u32) -> DailyRecord {
        DailyRecord::new(entity, NaiveDate::from_ymd_opt(2024, 10, d).unwrap(), 1.0, 0.0)
    }

    #[test]
    fn summary_has_bom_and_korean_header() {
        let records = vec![rec("A", 8), rec("A", 9), rec("B", 9)];
        let bytes = render_summary_csv(&records).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(
            text,
            "종목명,행수,최초일,최종일\nA,2,2024-10-08,2024-10-09\nB,1,2024-10-09,2024-10-09\n"
        );
    }

    #[test]
    fn entity_list_has_no_bom_or_trailing_newline() {
        let records = vec![rec("b", 8), rec("a", 9), rec("b", 9)];
        assert_eq!(render_entity_list(&records), b"a\nb".to_vec());
        assert!(render_entity_list(&Vec::<DailyRecord>::new()).is_empty());
    }
}
