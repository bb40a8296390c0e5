//! End-to-end tests for the ingest pipeline on a real filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use flowlab_core::data::SkipReason;
use flowlab_runner::{
    load_enriched_ledger, run_pipeline, FileStatus, PipelineConfig, PipelineError, StoreError,
};

fn export_html(rows: &[(&str, &str, &str)]) -> String {
    let mut html = String::from(
        "<table><tr><th>순위</th><th>국가</th><th>코드</th><th>종목명</th><th>매수</th><th>매도</th></tr>",
    );
    for (i, (entity, buy, sell)) in rows.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>미국</td><td>X</td><td>{entity}</td><td>{buy}</td><td>{sell}</td></tr>",
            i + 1
        ));
    }
    html.push_str("</table>");
    html
}

fn config_for(root: &Path) -> PipelineConfig {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    PipelineConfig {
        data_dir,
        output_dir: root.join("processed"),
        ..PipelineConfig::default()
    }
}

fn write_export(config: &PipelineConfig, name: &str, rows: &[(&str, &str, &str)]) {
    fs::write(config.data_dir.join(name), export_html(rows)).unwrap();
}

fn ledger_lines(path: &PathBuf) -> Vec<String> {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    String::from_utf8(bytes[3..].to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn first_ingest_then_corrected_reingest() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());

    write_export(&config, "re20241009.xls", &[("A", "100", "40"), ("B", "20", "20")]);
    let first = run_pipeline(&config).unwrap();
    assert_eq!(first.parsed_count(), 1);
    assert_eq!(first.total_rows, 2);
    assert_eq!(first.new_dates.len(), 1);

    let ledger_csv = first.artifacts.as_ref().unwrap().ledger_csv.clone();
    assert_eq!(
        ledger_lines(&ledger_csv),
        vec![
            "종목명,매수,매도,순매수,날짜,MA5,MA10,MA20",
            "A,100,40,60,2024-10-09,,,",
            "B,20,20,0,2024-10-09,,,",
        ]
    );

    write_export(&config, "re20241009.xls", &[("A", "120", "40"), ("B", "20", "20")]);
    let second = run_pipeline(&config).unwrap();
    assert_eq!(second.total_rows, 2);
    assert_eq!(second.replaced_rows, 2);
    assert!(second.new_dates.is_empty());
    assert_eq!(
        ledger_lines(&ledger_csv)[1..],
        ["A,120,40,80,2024-10-09,,,", "B,20,20,0,2024-10-09,,,"]
    );
}

#[test]
fn history_accumulates_and_averages_appear() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());

    for (day, net) in [(7, "10"), (8, "20"), (9, "30"), (10, "40"), (11, "50")] {
        write_export(&config, &format!("re202410{day:02}.xls"), &[("A", net, "0")]);
    }
    let report = run_pipeline(&config).unwrap();
    assert_eq!(report.total_rows, 5);
    assert_eq!(report.total_dates, 5);

    let lines = ledger_lines(&report.artifacts.unwrap().ledger_csv);
    assert_eq!(lines[4], "A,40,0,40,2024-10-10,,,");
    assert_eq!(lines[5], "A,50,0,50,2024-10-11,30,,");

    let enriched = load_enriched_ledger(&config).unwrap().unwrap();
    assert_eq!(enriched.len(), 5);
}

#[test]
fn summary_and_entity_list_are_regenerated() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());
    write_export(&config, "re20241008.xls", &[("TSLA", "1", "2")]);
    write_export(&config, "re20241009.xls", &[("TSLA", "3", "1"), ("AAPL", "5", "5")]);

    let report = run_pipeline(&config).unwrap();
    let paths = report.artifacts.unwrap();

    let summary = fs::read_to_string(&paths.summary_csv).unwrap();
    assert_eq!(
        summary.trim_start_matches('\u{feff}'),
        "종목명,행수,최초일,최종일\nTSLA,2,2024-10-08,2024-10-09\nAAPL,1,2024-10-09,2024-10-09\n"
    );
    assert_eq!(fs::read_to_string(&paths.entities_txt).unwrap(), "AAPL\nTSLA");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.manifest_json).unwrap()).unwrap();
    assert_eq!(manifest["rows"], 3);
    assert_eq!(manifest["first_date"], "2024-10-08");
}

#[test]
fn no_data_day_leaves_everything_untouched() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());
    write_export(&config, "re20241009.xls", &[("A", "1", "0")]);
    let first = run_pipeline(&config).unwrap();
    let ledger_csv = first.artifacts.unwrap().ledger_csv;
    let before = fs::read(&ledger_csv).unwrap();

    // Replace the only input with junk, plus a misnamed file.
    fs::write(config.data_dir.join("re20241009.xls"), b"not a table").unwrap();
    write_export(&config, "download.xls", &[("A", "1", "0")]);

    let report = run_pipeline(&config).unwrap();
    assert!(!report.wrote_artifacts());
    assert_eq!(report.skipped_count(), 2);
    assert_eq!(report.total_rows, 1);
    assert!(report.files.iter().any(|f| f.status == FileStatus::Skipped(SkipReason::NoTable)));
    assert_eq!(fs::read(&ledger_csv).unwrap(), before);
}

#[test]
fn empty_data_dir_is_not_an_error() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());
    let report = run_pipeline(&config).unwrap();
    assert!(report.files.is_empty());
    assert!(!report.wrote_artifacts());
    assert!(!config.ledger_path().exists());
}

#[test]
fn identical_inputs_give_identical_bytes() {
    let run = || {
        let root = tempfile::tempdir().unwrap();
        let config = config_for(root.path());
        write_export(&config, "re20241008.xls", &[("B", "1,234.5", "10"), ("A", "7", "-")]);
        write_export(&config, "re20241009.xls", &[("A", "3", "4")]);
        let paths = run_pipeline(&config).unwrap().artifacts.unwrap();
        [
            fs::read(&paths.ledger_csv).unwrap(),
            fs::read(&paths.summary_csv).unwrap(),
            fs::read(&paths.entities_txt).unwrap(),
            fs::read(&paths.manifest_json).unwrap(),
        ]
    };
    assert_eq!(run(), run());
}

#[test]
fn missing_source_dir_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        data_dir: root.path().join("nowhere"),
        output_dir: root.path().join("processed"),
        ..PipelineConfig::default()
    };
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSourceDir(_)));
}

#[test]
fn corrupt_ledger_is_fatal_and_untouched() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());
    fs::create_dir_all(&config.output_dir).unwrap();
    let corrupt = "종목명,매수,매도,순매수,날짜\nA,1,0,1,yesterday\n";
    fs::write(config.ledger_path(), corrupt).unwrap();
    write_export(&config, "re20241009.xls", &[("A", "1", "0")]);

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Store(StoreError::BadDate { .. })));
    assert_eq!(fs::read_to_string(config.ledger_path()).unwrap(), corrupt);
    assert!(!config.output_dir.join("stocks.txt").exists());
}

#[test]
fn duplicate_dates_in_one_batch_keep_the_later_file() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());
    write_export(&config, "re20241009.xls", &[("A", "1", "0")]);
    write_export(&config, "re20241009.xlsx", &[("A", "9", "0")]);

    let report = run_pipeline(&config).unwrap();
    assert_eq!(report.total_rows, 1);
    assert_eq!(report.superseded_dates.len(), 1);
    let lines = ledger_lines(&report.artifacts.unwrap().ledger_csv);
    assert_eq!(lines[1], "A,9,0,9,2024-10-09,,,");
}

#[test]
fn strict_header_mismatch_aborts_run() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config_for(root.path());
    config.columns.expected_headers = Some(["종목".into(), "매수".into(), "매도".into()]);
    write_export(&config, "re20241009.xls", &[("A", "1", "0")]);

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Parse(_)));
    assert!(!config.ledger_path().exists());
}
