//! Reshape, pivot and ratio properties over synthetic exports

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use test_log::test;

use fin_risk_loader::account_mapping::AccountMapper;
use fin_risk_loader::analysis::{enrich, enrich_table};
use fin_risk_loader::database::{report_records, sanitize_record, FieldValue};
use fin_risk_loader::models::FinancialReport;
use fin_risk_loader::processing::{extract_region, reshape};
use fin_risk_loader::PipelineError;

use crate::common::{logging, test_data::raw_table};

#[test]
fn test_reshape_round_trip_yields_single_enriched_row() {
    logging::init_test_logging();
    logging::log_test_step("Reshape a two-column export and enrich it");

    let source = raw_table(
        "VALUESearch (1).csv",
        &["종목코드", "종목명", "2023/Q1 유동자산", "2023/Q1 유동부채"],
        &[&["A000020", "동화약품", "100", "50"]],
    );

    let result = reshape(&[source], AccountMapper::standard());
    assert_eq!(result.table.len(), 1);
    assert_eq!(result.table.columns, vec!["current_assets", "current_liabilities"]);

    let report = enrich(result.table.reports[0].clone());
    logging::log_test_data("Enriched report", &report);
    assert_eq!(report.stock_code, "A000020");
    assert_eq!(report.period, "2023/Q1");
    assert_eq!(report.value("current_assets"), 100.0);
    assert_eq!(report.value("current_liabilities"), 50.0);
    assert_eq!(report.value("current_ratio"), 200.0);
}

#[test]
fn test_all_blank_rows_removed_partial_rows_retained() {
    let source = raw_table(
        "VALUESearch (1).csv",
        &["종목코드", "종목명", "2023/Q1 자산총계", "2023/Q1 부채총계", "2023/Q1 자본총계"],
        &[
            &["A1", "blank", "", " ", "n/a"],
            &["A2", "partial", "", "70", ""],
            &["A3", "full", "100", "60", "40"],
        ],
    );

    let result = reshape(&[source], AccountMapper::standard());
    assert_eq!(result.stats.blank_rows_dropped, 1);
    assert!(result.table.find("A1", "2023/Q1").is_none());

    let partial = result.table.find("A2", "2023/Q1").expect("partial row kept");
    assert_eq!(partial.value("total_liabilities"), 70.0);
    assert!(partial.value("total_assets").is_nan());
    assert!(partial.value("total_equity").is_nan());

    assert_eq!(result.table.len(), 2);
}

#[test]
fn test_multiple_periods_and_sources_pivot_without_fill() {
    let q1 = raw_table(
        "VALUESearch (1).csv",
        &["종목코드", "2023/Q1 수익", "2023/Q2 수익"],
        &[&["A1", "10", "20"], &["A2", "5", ""]],
    );
    let q3 = raw_table(
        "VALUESearch (2).csv",
        &["종목코드", "2023/Q3 영업이익", "2023/Q1 수익"],
        &[&["A1", "3", "11"]],
    );

    let result = reshape(&[q1, q3], AccountMapper::standard());
    let keys: Vec<(&str, &str)> = result
        .table
        .reports
        .iter()
        .map(|r| (r.stock_code.as_str(), r.period.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![("A1", "2023/Q1"), ("A1", "2023/Q2"), ("A1", "2023/Q3"), ("A2", "2023/Q1")]
    );
    // later source wins for the duplicated (A1, 2023/Q1, revenue)
    assert_eq!(result.table.find("A1", "2023/Q1").unwrap().value("revenue"), 11.0);
    assert_eq!(result.table.columns, vec!["operating_income", "revenue"]);
}

#[test]
fn test_source_missing_code_column_is_skipped_not_fatal() {
    let broken = raw_table("VALUESearch (1).csv", &["회사", "2023/Q1 수익"], &[&["x", "1"]]);
    let good = raw_table("VALUESearch (2).csv", &["종목코드", "2023/Q1 수익"], &[&["A1", "1"]]);

    let result = reshape(&[broken.clone(), good], AccountMapper::standard());
    assert_eq!(result.stats.sources_skipped, 1);
    assert_eq!(result.table.len(), 1);

    let err = fin_risk_loader::processing::extract_observations(&broken, AccountMapper::standard())
        .unwrap_err();
    assert_matches!(err, PipelineError::Schema { .. });
}

#[test]
fn test_division_by_zero_is_value_then_null_at_sink() {
    let report = FinancialReport::new("A1", "2023/Q4")
        .with("total_equity", 0.0)
        .with("total_liabilities", 100.0);

    let enriched = enrich(report);
    let ratio = enriched.value("debt_to_equity_ratio");
    assert!(ratio.is_infinite() && ratio > 0.0);

    let table = enrich_table(fin_risk_loader::models::ReportTable {
        columns: vec!["total_equity".into(), "total_liabilities".into()],
        reports: vec![enriched],
    });
    let record = sanitize_record(report_records(&table).remove(0));
    assert_eq!(record["debt_to_equity_ratio"], FieldValue::Null);
    assert_eq!(record["total_liabilities"], FieldValue::Float(100.0));
}

#[test]
fn test_region_extraction_examples() {
    assert_eq!(extract_region(Some("(06164) 서울 강남구 테헤란로 521")), Some("서울시".to_string()));
    assert_eq!(extract_region(Some("(21999) 인천 연수구")), Some("인천광역시".to_string()));
    assert_eq!(extract_region(Some("(48058) 부산 해운대구")), Some("부산광역시".to_string()));
    assert_eq!(
        extract_region(Some("(06164) 서울 강남구 테헤란로 521 (삼성동)")),
        Some("서울시".to_string())
    );
    assert_eq!(
        extract_region(Some("경기 성남시 분당구 판교로 (삼평동)")),
        Some("경기도".to_string())
    );
    assert_eq!(extract_region(Some("")), None);
    assert_eq!(extract_region(None), None);
}
