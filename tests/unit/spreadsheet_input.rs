//! Reading a committed .xlsx export through the same path as CSV sources

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use test_log::test;

use fin_risk_loader::account_mapping::AccountMapper;
use fin_risk_loader::analysis::enrich;
use fin_risk_loader::processing::reshape;
use fin_risk_loader::sources::read_table;

use crate::common::logging;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_read_workbook_skips_title_row() {
    logging::init_test_logging();
    logging::log_test_step("Read xlsx fixture");

    let table = read_table(&fixture("VALUESearch (1).xlsx")).unwrap();
    logging::log_test_data("Workbook table", &table);

    assert_eq!(table.name, "VALUESearch (1).xlsx");
    assert_eq!(
        table.headers,
        vec!["종목코드", "종목명", "2023/12 유동자산", "2023/12 유동부채"]
    );
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.cell(0, 0), "A000020");
    assert_eq!(table.cell(0, 2), "1234.5");
    assert_eq!(table.cell(1, 2), "500");
    assert_eq!(table.cell(1, 3), "");
}

#[test]
fn test_workbook_source_reshapes_like_csv() {
    let table = read_table(&fixture("VALUESearch (1).xlsx")).unwrap();
    let result = reshape(&[table], AccountMapper::standard());

    assert_eq!(result.table.len(), 2);
    assert_eq!(result.table.columns, vec!["current_assets", "current_liabilities"]);

    let dongwha = result.table.find("A000020", "2023/12").expect("first row");
    assert_eq!(dongwha.value("current_assets"), 1234.5);
    assert_eq!(dongwha.value("current_liabilities"), 617.25);
    assert_eq!(enrich(dongwha.clone()).value("current_ratio"), 200.0);

    let kr_motors = result.table.find("A000040", "2023/12").expect("second row");
    assert_eq!(kr_motors.value("current_assets"), 500.0);
    assert!(kr_motors.value("current_liabilities").is_nan());
}
