//! End-to-end preprocess → load against the in-memory store

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use fin_risk_loader::analysis::{risk_score, RiskWeights};
use fin_risk_loader::database::{FieldValue, MemoryStore};
use fin_risk_loader::models::Config;
use fin_risk_loader::pipeline::{load, preprocess};
use fin_risk_loader::sources::processed::COMPANY_INFO_FILE;

use crate::common::logging;
use crate::common::test_data::{config_in, write_export};

const INFO_HEADERS: &[&str] = &[
    "종목코드",
    "종목명",
    "691300.NICS 산업분류",
    "691090.본사주소",
    "691035.시장구분",
    "시가총액(최근)",
];

const FINANCE_HEADERS: &[&str] = &[
    "종목코드",
    "종목명",
    "2023/12 유동자산",
    "2023/12 유동부채",
    "2023/12 자산총계",
    "2023/12 부채총계",
    "2023/12 자본총계",
    "2023/12 유동성장기부채",
];

/// Raw directory with an info export, two finance exports, a corrupt
/// spreadsheet and an office lock file
fn seed_raw_exports(config: &Config) {
    let raw = &config.raw_data_path;
    write_export(
        raw,
        "VALUESearch.csv",
        INFO_HEADERS,
        &[
            &["A000020", "동화약품", "제약", "(03142) 서울 종로구 청계천로 35", "KOSPI", "300000"],
            &["A000040", "KR모터스", "자동차", "(51529) 경남 창원시 성산구", "KOSPI", "100"],
        ],
    );
    write_export(
        raw,
        "VALUESearch (1).csv",
        FINANCE_HEADERS,
        &[
            &["A000020", "동화약품", "200", "100", "1000", "400", "600", "30"],
            &["A000040", "KR모터스", "50", "100", "500", "500", "0", ""],
            &["A000050", "빈행", "", "", "", "", "", ""],
        ],
    );
    write_export(
        raw,
        "VALUESearch (2).csv",
        &["종목코드", "2022/12 유동자산", "2022/12 유동부채"],
        &[&["A000020", "150", "100"]],
    );
    std::fs::write(raw.join("VALUESearch (3).xlsx"), b"not a workbook")
        .expect("write corrupt file");
    std::fs::write(raw.join("~$VALUESearch (4).csv"), b"lock").expect("write lock file");
}

#[tokio::test]
async fn test_preprocess_then_load_into_memory_store() {
    logging::init_test_logging();
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    seed_raw_exports(&config);

    logging::log_test_step("Preprocess raw exports");
    let pre = preprocess(&config).unwrap();
    logging::log_test_data("Preprocess summary", &pre);
    assert_eq!(pre.companies, Some(2));
    assert_eq!(pre.finance_files, 3);
    assert_eq!(pre.unreadable_files, 1);
    assert_eq!(pre.reshape.blank_rows_dropped, 1);
    assert_eq!(pre.reports, 3);
    // stock_code, period and six account columns
    assert_eq!(pre.report_columns, 8);
    assert!(pre.report_csv.exists());

    logging::log_test_step("Load processed CSVs");
    let store = MemoryStore::new();
    let summary = load(&config, &store).await.unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.failed_batches(), 0);
    let reports = summary.reports.as_ref().unwrap();
    assert_eq!(reports.total_rows, 3);
    assert_eq!(reports.batches.len(), 2);

    assert_eq!(store.row_count("companies"), 2);
    assert_eq!(store.row_count("financial_reports"), 3);

    let companies = store.rows("companies");
    assert_eq!(companies[0]["stock_code"], FieldValue::Text("A000020".into()));
    assert_eq!(companies[0]["region"], FieldValue::Text("서울시".into()));
    assert_eq!(companies[1]["region"], FieldValue::Text("경남".into()));
    assert_eq!(companies[0]["market_cap_recent"], FieldValue::Float(300000.0));

    let rows = store.rows("financial_reports");
    for row in &rows {
        assert!(row.contains_key("non_current_liabilities_current_portion"));
        assert!(!row.contains_key("current_portion_of_lt_debt"));
        assert!(row.contains_key("altman_z_score"));
    }

    let kr_motors = rows
        .iter()
        .find(|r| r["stock_code"] == FieldValue::Text("A000040".into()))
        .unwrap();
    // zero equity and a missing account both end up null
    assert!(kr_motors["debt_to_equity_ratio"].is_null());
    assert!(kr_motors["non_current_liabilities_current_portion"].is_null());
    assert_eq!(kr_motors["current_ratio"], FieldValue::Float(50.0));
}

#[tokio::test]
async fn test_rerunning_load_is_idempotent() {
    logging::init_test_logging();
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    seed_raw_exports(&config);
    preprocess(&config).unwrap();

    let store = MemoryStore::new();
    load(&config, &store).await.unwrap();
    let first = store.rows("financial_reports");

    load(&config, &store).await.unwrap();
    assert_eq!(store.rows("financial_reports"), first);
    assert_eq!(store.row_count("companies"), 2);
}

#[tokio::test]
async fn test_risk_score_uses_latest_loaded_period() {
    logging::init_test_logging();
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    seed_raw_exports(&config);
    preprocess(&config).unwrap();

    let store = MemoryStore::new();
    load(&config, &store).await.unwrap();

    let score = risk_score(&store, "A000020", &RiskWeights::default())
        .await
        .unwrap()
        .expect("score for loaded company");
    assert_eq!(score.period.as_deref(), Some("2023/12"));
    assert_eq!(score.current_ratio, Some(200.0));
    assert_eq!(score.current_score, 0.0);
    // retained earnings are absent, so the Z-score is null and counts as zero
    assert_eq!(score.altman_z_score, None);
    assert_eq!(score.z_score, 100.0);
    assert_eq!(score.total, 36.67);

    let missing = risk_score(&store, "A999999", &RiskWeights::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_load_without_company_csv_still_loads_reports() {
    logging::init_test_logging();
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    seed_raw_exports(&config);
    preprocess(&config).unwrap();
    std::fs::remove_file(config.processed_data_path.join(COMPANY_INFO_FILE)).unwrap();

    let store = MemoryStore::new();
    let summary = load(&config, &store).await.unwrap();
    assert!(summary.companies.is_none());
    assert_eq!(store.row_count("companies"), 0);
    assert_eq!(store.row_count("financial_reports"), 3);
}
