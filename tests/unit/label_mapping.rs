//! Header resolution tests

use pretty_assertions::assert_eq;
use test_log::test;

use fin_risk_loader::account_mapping::{extract_period, AccountMapper};
use fin_risk_loader::models::UNKNOWN_PERIOD;

#[test]
fn test_longer_label_never_shadowed_by_substring() {
    let mapper = AccountMapper::standard();
    let entries: Vec<(&str, &str)> = mapper.entries().collect();

    let mut checked = 0;
    for (long, long_field) in &entries {
        for (short, short_field) in &entries {
            if long == short || !long.contains(short) {
                continue;
            }
            for header in [
                format!("2023/Q1 {}", long),
                format!("{}(천원) 2023/12", long),
                long.to_string(),
            ] {
                let resolved = mapper.resolve(&header).map(|(_, f)| f);
                assert_eq!(resolved, Some(*long_field), "{} shadowed by {}", header, short_field);
            }
            checked += 1;
        }
    }
    assert!(checked >= 2, "expected nested label pairs in the standard table");
}

#[test]
fn test_resolve_extracts_period_and_field() {
    let mapper = AccountMapper::standard();
    assert_eq!(
        mapper.resolve("2023/Q1 유동성장기부채"),
        Some(("2023/Q1".to_string(), "current_portion_of_lt_debt"))
    );
    assert_eq!(
        mapper.resolve("영업활동으로인한현금흐름 2022/4Q"),
        Some(("2022/4Q".to_string(), "operating_cash_flow"))
    );
    assert_eq!(mapper.resolve("2023/Q1 종업원수"), None);
}

#[test]
fn test_period_token_requires_four_digit_year_and_code() {
    assert_eq!(extract_period("2023/Q1 유동자산"), "2023/Q1");
    assert_eq!(extract_period("FY2020/12 자산총계"), "2020/12");
    assert_eq!(extract_period("2023/ 유동자산"), UNKNOWN_PERIOD);
    assert_eq!(extract_period("유동자산"), UNKNOWN_PERIOD);
}
