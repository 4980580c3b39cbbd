//! Korean account label to canonical field resolution
//!
//! Raw headers look like `"2023/Q1 유동자산(천원)"`: a period token plus a
//! free-text account label. Labels are tested longest first so that a label
//! embedded in a longer one (`유동자산` inside `비유동자산`) never wins over it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Reverse;

use crate::models::UNKNOWN_PERIOD;

/// Standard label table for the vendor export
const STANDARD_LABELS: &[(&str, &str)] = &[
    ("유동성장기부채", "current_portion_of_lt_debt"),
    ("기타이익잉여금", "other_comprehensive_income"),
    ("비유동자산", "non_current_assets"),
    ("현금및현금성자산의증가", "change_in_cash_equivalents"),
    ("영업활동으로인한현금흐름", "operating_cash_flow"),
    ("투자활동으로인한현금흐름", "investing_cash_flow"),
    ("재무활동으로인한현금흐름", "financing_cash_flow"),
    ("판매비와관리비", "sga_expenses"),
    ("매출채권", "accounts_receivable"),
    ("매입채무", "accounts_payable"),
    ("이익잉여금", "retained_earnings"),
    ("유동자산", "current_assets"),
    ("유동부채", "current_liabilities"),
    ("자산총계", "total_assets"),
    ("부채총계", "total_liabilities"),
    ("자본총계", "total_equity"),
    ("자본금", "capital_stock"),
    ("매출원가", "cost_of_goods_sold"),
    ("영업이익", "operating_income"),
    ("당기순이익", "net_income"),
    ("이자비용", "interest_expense"),
    ("법인세비용", "income_tax_expense"),
    ("재고자산", "inventory"),
    ("수익", "revenue"),
];

static PERIOD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4}/[A-Za-z0-9]+)").expect("Failed to compile period regex"));

static STANDARD_MAPPER: Lazy<AccountMapper> = Lazy::new(|| AccountMapper::new(STANDARD_LABELS));

/// Ordered label → field table, longest label first
#[derive(Debug, Clone)]
pub struct AccountMapper {
    entries: Vec<(String, String)>,
}

impl AccountMapper {
    /// Build a mapper; ties in label length keep their input order
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let mut entries: Vec<(String, String)> = pairs
            .iter()
            .map(|(label, field)| (label.to_string(), field.to_string()))
            .collect();
        entries.sort_by_key(|(label, _)| Reverse(label.chars().count()));
        Self { entries }
    }

    /// Shared mapper over the standard vendor labels
    pub fn standard() -> &'static AccountMapper {
        &STANDARD_MAPPER
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, f)| (l.as_str(), f.as_str()))
    }

    /// Canonical field of the longest label contained in `header`
    pub fn match_field(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(label, _)| header.contains(label.as_str()))
            .map(|(_, field)| field.as_str())
    }

    /// Resolve a raw header to `(period, field)`
    ///
    /// A header without a period token still resolves, with the period set
    /// to [`UNKNOWN_PERIOD`].
    pub fn resolve(&self, header: &str) -> Option<(String, &str)> {
        let field = self.match_field(header)?;
        Some((extract_period(header), field))
    }
}

/// First `YYYY/<code>` token in the header, or the unknown marker
pub fn extract_period(header: &str) -> String {
    PERIOD_PATTERN
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_PERIOD.to_string())
}
