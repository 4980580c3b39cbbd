use tracing::info;

use crate::models::{FinancialReport, ReportTable};

pub const RATIO_COLUMNS: [&str; 6] = [
    "current_ratio",
    "debt_to_equity_ratio",
    "roe",
    "roa",
    "interest_coverage_ratio",
    "altman_z_score",
];

/// Risk ratios for one report
///
/// Division by zero and missing operands are not errors here: they show up
/// as infinities or NaN and are nulled at the sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskRatios {
    pub current_ratio: f64,
    pub debt_to_equity_ratio: f64,
    pub roe: f64,
    pub roa: f64,
    pub interest_coverage_ratio: f64,
    pub altman_z_score: f64,
}

impl RiskRatios {
    pub fn calculate(report: &FinancialReport) -> Self {
        let current_assets = report.value("current_assets");
        let current_liabilities = report.value("current_liabilities");
        let total_assets = report.value("total_assets");
        let total_liabilities = report.value("total_liabilities");
        let total_equity = report.value("total_equity");
        let net_income = report.value("net_income");
        let operating_income = report.value("operating_income");
        let interest_expense = report.value("interest_expense");
        let retained_earnings = report.value("retained_earnings");
        let revenue = report.value("revenue");

        let a = (current_assets - current_liabilities) / total_assets;
        let b = retained_earnings / total_assets;
        let c = operating_income / total_assets;
        let d = total_equity / total_liabilities;
        let e = revenue / total_assets;

        Self {
            current_ratio: current_assets / current_liabilities * 100.0,
            debt_to_equity_ratio: total_liabilities / total_equity * 100.0,
            roe: net_income / total_equity * 100.0,
            roa: operating_income / total_assets * 100.0,
            interest_coverage_ratio: operating_income / interest_expense,
            altman_z_score: 1.2 * a + 1.4 * b + 3.3 * c + 0.6 * d + 1.0 * e,
        }
    }

    pub fn values(&self) -> [(&'static str, f64); 6] {
        [
            (RATIO_COLUMNS[0], self.current_ratio),
            (RATIO_COLUMNS[1], self.debt_to_equity_ratio),
            (RATIO_COLUMNS[2], self.roe),
            (RATIO_COLUMNS[3], self.roa),
            (RATIO_COLUMNS[4], self.interest_coverage_ratio),
            (RATIO_COLUMNS[5], self.altman_z_score),
        ]
    }
}

/// Add the ratio columns to a report
pub fn enrich(mut report: FinancialReport) -> FinancialReport {
    let ratios = RiskRatios::calculate(&report);
    for (column, value) in ratios.values() {
        report.set(column, value);
    }
    report
}

/// Enrich every report and append the ratio columns to the table layout
pub fn enrich_table(table: ReportTable) -> ReportTable {
    let ReportTable {
        mut columns,
        reports,
    } = table;
    for column in RATIO_COLUMNS {
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }
    let reports: Vec<FinancialReport> = reports.into_iter().map(enrich).collect();
    info!("🧮 Calculated risk ratios for {} reports", reports.len());
    ReportTable { columns, reports }
}
