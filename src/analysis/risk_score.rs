//! Weighted 0-100 risk score from a company's latest stored report
//!
//! Higher means riskier.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::{Record, RecordStore};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub debt: f64,
    pub current: f64,
    pub z_score: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            debt: 0.5,
            current: 0.3,
            z_score: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScore {
    pub stock_code: String,
    pub period: Option<String>,
    pub debt_to_equity_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
    pub altman_z_score: Option<f64>,
    pub debt_score: f64,
    pub current_score: f64,
    pub z_score: f64,
    pub total: f64,
}

/// Debt-to-equity above 200% is maximal risk
pub fn debt_score(debt_to_equity_ratio: f64) -> f64 {
    (debt_to_equity_ratio / 200.0 * 100.0).min(100.0)
}

/// Current ratio: safe at 200%+, moderate at 100%+, steep below
pub fn current_score(current_ratio: f64) -> f64 {
    let score = if current_ratio >= 200.0 {
        0.0
    } else if current_ratio >= 100.0 {
        20.0
    } else {
        100.0 - current_ratio
    };
    score.clamp(0.0, 100.0)
}

/// Altman Z: distress below 1.8, safe above 3.0, linear in between
pub fn z_score_risk(altman_z: f64) -> f64 {
    if altman_z > 3.0 {
        0.0
    } else if altman_z < 1.8 {
        100.0
    } else {
        (3.0 - altman_z) / (3.0 - 1.8) * 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ratio(record: &Record, column: &str) -> Option<f64> {
    record.get(column).and_then(|v| v.as_f64())
}

/// Score a report row; missing ratios count as zero
pub fn score_record(stock_code: &str, record: &Record, weights: &RiskWeights) -> RiskScore {
    let debt = ratio(record, "debt_to_equity_ratio");
    let current = ratio(record, "current_ratio");
    let altman = ratio(record, "altman_z_score");

    let debt_score = debt_score(debt.unwrap_or(0.0));
    let current_score = current_score(current.unwrap_or(0.0));
    let z_score = z_score_risk(altman.unwrap_or(0.0));
    let total = round2(
        debt_score * weights.debt + current_score * weights.current + z_score * weights.z_score,
    );

    RiskScore {
        stock_code: stock_code.to_string(),
        period: record
            .get("period")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        debt_to_equity_ratio: debt,
        current_ratio: current,
        altman_z_score: altman,
        debt_score,
        current_score,
        z_score,
        total,
    }
}

/// Fetch the latest report for `stock_code` and score it
pub async fn risk_score(
    store: &dyn RecordStore,
    stock_code: &str,
    weights: &RiskWeights,
) -> Result<Option<RiskScore>> {
    for w in [weights.debt, weights.current, weights.z_score] {
        if !w.is_finite() || w < 0.0 {
            return Err(PipelineError::Config(format!(
                "risk weights must be non-negative numbers, got {:?}",
                weights
            )));
        }
    }

    let Some(record) = store.latest_report(stock_code).await? else {
        info!("No report found for {}", stock_code);
        return Ok(None);
    };

    let score = score_record(stock_code, &record, weights);
    info!(
        "📊 [{}] period {}: debt {:.1}, current {:.1}, z {:.1} → {}",
        stock_code,
        score.period.as_deref().unwrap_or("?"),
        score.debt_score,
        score.current_score,
        score.z_score,
        score.total
    );
    Ok(Some(score))
}
