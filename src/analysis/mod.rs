pub mod ratios;
pub mod risk_score;

pub use ratios::{enrich, enrich_table, RiskRatios, RATIO_COLUMNS};
pub use risk_score::{risk_score, RiskScore, RiskWeights};
