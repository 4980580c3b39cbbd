use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};

/// Marker used when a header carries no recognizable period token
pub const UNKNOWN_PERIOD: &str = "Unknown";

/// A source table as read from disk: header row plus text cells
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Position of the first column whose header equals `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of the first column whose header contains `fragment`
    pub fn column_containing(&self, fragment: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.contains(fragment))
    }

    /// Cell text, empty when the row is shorter than the header
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Optional descriptive columns of the company table, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityColumn {
    CompanyName,
    Industry,
    Address,
    MarketType,
    MarketCapRecent,
}

impl EntityColumn {
    pub const ALL: [EntityColumn; 5] = [
        EntityColumn::CompanyName,
        EntityColumn::Industry,
        EntityColumn::Address,
        EntityColumn::MarketType,
        EntityColumn::MarketCapRecent,
    ];

    /// Column name in the processed CSV and the `companies` table
    pub fn field_name(&self) -> &'static str {
        match self {
            EntityColumn::CompanyName => "company_name",
            EntityColumn::Industry => "industry",
            EntityColumn::Address => "address",
            EntityColumn::MarketType => "market_type",
            EntityColumn::MarketCapRecent => "market_cap_recent",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.field_name() == name)
    }
}

/// One company from the info source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub stock_code: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub market_type: Option<String>,
    pub market_cap_recent: Option<f64>,
    pub region: Option<String>,
}

/// Company table plus the optional columns its source actually carried
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    pub columns: Vec<EntityColumn>,
    pub records: Vec<EntityRecord>,
}

impl EntityTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Long-format observation produced by the reshape step
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub stock_code: String,
    pub period: String,
    pub account: String,
    pub value: f64,
}

/// Wide row keyed by (stock_code, period)
///
/// Absent accounts read back as NaN so ratio arithmetic propagates
/// undefined operands instead of failing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinancialReport {
    pub stock_code: String,
    pub period: String,
    pub values: BTreeMap<String, f64>,
}

impl FinancialReport {
    pub fn new(stock_code: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            stock_code: stock_code.into(),
            period: period.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, field: &str) -> f64 {
        self.values.get(field).copied().unwrap_or(f64::NAN)
    }

    pub fn set(&mut self, field: impl Into<String>, value: f64) {
        self.values.insert(field.into(), value);
    }

    pub fn with(mut self, field: &str, value: f64) -> Self {
        self.set(field, value);
        self
    }
}

/// Pivoted report table; `columns` lists every value column in output order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub reports: Vec<FinancialReport>,
}

impl ReportTable {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn find(&self, stock_code: &str, period: &str) -> Option<&FinancialReport> {
        self.reports
            .iter()
            .find(|r| r.stock_code == stock_code && r.period == period)
    }
}

/// Remote store endpoint and key
#[derive(Debug, Clone)]
pub struct StoreCredentials {
    pub url: String,
    pub api_key: String,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub raw_data_path: PathBuf,
    pub processed_data_path: PathBuf,
    pub source_file_prefix: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub company_batch_size: usize,
    pub report_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_data_path: PathBuf::from("data/raw"),
            processed_data_path: PathBuf::from("data/processed"),
            source_file_prefix: "VALUESearch".to_string(),
            supabase_url: None,
            supabase_key: None,
            company_batch_size: 1000,
            report_batch_size: 5000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Config::default();
        Ok(Config {
            raw_data_path: std::env::var("RAW_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.raw_data_path),
            processed_data_path: std::env::var("PROCESSED_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_data_path),
            source_file_prefix: std::env::var("SOURCE_FILE_PREFIX")
                .unwrap_or(defaults.source_file_prefix),
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_key: non_empty_var("SUPABASE_KEY"),
            company_batch_size: parse_batch_size(
                "COMPANY_BATCH_SIZE",
                defaults.company_batch_size,
            )?,
            report_batch_size: parse_batch_size("REPORT_BATCH_SIZE", defaults.report_batch_size)?,
        })
    }

    /// Credentials for the remote store; missing values are a configuration error
    pub fn store_credentials(&self) -> Result<StoreCredentials> {
        let url = self.supabase_url.clone().ok_or_else(|| {
            PipelineError::Config("SUPABASE_URL environment variable required".into())
        })?;
        let api_key = self.supabase_key.clone().ok_or_else(|| {
            PipelineError::Config("SUPABASE_KEY environment variable required".into())
        })?;
        Ok(StoreCredentials { url, api_key })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_batch_size(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(PipelineError::Config(format!(
                "{} must be a positive integer, got '{}'",
                key, raw
            ))),
        },
        Err(_) => Ok(default),
    }
}
