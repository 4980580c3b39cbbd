//! Sink side of the pipeline: store records, sanitization and batched upserts

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::error::Result;
use crate::models::{EntityColumn, EntityTable, ReportTable};

pub mod memory_store;
pub use memory_store::MemoryStore;

/// Column renames applied when financial reports are sent to the store
pub const REPORT_COLUMN_ALIASES: &[(&str, &str)] = &[(
    "current_portion_of_lt_debt",
    "non_current_liabilities_current_portion",
)];

/// A single cell headed for the remote store
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Float(f64),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a JSON value returned by the store
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            serde_json::Value::Number(n) => {
                n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null)
            }
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map(FieldValue::Float).unwrap_or(FieldValue::Null)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            FieldValue::Float(_) => serializer.serialize_none(),
        }
    }
}

/// One row for the remote store, column name → value
pub type Record = BTreeMap<String, FieldValue>;

/// Replace infinite and NaN floats with an explicit null
pub fn sanitize_record(record: Record) -> Record {
    record
        .into_iter()
        .map(|(key, value)| match value {
            FieldValue::Float(v) if !v.is_finite() => (key, FieldValue::Null),
            other => (key, other),
        })
        .collect()
}

/// Target table and its natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub key: &'static [&'static str],
}

pub const COMPANIES: TableSpec = TableSpec {
    name: "companies",
    key: &["stock_code"],
};

pub const FINANCIAL_REPORTS: TableSpec = TableSpec {
    name: "financial_reports",
    key: &["stock_code", "period"],
};

impl TableSpec {
    /// Natural key values of a record, None if any part is missing
    pub fn key_of(&self, record: &Record) -> Option<Vec<String>> {
        self.key
            .iter()
            .map(|k| record.get(*k).and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }
}

/// Table-oriented store with keyed insert-or-update
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert rows keyed by the table's natural key
    async fn upsert(&self, table: &TableSpec, rows: &[Record]) -> Result<()>;

    /// Most recent financial report for a stock code, by period descending
    async fn latest_report(&self, stock_code: &str) -> Result<Option<Record>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub start: usize,
    pub end: usize,
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn rows(&self) -> usize {
        self.end - self.start
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-batch outcome of one table upload
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertReport {
    pub table: &'static str,
    pub total_rows: usize,
    pub batches: Vec<BatchOutcome>,
}

impl UpsertReport {
    pub fn rows_written(&self) -> usize {
        self.batches.iter().filter(|b| b.succeeded()).map(|b| b.rows()).sum()
    }

    pub fn failed_batches(&self) -> Vec<&BatchOutcome> {
        self.batches.iter().filter(|b| !b.succeeded()).collect()
    }

    /// False only when there was data and no batch made it through
    pub fn is_success(&self) -> bool {
        self.total_rows == 0 || self.rows_written() > 0
    }
}

/// Sanitize and upsert records in fixed-size batches
///
/// A failed batch is logged with its offset range and the remaining batches
/// still run.
pub async fn upsert_in_batches(
    store: &dyn RecordStore,
    table: &TableSpec,
    records: Vec<Record>,
    batch_size: usize,
) -> UpsertReport {
    let total = records.len();
    let batch_size = batch_size.max(1);
    info!("📤 Uploading {} rows to '{}'...", total, table.name);

    let mut report = UpsertReport {
        table: table.name,
        total_rows: total,
        batches: Vec::new(),
    };

    let mut start = 0;
    let mut pending = records.into_iter().peekable();
    while pending.peek().is_some() {
        let batch: Vec<Record> = pending.by_ref().take(batch_size).map(sanitize_record).collect();
        let end = start + batch.len();

        let outcome = match store.upsert(table, &batch).await {
            Ok(()) => {
                info!("  - Processed {} / {}", end, total);
                BatchOutcome { start, end, error: None }
            }
            Err(e) => {
                error!("  ❌ Batch {}..{} for '{}' failed: {}", start, end, table.name, e);
                BatchOutcome {
                    start,
                    end,
                    error: Some(e.to_string()),
                }
            }
        };
        report.batches.push(outcome);
        start = end;
    }

    report
}

/// Store rows for the company table; absent source columns are left out
pub fn entity_records(table: &EntityTable) -> Vec<Record> {
    table
        .records
        .iter()
        .map(|entity| {
            let mut record = Record::new();
            record.insert("stock_code".into(), FieldValue::Text(entity.stock_code.clone()));
            for column in &table.columns {
                let value: FieldValue = match column {
                    EntityColumn::CompanyName => entity.company_name.clone().into(),
                    EntityColumn::Industry => entity.industry.clone().into(),
                    EntityColumn::Address => entity.address.clone().into(),
                    EntityColumn::MarketType => entity.market_type.clone().into(),
                    EntityColumn::MarketCapRecent => entity.market_cap_recent.into(),
                };
                record.insert(column.field_name().to_string(), value);
            }
            record.insert("region".into(), entity.region.clone().into());
            record
        })
        .collect()
}

fn store_column_name(column: &str) -> &str {
    REPORT_COLUMN_ALIASES
        .iter()
        .find(|(from, _)| *from == column)
        .map(|(_, to)| *to)
        .unwrap_or(column)
}

/// Store rows for the report table; every row carries every column
pub fn report_records(table: &ReportTable) -> Vec<Record> {
    table
        .reports
        .iter()
        .map(|report| {
            let mut record = Record::new();
            record.insert("stock_code".into(), FieldValue::Text(report.stock_code.clone()));
            record.insert("period".into(), FieldValue::Text(report.period.clone()));
            for column in &table.columns {
                record.insert(
                    store_column_name(column).to_string(),
                    FieldValue::Float(report.value(column)),
                );
            }
            record
        })
        .collect()
}
