use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::debug;

use super::{Record, RecordStore, TableSpec, FINANCIAL_REPORTS};
use crate::error::{PipelineError, Result};

type Table = BTreeMap<Vec<String>, Record>;

/// In-process store with the same keyed merge semantics as the remote one
///
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's rows ordered by natural key
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .map(|tables| {
                tables
                    .get(table)
                    .map(|t| t.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    fn poisoned() -> PipelineError {
        PipelineError::Store {
            status: 500,
            message: "memory store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, table: &TableSpec, rows: &[Record]) -> Result<()> {
        // Validate the whole batch before touching state, like a single statement
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            let key = table.key_of(row).ok_or_else(|| PipelineError::Store {
                status: 400,
                message: format!("row without natural key for '{}'", table.name),
            })?;
            keyed.push((key, row));
        }

        let mut tables = self.tables.lock().map_err(|_| Self::poisoned())?;
        let target = tables.entry(table.name).or_default();
        for (key, row) in keyed {
            let existing = target.entry(key).or_default();
            for (column, value) in row {
                existing.insert(column.clone(), value.clone());
            }
        }
        debug!("Memory store '{}' now holds {} rows", table.name, target.len());
        Ok(())
    }

    async fn latest_report(&self, stock_code: &str) -> Result<Option<Record>> {
        let tables = self.tables.lock().map_err(|_| Self::poisoned())?;
        let latest = tables.get(FINANCIAL_REPORTS.name).and_then(|t| {
            t.iter()
                .filter(|(key, _)| key.first().map(String::as_str) == Some(stock_code))
                .max_by(|(a, _), (b, _)| a.get(1).cmp(&b.get(1)))
                .map(|(_, row)| row.clone())
        });
        Ok(latest)
    }
}
