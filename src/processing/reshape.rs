//! Wide financial exports → long observations → pivoted report table

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

use crate::account_mapping::AccountMapper;
use crate::error::{PipelineError, Result};
use crate::models::{FinancialReport, RawObservation, RawTable, ReportTable};
use crate::processing::entities::{COMPANY_NAME_COLUMN, STOCK_CODE_COLUMN};
use crate::utils::{non_blank, parse_numeric};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReshapeStats {
    pub sources_processed: usize,
    pub sources_skipped: usize,
    pub sources_without_values: usize,
    pub blank_rows_dropped: usize,
    pub observations: usize,
}

#[derive(Debug, Default, Clone)]
pub struct ReshapeResult {
    pub table: ReportTable,
    pub stats: ReshapeStats,
}

/// Observations extracted from one source table
#[derive(Debug, Default, Clone)]
pub struct SourceObservations {
    pub observations: Vec<RawObservation>,
    pub value_columns: usize,
    pub blank_rows_dropped: usize,
}

/// Melt one wide source into long observations
///
/// Value columns are the non-identifier headers carrying a known label.
/// Rows where no value column parses as a number are dropped first, then
/// every remaining numeric cell becomes one observation, in row-then-column
/// order.
pub fn extract_observations(
    table: &RawTable,
    mapper: &AccountMapper,
) -> Result<SourceObservations> {
    let code_col = table
        .column_index(STOCK_CODE_COLUMN)
        .ok_or_else(|| PipelineError::Schema {
            source_name: table.name.clone(),
            column: STOCK_CODE_COLUMN.to_string(),
        })?;
    let name_col = table.column_index(COMPANY_NAME_COLUMN);

    // (column index, period, field)
    let mut value_columns: Vec<(usize, String, String)> = Vec::new();
    for (index, header) in table.headers.iter().enumerate() {
        if index == code_col || Some(index) == name_col {
            continue;
        }
        match mapper.resolve(header) {
            Some((period, field)) => value_columns.push((index, period, field.to_string())),
            None => debug!("Unmapped header in {}: {}", table.name, header),
        }
    }

    let mut extracted = SourceObservations {
        value_columns: value_columns.len(),
        ..SourceObservations::default()
    };
    if value_columns.is_empty() {
        return Ok(extracted);
    }

    for row in 0..table.rows.len() {
        let values: Vec<Option<f64>> = value_columns
            .iter()
            .map(|(index, _, _)| parse_numeric(table.cell(row, *index)))
            .collect();

        if values.iter().all(Option::is_none) {
            extracted.blank_rows_dropped += 1;
            continue;
        }

        let Some(stock_code) = non_blank(table.cell(row, code_col)) else {
            debug!("Row {} in {} has values but no stock code", row, table.name);
            continue;
        };

        for ((_, period, field), value) in value_columns.iter().zip(values) {
            if let Some(value) = value {
                extracted.observations.push(RawObservation {
                    stock_code: stock_code.clone(),
                    period: period.clone(),
                    account: field.clone(),
                    value,
                });
            }
        }
    }

    Ok(extracted)
}

/// Pivot observations into one row per (stock_code, period)
///
/// Duplicate (stock_code, period, account) keys resolve last-wins in
/// observation order. Rows and account columns come out sorted.
pub fn pivot(observations: &[RawObservation]) -> ReportTable {
    let mut grouped: BTreeMap<(String, String), BTreeMap<String, f64>> = BTreeMap::new();
    let mut columns: BTreeSet<String> = BTreeSet::new();

    for obs in observations {
        columns.insert(obs.account.clone());
        grouped
            .entry((obs.stock_code.clone(), obs.period.clone()))
            .or_default()
            .insert(obs.account.clone(), obs.value);
    }

    let reports = grouped
        .into_iter()
        .map(|((stock_code, period), values)| FinancialReport {
            stock_code,
            period,
            values,
        })
        .collect();

    ReportTable {
        columns: columns.into_iter().collect(),
        reports,
    }
}

/// Reshape every finance source and pivot the combined observations
///
/// A source failing its schema check is logged and skipped. No value
/// columns anywhere yields an empty table.
pub fn reshape(sources: &[RawTable], mapper: &AccountMapper) -> ReshapeResult {
    let mut stats = ReshapeStats::default();
    let mut observations = Vec::new();

    for source in sources {
        match extract_observations(source, mapper) {
            Ok(extracted) => {
                stats.sources_processed += 1;
                stats.blank_rows_dropped += extracted.blank_rows_dropped;
                if extracted.value_columns == 0 {
                    stats.sources_without_values += 1;
                    warn!("⚠️ No account columns found in {}", source.name);
                    continue;
                }
                info!(
                    "📊 {}: {} value columns, {} observations, {} blank rows dropped",
                    source.name,
                    extracted.value_columns,
                    extracted.observations.len(),
                    extracted.blank_rows_dropped
                );
                observations.extend(extracted.observations);
            }
            Err(e) => {
                stats.sources_skipped += 1;
                error!("❌ Skipping {}: {}", source.name, e);
            }
        }
    }

    stats.observations = observations.len();
    let table = pivot(&observations);
    info!(
        "✅ Pivoted {} observations into {} reports with {} account columns",
        stats.observations,
        table.len(),
        table.columns.len()
    );

    ReshapeResult { table, stats }
}
