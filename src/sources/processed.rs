//! Processed CSV artifacts shared by the preprocess and load steps

use csv::{ReaderBuilder, Writer};
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::models::{EntityColumn, EntityRecord, EntityTable, FinancialReport, ReportTable};
use crate::processing::extract_region;
use crate::utils::{format_number, non_blank, parse_numeric};

pub const COMPANY_INFO_FILE: &str = "company_info.csv";
pub const FINANCE_REPORT_FILE: &str = "finance_data_final.csv";

const STOCK_CODE: &str = "stock_code";
const PERIOD: &str = "period";
const REGION: &str = "region";

fn entity_cell(record: &EntityRecord, column: EntityColumn) -> String {
    match column {
        EntityColumn::CompanyName => record.company_name.clone().unwrap_or_default(),
        EntityColumn::Industry => record.industry.clone().unwrap_or_default(),
        EntityColumn::Address => record.address.clone().unwrap_or_default(),
        EntityColumn::MarketType => record.market_type.clone().unwrap_or_default(),
        EntityColumn::MarketCapRecent => record
            .market_cap_recent
            .map(format_number)
            .unwrap_or_default(),
    }
}

pub fn write_entity_csv(path: &Path, table: &EntityTable) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    let mut header = vec![STOCK_CODE];
    header.extend(table.columns.iter().map(|c| c.field_name()));
    header.push(REGION);
    wtr.write_record(&header)?;

    for record in &table.records {
        let mut row = vec![record.stock_code.clone()];
        row.extend(table.columns.iter().map(|c| entity_cell(record, *c)));
        row.push(record.region.clone().unwrap_or_default());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    info!("💾 Saved {} companies to {}", table.len(), path.display());
    Ok(())
}

pub fn read_entity_csv(path: &Path) -> Result<EntityTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let source_name = path.display().to_string();

    let code_col = headers
        .iter()
        .position(|h| h == STOCK_CODE)
        .ok_or_else(|| PipelineError::Schema {
            source_name: source_name.clone(),
            column: STOCK_CODE.to_string(),
        })?;
    let region_col = headers.iter().position(|h| h == REGION);
    let columns: Vec<(EntityColumn, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| EntityColumn::from_field_name(h).map(|c| (c, i)))
        .collect();

    let mut table = EntityTable {
        columns: columns.iter().map(|(c, _)| *c).collect(),
        records: Vec::new(),
    };

    for result in rdr.records() {
        let row = result?;
        let cell = |i: usize| row.get(i).unwrap_or("");
        let Some(stock_code) = non_blank(cell(code_col)) else {
            continue;
        };

        let mut record = EntityRecord {
            stock_code,
            ..EntityRecord::default()
        };
        for (column, index) in &columns {
            let value = cell(*index);
            match column {
                EntityColumn::CompanyName => record.company_name = non_blank(value),
                EntityColumn::Industry => record.industry = non_blank(value),
                EntityColumn::Address => record.address = non_blank(value),
                EntityColumn::MarketType => record.market_type = non_blank(value),
                EntityColumn::MarketCapRecent => record.market_cap_recent = parse_numeric(value),
            }
        }
        record.region = match region_col {
            Some(i) => non_blank(cell(i)),
            None => extract_region(record.address.as_deref()),
        };
        table.records.push(record);
    }

    Ok(table)
}

pub fn write_report_csv(path: &Path, table: &ReportTable) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    let mut header = vec![STOCK_CODE.to_string(), PERIOD.to_string()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;

    for report in &table.reports {
        let mut row = vec![report.stock_code.clone(), report.period.clone()];
        row.extend(table.columns.iter().map(|c| format_number(report.value(c))));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    info!(
        "💾 Saved {} reports ({} columns) to {}",
        table.len(),
        header.len(),
        path.display()
    );
    Ok(())
}

pub fn read_report_csv(path: &Path) -> Result<ReportTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let source_name = path.display().to_string();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::Schema {
                source_name: source_name.clone(),
                column: name.to_string(),
            })
    };
    let code_col = position(STOCK_CODE)?;
    let period_col = position(PERIOD)?;

    let value_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != code_col && *i != period_col)
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut table = ReportTable {
        columns: value_cols.iter().map(|(_, h)| h.clone()).collect(),
        reports: Vec::new(),
    };

    for result in rdr.records() {
        let row = result?;
        let Some(stock_code) = row.get(code_col).and_then(non_blank) else {
            continue;
        };
        let period = row.get(period_col).unwrap_or("").to_string();

        let mut report = FinancialReport::new(stock_code, period);
        for (index, column) in &value_cols {
            if let Some(value) = row.get(*index).and_then(parse_numeric) {
                report.set(column.clone(), value);
            }
        }
        table.reports.push(report);
    }

    Ok(table)
}
