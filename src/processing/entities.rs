use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{EntityColumn, EntityRecord, EntityTable, RawTable};
use crate::utils::{non_blank, parse_numeric};

pub const STOCK_CODE_COLUMN: &str = "종목코드";
pub const COMPANY_NAME_COLUMN: &str = "종목명";
const INDUSTRY_COLUMN: &str = "691300.NICS 산업분류";
const ADDRESS_COLUMN: &str = "691090.본사주소";
const MARKET_TYPE_COLUMN: &str = "691035.시장구분";
/// Market cap headers carry a trailing date, so they are matched by substring
const MARKET_CAP_FRAGMENT: &str = "시가총액";

/// Short region tokens expanded to their administrative names
const REGION_REWRITES: &[(&str, &str)] = &[
    ("서울", "서울시"),
    ("경기", "경기도"),
    ("인천", "인천광역시"),
    ("부산", "부산광역시"),
];

static POSTAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\(\d+\)\s*").expect("Failed to compile postal prefix regex"));

/// Region name from a registered address
///
/// `"(06164) 서울 강남구 ... (삼성동)"` → `"서울시"`. Only a leading
/// parenthesized postal code is stripped.
pub fn extract_region(address: Option<&str>) -> Option<String> {
    let address = address?.trim();
    if address.is_empty() {
        return None;
    }
    let cleaned = POSTAL_PREFIX.replace(address, "");
    let token = cleaned.split_whitespace().next()?;

    let region = REGION_REWRITES
        .iter()
        .find(|(short, _)| *short == token)
        .map(|(_, full)| full.to_string())
        .unwrap_or_else(|| token.to_string());
    Some(region)
}

/// Build the company table from the info export
///
/// Missing descriptive columns are left out; only the stock code column is
/// required. Rows without a code are skipped and a repeated code keeps the
/// values of its last row.
pub fn build_entity_table(table: &RawTable) -> Result<EntityTable> {
    let code_col = table
        .column_index(STOCK_CODE_COLUMN)
        .ok_or_else(|| PipelineError::Schema {
            source_name: table.name.clone(),
            column: STOCK_CODE_COLUMN.to_string(),
        })?;

    let mut present: Vec<(EntityColumn, usize)> = Vec::new();
    for column in EntityColumn::ALL {
        let index = match column {
            EntityColumn::CompanyName => table.column_index(COMPANY_NAME_COLUMN),
            EntityColumn::Industry => table.column_index(INDUSTRY_COLUMN),
            EntityColumn::Address => table.column_index(ADDRESS_COLUMN),
            EntityColumn::MarketType => table.column_index(MARKET_TYPE_COLUMN),
            EntityColumn::MarketCapRecent => table.column_containing(MARKET_CAP_FRAGMENT),
        };
        if let Some(index) = index {
            present.push((column, index));
        }
    }

    let mut records: Vec<EntityRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0;

    for row in 0..table.rows.len() {
        let Some(stock_code) = non_blank(table.cell(row, code_col)) else {
            skipped += 1;
            continue;
        };

        let mut record = EntityRecord {
            stock_code: stock_code.clone(),
            ..EntityRecord::default()
        };
        for (column, index) in &present {
            let cell = table.cell(row, *index);
            match column {
                EntityColumn::CompanyName => record.company_name = non_blank(cell),
                EntityColumn::Industry => record.industry = non_blank(cell),
                EntityColumn::Address => record.address = non_blank(cell),
                EntityColumn::MarketType => record.market_type = non_blank(cell),
                EntityColumn::MarketCapRecent => record.market_cap_recent = parse_numeric(cell),
            }
        }
        record.region = extract_region(record.address.as_deref());

        match positions.get(&stock_code) {
            Some(&pos) => {
                debug!("Duplicate stock code {}, keeping last row", stock_code);
                records[pos] = record;
            }
            None => {
                positions.insert(stock_code, records.len());
                records.push(record);
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} rows without a stock code in {}", skipped, table.name);
    }
    info!("🏢 Built {} company records from {}", records.len(), table.name);

    Ok(EntityTable {
        columns: present.into_iter().map(|(c, _)| c).collect(),
        records,
    })
}
