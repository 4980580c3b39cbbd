//! Raw input discovery and reading
//!
//! Vendor exports carry a title row above the real header, so every source
//! is read with the header at row index 1.

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::RawTable;

pub mod processed;

/// Rows above the header row
const HEADER_ROW: usize = 1;

static NUMBERED_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\d+\)").expect("Failed to compile numbered file regex"));

/// Input files found under the raw data directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFiles {
    pub info: Option<PathBuf>,
    pub finance: Vec<PathBuf>,
}

/// Find info and finance sources under `raw_dir`
///
/// Files named with a parenthesized number, e.g. `VALUESearch (3).xlsx`, are
/// finance exports; the remaining match is the company info export.
pub fn discover_sources(raw_dir: &Path, prefix: &str) -> Result<SourceFiles> {
    let entries = std::fs::read_dir(raw_dir).map_err(|e| {
        PipelineError::NoInput(format!("cannot read {}: {}", raw_dir.display(), e))
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("~$") || !name.starts_with(prefix) || !is_supported(&path) {
            debug!("Skipping {}", name);
            continue;
        }
        candidates.push(path);
    }

    if candidates.is_empty() {
        return Err(PipelineError::NoInput(format!(
            "no '{}*' .csv/.xlsx files in {}",
            prefix,
            raw_dir.display()
        )));
    }
    candidates.sort();

    let mut files = SourceFiles::default();
    for path in candidates {
        let name = file_label(&path);
        if NUMBERED_FILE.is_match(&name) {
            files.finance.push(path);
        } else if let Some(previous) = files.info.replace(path) {
            warn!("⚠️ Multiple info files found, ignoring {}", previous.display());
        }
    }

    info!(
        "📁 Found info file: {}, finance files: {}",
        files.info.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "none".into()),
        files.finance.len()
    );
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a CSV or spreadsheet source, header at row index 1
pub fn read_table(path: &Path) -> Result<RawTable> {
    let grid = if is_csv(path) {
        read_csv_grid(path)?
    } else {
        read_workbook_grid(path)?
    };
    let table = grid_to_table(file_label(path), grid);
    debug!(
        "Read {}: {} columns, {} rows",
        table.name,
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

fn read_csv_grid(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut grid: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        grid.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    if let Some(first) = grid.first_mut().and_then(|row| row.first_mut()) {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }
    Ok(grid)
}

fn read_workbook_grid(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Split a cell grid into header and data rows
pub fn grid_to_table(name: String, mut grid: Vec<Vec<String>>) -> RawTable {
    if grid.len() <= HEADER_ROW {
        return RawTable::new(name, Vec::new(), Vec::new());
    }
    let rows = grid.split_off(HEADER_ROW + 1);
    let headers = grid.pop().unwrap_or_default();
    RawTable::new(name, headers, rows)
}
