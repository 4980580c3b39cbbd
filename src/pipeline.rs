//! Preprocess (raw exports → processed CSVs) and load (CSVs → remote store)

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::account_mapping::AccountMapper;
use crate::analysis::enrich_table;
use crate::database::{
    entity_records, report_records, upsert_in_batches, RecordStore, UpsertReport, COMPANIES,
    FINANCIAL_REPORTS, REPORT_COLUMN_ALIASES,
};
use crate::error::{PipelineError, Result};
use crate::models::Config;
use crate::processing::{build_entity_table, reshape, ReshapeStats};
use crate::sources::processed::{
    read_entity_csv, read_report_csv, write_entity_csv, write_report_csv, COMPANY_INFO_FILE,
    FINANCE_REPORT_FILE,
};
use crate::sources::{discover_sources, file_label, read_table};

#[derive(Debug, Clone)]
pub struct PreprocessSummary {
    pub started_at: DateTime<Utc>,
    pub companies: Option<usize>,
    pub finance_files: usize,
    pub unreadable_files: usize,
    pub reshape: ReshapeStats,
    pub reports: usize,
    pub report_columns: usize,
    pub company_csv: Option<PathBuf>,
    pub report_csv: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub started_at: DateTime<Utc>,
    pub companies: Option<UpsertReport>,
    pub reports: Option<UpsertReport>,
}

impl LoadSummary {
    pub fn failed_batches(&self) -> usize {
        self.uploads().map(|u| u.failed_batches().len()).sum()
    }

    /// False when some table had rows and none of them were written
    pub fn is_success(&self) -> bool {
        self.uploads().all(UpsertReport::is_success)
    }

    fn uploads(&self) -> impl Iterator<Item = &UpsertReport> {
        self.companies.iter().chain(self.reports.iter())
    }
}

/// Turn the raw vendor exports into the two processed CSVs
///
/// Unreadable or malformed sources are logged and skipped; only a raw
/// directory without any matching file stops the run.
pub fn preprocess(config: &Config) -> Result<PreprocessSummary> {
    let started_at = Utc::now();
    info!("🚀 Preprocessing raw data in {}", config.raw_data_path.display());

    let files = discover_sources(&config.raw_data_path, &config.source_file_prefix)?;
    std::fs::create_dir_all(&config.processed_data_path)?;

    let mut company_csv = None;
    let mut companies = None;
    match &files.info {
        Some(path) => {
            info!("🏢 Processing info: {}", file_label(path));
            match read_table(path).and_then(|t| build_entity_table(&t)) {
                Ok(entities) => {
                    let out = config.processed_data_path.join(COMPANY_INFO_FILE);
                    write_entity_csv(&out, &entities)?;
                    companies = Some(entities.len());
                    company_csv = Some(out);
                }
                Err(e) => error!("❌ Skipping info file {}: {}", file_label(path), e),
            }
        }
        None => warn!("⚠️ No info file found, company table not rebuilt"),
    }
    if company_csv.is_none() {
        remove_stale(&config.processed_data_path.join(COMPANY_INFO_FILE))?;
    }

    let mut tables = Vec::with_capacity(files.finance.len());
    let mut unreadable_files = 0;
    for path in &files.finance {
        info!("📈 Processing finance: {}", file_label(path));
        match read_table(path) {
            Ok(table) => tables.push(table),
            Err(e) => {
                unreadable_files += 1;
                error!("❌ Failed to read {}: {}", file_label(path), e);
            }
        }
    }

    let result = reshape(&tables, AccountMapper::standard());
    let report_csv = config.processed_data_path.join(FINANCE_REPORT_FILE);
    write_report_csv(&report_csv, &result.table)?;

    let summary = PreprocessSummary {
        started_at,
        companies,
        finance_files: files.finance.len(),
        unreadable_files,
        reports: result.table.len(),
        report_columns: result.table.columns.len() + 2,
        reshape: result.stats,
        company_csv,
        report_csv,
    };
    info!(
        "✅ Preprocess finished in {}s: {} companies, {} reports",
        (Utc::now() - started_at).num_seconds(),
        summary.companies.unwrap_or(0),
        summary.reports
    );
    Ok(summary)
}

/// Drop an output left by an earlier run so `load` cannot pick it up
fn remove_stale(path: &Path) -> Result<()> {
    if path.exists() {
        warn!("🗑️ Removing stale {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Compute ratios and upsert both processed tables into the store
pub async fn load(config: &Config, store: &dyn RecordStore) -> Result<LoadSummary> {
    let started_at = Utc::now();
    let company_path = config.processed_data_path.join(COMPANY_INFO_FILE);
    let report_path = config.processed_data_path.join(FINANCE_REPORT_FILE);

    if !company_path.exists() && !report_path.exists() {
        return Err(PipelineError::NoInput(format!(
            "neither {} nor {} exists in {}",
            COMPANY_INFO_FILE,
            FINANCE_REPORT_FILE,
            config.processed_data_path.display()
        )));
    }

    let mut summary = LoadSummary {
        started_at,
        companies: None,
        reports: None,
    };

    if company_path.exists() {
        info!("🏢 Processing companies");
        let entities = read_entity_csv(&company_path)?;
        let records = entity_records(&entities);
        summary.companies =
            Some(upsert_in_batches(store, &COMPANIES, records, config.company_batch_size).await);
    } else {
        warn!("⚠️ {} not found, skipping companies", COMPANY_INFO_FILE);
    }

    if report_path.exists() {
        info!("📊 Processing financial reports");
        let table = read_report_csv(&report_path)?;
        for (from, to) in REPORT_COLUMN_ALIASES {
            if table.columns.iter().any(|c| c == from) {
                info!("Renaming column '{}' -> '{}'", from, to);
            }
        }
        let table = enrich_table(table);
        let records = report_records(&table);
        summary.reports = Some(
            upsert_in_batches(store, &FINANCIAL_REPORTS, records, config.report_batch_size).await,
        );
    } else {
        warn!("⚠️ {} not found, skipping financial reports", FINANCE_REPORT_FILE);
    }

    for upload in summary.uploads() {
        info!(
            "📦 {}: {} / {} rows written, {} failed batches",
            upload.table,
            upload.rows_written(),
            upload.total_rows,
            upload.failed_batches().len()
        );
    }
    Ok(summary)
}
