use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fin_risk_loader::analysis::{risk_score, RiskWeights};
use fin_risk_loader::api::SupabaseClient;
use fin_risk_loader::database::{MemoryStore, RecordStore};
use fin_risk_loader::models::Config;
use fin_risk_loader::pipeline::{self, LoadSummary};

#[derive(Parser, Debug)]
#[command(
    name = "fin-risk-loader",
    about = "Normalize vendor financial statement exports and load risk ratios"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Raw exports → processed company and report CSVs
    Preprocess,
    /// Processed CSVs → risk ratios → remote store
    Load {
        /// Upsert into an in-memory store instead of the remote one
        #[arg(long)]
        dry_run: bool,
    },
    /// Preprocess then load
    Run {
        #[arg(long)]
        dry_run: bool,
    },
    /// Risk score for one company from its latest stored report
    Score {
        #[arg(long)]
        stock_code: String,
        #[arg(long, default_value_t = 0.5)]
        debt: f64,
        #[arg(long, default_value_t = 0.3)]
        current: f64,
        #[arg(long, default_value_t = 0.2)]
        z_score: f64,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fin_risk_loader=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}

/// Remote client, or the in-memory store for dry runs
///
/// Credentials are checked here, before any file is touched.
fn open_store(config: &Config, dry_run: bool) -> Result<Box<dyn RecordStore>> {
    if dry_run {
        info!("🧪 Dry run: using in-memory store");
        return Ok(Box::new(MemoryStore::new()));
    }
    let credentials = config.store_credentials()?;
    info!("🔌 Connecting to store at {}", credentials.url);
    Ok(Box::new(SupabaseClient::new(&credentials)?))
}

fn report_load(summary: &LoadSummary) -> Result<()> {
    let failed = summary.failed_batches();
    if !summary.is_success() {
        bail!("no rows were written ({} failed batches)", failed);
    }
    if failed > 0 {
        println!("⚠️  Completed with {} failed batches", failed);
    } else {
        println!("🎉 All tasks completed successfully!");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Preprocess => {
            let summary = pipeline::preprocess(&config)?;
            println!(
                "✅ Companies: {}, reports: {} rows × {} columns",
                summary.companies.unwrap_or(0),
                summary.reports,
                summary.report_columns
            );
        }
        Commands::Load { dry_run } => {
            let store = open_store(&config, dry_run)?;
            let summary = pipeline::load(&config, store.as_ref()).await?;
            report_load(&summary)?;
        }
        Commands::Run { dry_run } => {
            let store = open_store(&config, dry_run)?;
            pipeline::preprocess(&config)?;
            let summary = pipeline::load(&config, store.as_ref()).await?;
            report_load(&summary)?;
        }
        Commands::Score {
            stock_code,
            debt,
            current,
            z_score,
        } => {
            let store = open_store(&config, false)?;
            let weights = RiskWeights {
                debt,
                current,
                z_score,
            };
            match risk_score(store.as_ref(), &stock_code, &weights).await? {
                Some(score) => println!(
                    "👉 {} ({}): risk score {}",
                    score.stock_code,
                    score.period.as_deref().unwrap_or("?"),
                    score.total
                ),
                None => println!("No data for {}", stock_code),
            }
        }
    }

    Ok(())
}
