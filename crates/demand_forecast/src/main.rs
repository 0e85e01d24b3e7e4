//! Demand forecast CLI.
//!
//! Generates and loads sample sales data, curates it, trains and registers
//! the forecast model, and serves predictions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{InferenceMode, RegistryBackend, Settings, SettingsOverrides, StorageScheme};
use database::{create_pool, run_migrations};
use demand_forecast::AppContext;
use demand_forecast::commands;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Demand forecast pipeline for seller sales data
#[derive(Parser)]
#[command(name = "forecast")]
#[command(about = "Train, register and serve demand forecast models")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Deployment environment (overrides `MERLIN_ENV`)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Storage backend: s3, file or memory
    #[arg(long, global = true)]
    storage: Option<StorageScheme>,

    /// Registry backend: `object_store` or postgres
    #[arg(long, global = true)]
    registry: Option<RegistryBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write synthetic sales records to a JSON file
    Generate {
        /// Number of days per SKU
        #[arg(short, long, default_value = "30")]
        days: u32,

        /// Output file
        #[arg(short, long, default_value = "data/sample/sales.json")]
        output: PathBuf,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate and upload sample JSON files to the landing bucket
    Load {
        /// Directory containing sample JSON files
        #[arg(short, long, default_value = "data/sample")]
        path: PathBuf,
    },

    /// Validate one seller payload and stage it in the landing bucket
    Ingest {
        /// Seller the payload belongs to
        #[arg(short, long)]
        seller: String,

        /// JSON file holding an array of sales records
        file: PathBuf,
    },

    /// Normalize landing payloads into curated partitions
    Curate,

    /// Train on curated data, upload the artifact and register the model
    Train,

    /// Predict from a JSON payload with an `instances` key
    Predict {
        /// Payload file (reads stdin when omitted)
        #[arg(short, long)]
        payload: Option<PathBuf>,

        /// Inference mode: local, or anything else for the remote endpoint
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<InferenceMode>,

        /// Remote endpoint name
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Run registry database migrations
    Migrate,
}

#[expect(clippy::unnecessary_wraps, reason = "clap value parsers return Result")]
fn parse_mode(value: &str) -> Result<InferenceMode, String> {
    Ok(InferenceMode::parse(value))
}

/// Verbose flag beats `MERLIN_LOG_LEVEL`, which beats the `info` default.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    std::env::var("MERLIN_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(log_filter(cli.verbose)).init();

    let mut overrides = SettingsOverrides {
        env: cli.env,
        storage_scheme: cli.storage,
        registry_backend: cli.registry,
        ..SettingsOverrides::default()
    };

    match cli.command {
        Commands::Generate { days, output, seed } => {
            commands::generate::run(&output, days, seed)?;
        }
        Commands::Migrate => {
            let settings = Settings::load(&overrides)?;
            let url = settings.database_url.context("DATABASE_URL must be set to run migrations")?;
            let pool = create_pool(&url).await?;
            run_migrations(&pool).await?;
            info!("Migrations completed successfully");
        }
        Commands::Load { path } => {
            let ctx = AppContext::connect(Settings::load(&overrides)?).await?;
            commands::load::run(&ctx, &path).await?;
        }
        Commands::Ingest { seller, file } => {
            let ctx = AppContext::connect(Settings::load(&overrides)?).await?;
            commands::ingest::run(&ctx, &seller, &file).await?;
        }
        Commands::Curate => {
            let ctx = AppContext::connect(Settings::load(&overrides)?).await?;
            commands::curate::run(&ctx).await?;
        }
        Commands::Train => {
            let ctx = AppContext::connect(Settings::load(&overrides)?).await?;
            commands::train::run(&ctx).await?;
        }
        Commands::Predict {
            payload,
            mode,
            endpoint,
        } => {
            overrides.inference_mode = mode;
            overrides.forecast_endpoint_name = endpoint;
            let ctx = AppContext::connect(Settings::load(&overrides)?).await?;
            commands::predict::run(&ctx, payload.as_deref()).await?;
        }
    }

    Ok(())
}
