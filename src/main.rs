//! CLI entry point for the HDB resale pipeline.
//!
//! Provides subcommands for a full pipeline run, fetching a single geodata
//! document, and training the model on a saved feature table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hdb_resale_pipeline::PipelineConfig;
use hdb_resale_pipeline::config::ModelSettings;
use hdb_resale_pipeline::pipeline::{fetch_geodata, geodata_client, run, train_from_file};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hdb_resale_pipeline")]
#[command(about = "Clean HDB resale data, derive proximity features, and fit a price model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extraction, cleaning, feature engineering and modelling
    Run {
        /// JSON config file
        #[arg(short, long, default_value = "pipeline.json")]
        config: PathBuf,
    },
    /// Fetch one geodata document and save it as JSON
    FetchGeodata {
        /// URL (or local path) of the geodata document
        #[arg(short, long)]
        url: String,

        /// File to write the JSON document to
        #[arg(short, long)]
        output: PathBuf,

        /// Warn when fewer elements than this are returned
        #[arg(short = 'm', long, default_value_t = 0)]
        min_expected: usize,

        /// Label used in logs, e.g. "MRT" or "mall"
        #[arg(short, long, default_value = "geodata")]
        label: String,
    },
    /// Train the price model on a saved feature table
    Train {
        /// Feature table CSV (optionally .gz)
        #[arg(short, long, default_value = "data/processed/feature_set.csv")]
        features: PathBuf,

        /// Directory for model_info.json and model_performance.csv
        #[arg(short = 'd', long, default_value = "data/processed")]
        output_dir: PathBuf,

        #[arg(long, default_value_t = 0.2)]
        test_size: f64,

        #[arg(long, default_value_t = 42)]
        random_state: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/hdb_resale_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hdb_resale_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .with_env_var("RUST_LOG_JSON")
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let api_key = PipelineConfig::geodata_api_key();

    match cli.command {
        Commands::Run { config } => {
            let config = PipelineConfig::load(&config)
                .with_context(|| format!("loading config {}", config.display()))?;
            let client = geodata_client(api_key.as_deref())?;

            let summary = run(&config, client.as_ref()).await?;

            info!(
                outputs = summary.outputs.len(),
                feature_rows = summary.feature_report.complete_rows,
                test_r2 = ?summary.model.test_metrics.map(|m| m.r2),
                "Run finished"
            );
        }
        Commands::FetchGeodata {
            url,
            output,
            min_expected,
            label,
        } => {
            let client = geodata_client(api_key.as_deref())?;
            let count = fetch_geodata(client.as_ref(), &url, &output, min_expected, &label).await?;
            info!(elements = count, "Geodata fetched");
        }
        Commands::Train {
            features,
            output_dir,
            test_size,
            random_state,
        } => {
            let settings = ModelSettings {
                test_size,
                random_state,
            };
            let info = train_from_file(&features, &output_dir, settings)?;
            info!(
                train_r2 = info.train_metrics.r2,
                n_train = info.n_train_samples,
                n_test = info.n_test_samples,
                "Training finished"
            );
        }
    }

    Ok(())
}
