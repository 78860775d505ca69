//! CLI entry point for the bike-sharing analytics pipeline.
//!
//! Provides subcommands for a single-level run, a run over both levels,
//! acquisition only, and a terminal view of an output directory.

use anyhow::Result;
use bikeshare_rap::config::{Level, PipelineConfig};
use bikeshare_rap::dashboard::Dashboard;
use bikeshare_rap::fetch::{self, BasicClient, FsCache};
use bikeshare_rap::pipeline::{self, RunSummary};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_rap")]
#[command(about = "Reproducible analytics over the UCI Bike Sharing dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct DirArgs {
    /// Root of the raw and processed data
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for tables, text and figures
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Directory for REPORT.md
    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,
}

impl DirArgs {
    fn config(&self, level: Level) -> PipelineConfig {
        PipelineConfig {
            level,
            data_dir: self.data_dir.clone(),
            output_dir: self.output_dir.clone(),
            reports_dir: self.reports_dir.clone(),
            ..PipelineConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one dataset level
    Run {
        /// Dataset level, `hour` or `day`; anything else falls back to `hour`
        #[arg(short, long, env = "BIKE_LEVEL", default_value = "hour")]
        level: String,

        /// Use this CSV instead of the cached UCI download
        #[arg(long, value_name = "CSV")]
        input: Option<PathBuf>,

        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Run the pipeline for the hour level, then the day level
    RunAll {
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Download and unpack the raw dataset without analyzing it
    Fetch {
        #[arg(short, long, env = "BIKE_LEVEL", default_value = "hour")]
        level: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = fetch::DEFAULT_TIMEOUT.as_secs())]
        timeout_secs: u64,

        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Print a summary of the artifacts in an output directory
    Show {
        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },
}

fn log_run(summary: &RunSummary) {
    info!(
        level = %summary.level,
        rows = summary.rows,
        artifacts = summary.artifacts.paths().len(),
        "Run complete"
    );
    if let Some(report) = summary.models.available() {
        for s in &report.comparison {
            info!(model = %s.model, rmse = s.rmse, r2 = s.r2, "Model");
        }
    }
    if summary.missing.is_empty() {
        info!("Check: outputs/, reports/, data/processed/");
    } else {
        warn!(missing = summary.missing.len(), "Some expected artifacts were not produced");
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bikeshare_rap.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_rap.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { level, input, dirs } => {
            let cfg = dirs.config(Level::from_selector(&level));
            let summary = match input {
                Some(csv) => pipeline::process(&cfg, &csv)?,
                None => pipeline::run(&cfg, &FsCache::new(BasicClient::new()?))?,
            };
            log_run(&summary);
        }
        Commands::RunAll { dirs } => {
            let cache = FsCache::new(BasicClient::new()?);
            for level in Level::ALL {
                info!(%level, "Running level");
                let summary = pipeline::run(&dirs.config(level), &cache)?;
                log_run(&summary);
            }
        }
        Commands::Fetch {
            level,
            timeout_secs,
            dirs,
        } => {
            let cfg = dirs.config(Level::from_selector(&level));
            let client = BasicClient::with_timeout(std::time::Duration::from_secs(timeout_secs))?;
            let path = fetch::ensure_dataset(&FsCache::new(client), &cfg.raw_dir(), cfg.level)?;
            info!(path = %path.display(), "Dataset ready");
        }
        Commands::Show { output_dir } => {
            let dashboard = Dashboard::load(&output_dir)?;
            println!("{}", dashboard.render());
        }
    }

    Ok(())
}
