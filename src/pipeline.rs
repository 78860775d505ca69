//! End-to-end run: acquisition, cleaning, aggregation, modeling, artifacts.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analyzers::{Aggregates, compute_aggregates};
use crate::analyzers::types::Availability;
use crate::charts::{self, ChartConfig};
use crate::config::{Level, PipelineConfig};
use crate::fetch::{self, RawCache};
use crate::loader::load_clean;
use crate::model::{BaselineReport, run_baselines};
use crate::output::{self, ArtifactSet, EnvSnapshot};
use crate::report::render_report;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub level: Level,
    pub rows: usize,
    pub aggregates: Aggregates,
    pub models: Availability<BaselineReport>,
    pub artifacts: ArtifactSet,
    /// Expected artifacts that were not written.
    pub missing: Vec<PathBuf>,
}

/// Creates the run's directories and writes the environment snapshot.
fn prepare(cfg: &PipelineConfig) -> Result<PathBuf> {
    for dir in [
        cfg.raw_dir(),
        cfg.processed_dir(),
        cfg.output_dir.clone(),
        cfg.reports_dir.clone(),
    ] {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let env_path = cfg.output_dir.join(output::ENV_FILE);
    output::write_env(&env_path, &EnvSnapshot::capture(cfg.level))?;
    Ok(env_path)
}

/// Full run for one level, acquiring the raw CSV through `cache`.
#[tracing::instrument(skip_all, fields(level = %cfg.level))]
pub fn run<R: RawCache + ?Sized>(cfg: &PipelineConfig, cache: &R) -> Result<RunSummary> {
    let env_path = prepare(cfg)?;
    let raw_csv = fetch::ensure_dataset(cache, &cfg.raw_dir(), cfg.level)
        .with_context(|| format!("acquire {} dataset", cfg.level))?;
    analyze(cfg, &raw_csv, env_path)
}

/// Runs every stage after acquisition on a CSV already on disk.
#[tracing::instrument(skip_all, fields(level = %cfg.level, raw = %raw_csv.display()))]
pub fn process(cfg: &PipelineConfig, raw_csv: &Path) -> Result<RunSummary> {
    let env_path = prepare(cfg)?;
    analyze(cfg, raw_csv, env_path)
}

fn analyze(cfg: &PipelineConfig, raw_csv: &Path, env_path: PathBuf) -> Result<RunSummary> {
    let clean = load_clean(raw_csv, cfg)?;
    if clean.date_parse_failures > 0 {
        warn!(failures = clean.date_parse_failures, "Some dates could not be parsed");
    }

    let processed_path = cfg.processed_path();
    output::write_table(&processed_path, &clean.frame)?;

    let aggregates = compute_aggregates(&clean).context("compute aggregates")?;
    let models = run_baselines(&clean, cfg).context("fit baseline models")?;

    let mut artifacts = output::write_artifacts(cfg, &aggregates, &models)?;
    artifacts.env = Some(env_path);
    artifacts.processed = Some(processed_path);
    artifacts.charts = charts::write_charts(&clean, &aggregates, &cfg.output_dir, &ChartConfig::default())?;

    let report_path = cfg.report_path();
    let base = cfg.output_dir.parent().unwrap_or(Path::new(""));
    let markdown = render_report(cfg, &aggregates, &models, &artifacts, base);
    fs::write(&report_path, markdown).with_context(|| format!("write {}", report_path.display()))?;
    artifacts.report = Some(report_path);

    let missing = output::check_artifacts(cfg);
    info!(
        rows = clean.n_rows(),
        written = artifacts.paths().len(),
        missing = missing.len(),
        "Pipeline finished"
    );

    Ok(RunSummary {
        level: cfg.level,
        rows: clean.n_rows(),
        aggregates,
        models,
        artifacts,
        missing,
    })
}
