//! Output formatting and persistence for the run's artifacts.
//!
//! Result tables go through `csv`, the processed frame through the `polars`
//! CSV writer, the environment snapshot through `serde_json`, and the
//! human-readable files are plain text.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzers::types::{Availability, CategorySummary, DayTypeHourMean};
use crate::charts;
use crate::config::{Level, PipelineConfig};
use crate::model::BaselineReport;
use crate::frame::fmt_float;

pub const ENV_FILE: &str = "env.json";
pub const PEAK_HOURS_FILE: &str = "peak_hours.csv";
pub const PEAK_SUMMARY_FILE: &str = "peak_hours_summary.txt";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const METRICS_FILE: &str = "metrics.txt";
pub const COMPARISON_FILE: &str = "model_comparison.csv";

pub const PEAK_HOURS_NOTE: &str = "No 'hr' column found (day-level). Peak-hour analysis skipped.";
pub const PEAK_SUMMARY_FALLBACK: &str = "No peak-hour summary available for day-level dataset.\n";

/// Files a run is expected to leave behind, relative to the run's directories.
pub fn expected_artifacts(cfg: &PipelineConfig) -> Vec<PathBuf> {
    let out = &cfg.output_dir;
    let mut paths: Vec<PathBuf> = [
        ENV_FILE,
        METRICS_FILE,
        COMPARISON_FILE,
        SUMMARY_FILE,
        PEAK_HOURS_FILE,
        PEAK_SUMMARY_FILE,
        charts::HEATMAP_FILE,
        charts::TIMESERIES_FILE,
        charts::SCATTER_FILE,
        charts::HOURLY_FILE,
        charts::DAYTYPE_HOURLY_FILE,
    ]
    .iter()
    .map(|f| out.join(f))
    .collect();
    paths.push(cfg.report_path());
    paths.push(cfg.processed_path());
    paths
}

/// Logs every expected artifact that is not on disk and returns them.
pub fn check_artifacts(cfg: &PipelineConfig) -> Vec<PathBuf> {
    let missing: Vec<PathBuf> = expected_artifacts(cfg)
        .into_iter()
        .filter(|p| !p.exists())
        .collect();
    if missing.is_empty() {
        info!(level = %cfg.level, "All expected artifacts present");
    } else {
        for p in &missing {
            warn!(path = %p.display(), "Expected artifact not found");
        }
    }
    missing
}

/// Everything one run wrote. Optional entries are `None` when their inputs
/// were unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactSet {
    pub env: Option<PathBuf>,
    pub processed: Option<PathBuf>,
    pub peak_hours: Option<PathBuf>,
    pub peak_summary: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub metrics: Option<PathBuf>,
    pub comparison: Option<PathBuf>,
    pub charts: Vec<PathBuf>,
    pub report: Option<PathBuf>,
}

impl ArtifactSet {
    pub fn paths(&self) -> Vec<&Path> {
        [
            &self.env,
            &self.processed,
            &self.peak_hours,
            &self.peak_summary,
            &self.summary,
            &self.metrics,
            &self.comparison,
        ]
        .into_iter()
        .flatten()
        .map(PathBuf::as_path)
        .chain(self.charts.iter().map(PathBuf::as_path))
        .chain(self.report.as_deref())
        .collect()
    }
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "Artifact written");
    Ok(())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))
}

#[derive(Debug, Serialize)]
pub struct EnvSnapshot {
    pub timestamp: DateTime<Utc>,
    pub package: &'static str,
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
    pub level: &'static str,
    pub rayon_threads: usize,
}

impl EnvSnapshot {
    pub fn capture(level: Level) -> Self {
        Self {
            timestamp: Utc::now(),
            package: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
            level: level.as_str(),
            rayon_threads: rayon::current_num_threads(),
        }
    }
}

pub fn write_env(path: &Path, snapshot: &EnvSnapshot) -> Result<()> {
    write_text(path, &serde_json::to_string_pretty(snapshot)?)
}

/// Writes the frame with dates as `%Y-%m-%d` and missing cells empty.
pub fn write_table(path: &Path, frame: &DataFrame) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut frame = frame.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), rows = frame.height(), "Frame written");
    Ok(())
}

#[derive(Serialize)]
struct NoteRow<'a> {
    note: &'a str,
}

pub fn write_peak_hours(path: &Path, peaks: &Availability<Vec<DayTypeHourMean>>) -> Result<()> {
    let mut writer = csv_writer(path)?;
    match peaks {
        Availability::Available(rows) => {
            if rows.is_empty() {
                writer.write_record(["_daytype", "hr", "avg_cnt"])?;
            }
            for row in rows {
                writer.serialize(row)?;
            }
        }
        Availability::Unavailable(_) => writer.serialize(NoteRow {
            note: PEAK_HOURS_NOTE,
        })?,
    }
    writer.flush()?;
    Ok(())
}

/// `WEEKEND:` style headers with one `  hr=..  avg_cnt=..` line per peak
/// hour, groups separated by a blank line.
pub fn peak_summary_text(peaks: &Availability<Vec<DayTypeHourMean>>) -> String {
    let rows = match peaks {
        Availability::Available(rows) if !rows.is_empty() => rows,
        _ => return PEAK_SUMMARY_FALLBACK.to_string(),
    };

    let mut lines: Vec<String> = Vec::new();
    let mut current = None;
    for row in rows {
        if current != Some(row.day_type) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(format!("{}:", row.day_type.as_str().to_uppercase()));
            current = Some(row.day_type);
        }
        lines.push(format!("  hr={}  avg_cnt={:.2}", row.hr, row.avg_cnt));
    }
    let mut text = lines.join("\n").trim().to_string();
    text.push('\n');
    text
}

pub fn write_summary(path: &Path, summary: &CategorySummary) -> Result<()> {
    let mut writer = csv_writer(path)?;
    let mut header: Vec<&str> = Vec::with_capacity(5);
    if let Some(col) = &summary.column {
        header.push(col);
    }
    header.extend(["n", "mean", "median", "std"]);
    writer.write_record(&header)?;

    for row in &summary.rows {
        let mut record: Vec<String> = Vec::with_capacity(5);
        if summary.column.is_some() {
            record.push(row.category.as_ref().map(ToString::to_string).unwrap_or_default());
        }
        record.push(row.n.to_string());
        record.push(fmt_float(row.mean));
        record.push(fmt_float(row.median));
        record.push(row.std.map(fmt_float).unwrap_or_default());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn metrics_text(level: Level, report: &BaselineReport) -> String {
    format!(
        "Dataset level: {level}\n\
         Train size: {}\n\
         Test size: {}\n\
         Model: {}\n\
         RMSE: {:.3}\n\
         R2: {:.3}\n",
        report.train_size,
        report.test_size,
        report.primary_label,
        report.primary.rmse,
        report.primary.r2,
    )
}

pub fn write_comparison(path: &Path, report: &BaselineReport) -> Result<()> {
    let mut writer = csv_writer(path)?;
    for score in &report.comparison {
        writer.serialize(score)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes every table and text artifact for one run. Charts and the report
/// are written separately.
#[tracing::instrument(skip_all, fields(level = %cfg.level))]
pub fn write_artifacts(
    cfg: &PipelineConfig,
    aggregates: &crate::analyzers::Aggregates,
    models: &Availability<BaselineReport>,
) -> Result<ArtifactSet> {
    let out = &cfg.output_dir;
    let mut set = ArtifactSet::default();

    let peak_path = out.join(PEAK_HOURS_FILE);
    write_peak_hours(&peak_path, &aggregates.peak_hours)?;
    set.peak_hours = Some(peak_path);

    let peak_summary_path = out.join(PEAK_SUMMARY_FILE);
    write_text(&peak_summary_path, &peak_summary_text(&aggregates.peak_hours))?;
    set.peak_summary = Some(peak_summary_path);

    if let Some(summary) = aggregates.summary.available() {
        let path = out.join(SUMMARY_FILE);
        write_summary(&path, summary)?;
        set.summary = Some(path);
    }

    if let Some(report) = models.available() {
        let metrics_path = out.join(METRICS_FILE);
        write_text(&metrics_path, &metrics_text(cfg.level, report))?;
        set.metrics = Some(metrics_path);

        let comparison_path = out.join(COMPARISON_FILE);
        write_comparison(&comparison_path, report)?;
        set.comparison = Some(comparison_path);
    }

    Ok(set)
}
