//! Markdown run report.

use std::fmt;
use std::path::Path;

use crate::analyzers::Aggregates;
use crate::analyzers::types::Availability;
use crate::config::PipelineConfig;
use crate::model::BaselineReport;
use crate::output::ArtifactSet;

/// Paths in the report are shown relative to `base` when possible.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// `REPORT.md` for one run. Only artifacts present in `artifacts` are
/// referenced.
pub struct Report<'a> {
    pub cfg: &'a PipelineConfig,
    pub aggregates: &'a Aggregates,
    pub models: &'a Availability<BaselineReport>,
    pub artifacts: &'a ArtifactSet,
    pub base: &'a Path,
}

pub fn render_report(
    cfg: &PipelineConfig,
    aggregates: &Aggregates,
    models: &Availability<BaselineReport>,
    artifacts: &ArtifactSet,
    base: &Path,
) -> String {
    Report {
        cfg,
        aggregates,
        models,
        artifacts,
        base,
    }
    .to_string()
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = |path: &Path| display_path(path, self.base);

        writeln!(f, "# Bike-sharing demand: peak hours (auto report)\n")?;
        writeln!(f, "## Question")?;
        writeln!(
            f,
            "Which **hours** are the peak-demand hours, and do they differ between \
             **workingdays** and **weekends**?\n"
        )?;

        writeln!(f, "## What was done")?;
        writeln!(f, "- Loaded the UCI Bike Sharing Dataset (`{}`).", self.cfg.level.csv_name())?;
        match self.aggregates.peak_hours.gap() {
            None => writeln!(
                f,
                "- Split days into weekend, non-working and working days and ranked the top hours \
                 by mean rentals for each."
            )?,
            Some(gap) => writeln!(f, "- Peak-hour analysis skipped ({gap}).")?,
        }
        match self.models {
            Availability::Available(r) => writeln!(
                f,
                "- Trained a baseline `{}` and compared it with a RandomForest \
                 ({} train rows, {} test rows).",
                r.primary_label, r.train_size, r.test_size
            )?,
            Availability::Unavailable(gap) => writeln!(f, "- Baseline models skipped ({gap}).")?,
        }
        writeln!(f)?;

        if let Some(r) = self.models.available() {
            writeln!(f, "## Model comparison\n")?;
            writeln!(f, "| model | rmse | r2 |\n|---|---|---|")?;
            for s in &r.comparison {
                writeln!(f, "| {} | {:.3} | {:.3} |", s.model, s.rmse, s.r2)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "## Key artefacts")?;
        let a = self.artifacts;
        let entries: [(&str, Option<&Path>); 7] = [
            ("Environment snapshot", a.env.as_deref()),
            ("Processed data", a.processed.as_deref()),
            ("Peak hours", a.peak_hours.as_deref()),
            ("Peak hours summary", a.peak_summary.as_deref()),
            ("Summary table", a.summary.as_deref()),
            ("Baseline metrics", a.metrics.as_deref()),
            ("Model comparison", a.comparison.as_deref()),
        ];
        for (label, path) in entries {
            let Some(path) = path else { continue };
            writeln!(f, "- {label}: `{}`", p(path))?;
        }
        if !a.charts.is_empty() {
            writeln!(f, "- Figures:")?;
            for chart in &a.charts {
                writeln!(f, "  - `{}`", p(chart))?;
            }
        }
        Ok(())
    }
}
