//! Read-only terminal view over an output directory.
//!
//! Loads exactly the files a run writes and shows "not available" for any
//! that are missing, so it works for both hour- and day-level runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::charts;
use crate::output::{
    COMPARISON_FILE, ENV_FILE, METRICS_FILE, PEAK_HOURS_FILE, PEAK_SUMMARY_FILE, SUMMARY_FILE,
};

const NOT_AVAILABLE: &str = "not available";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComparisonRow {
    pub model: String,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PeakRow {
    #[serde(rename = "_daytype")]
    pub day_type: String,
    pub hr: i64,
    pub avg_cnt: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeakView {
    Table(Vec<PeakRow>),
    /// The fallback note written when hour-level data was absent.
    Note(String),
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub output_dir: PathBuf,
    pub env: Option<serde_json::Value>,
    pub metrics: Option<String>,
    pub comparison: Option<Vec<ComparisonRow>>,
    pub peak_hours: PeakView,
    pub peak_summary: Option<String>,
    pub summary: Option<TableView>,
    /// Every known figure with whether it exists.
    pub figures: Vec<(&'static str, bool)>,
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("read {}", path.display()))
}

fn read_table(path: &Path) -> Result<Option<TableView>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(TableView { headers, rows }))
}

fn read_peak_hours(path: &Path) -> Result<PeakView> {
    if !path.is_file() {
        return Ok(PeakView::Missing);
    }
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    if reader.headers()?.iter().any(|h| h == "note") {
        let note = reader
            .records()
            .next()
            .transpose()?
            .and_then(|r| r.get(0).map(str::to_string))
            .unwrap_or_default();
        return Ok(PeakView::Note(note));
    }
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<PeakRow>, _>>()
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(PeakView::Table(rows))
}

impl Dashboard {
    pub fn load(output_dir: &Path) -> Result<Self> {
        let env = read_optional(&output_dir.join(ENV_FILE))?
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("parse env.json")?;

        let comparison = match output_dir.join(COMPARISON_FILE) {
            p if p.is_file() => Some(
                csv::Reader::from_path(&p)?
                    .deserialize()
                    .collect::<Result<Vec<ComparisonRow>, _>>()
                    .with_context(|| format!("parse {}", p.display()))?,
            ),
            _ => None,
        };

        let figures = [
            charts::HEATMAP_FILE,
            charts::TIMESERIES_FILE,
            charts::SCATTER_FILE,
            charts::HOURLY_FILE,
            charts::DAYTYPE_HOURLY_FILE,
        ]
        .into_iter()
        .map(|f| (f, output_dir.join(f).is_file()))
        .collect();

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            env,
            metrics: read_optional(&output_dir.join(METRICS_FILE))?,
            comparison,
            peak_hours: read_peak_hours(&output_dir.join(PEAK_HOURS_FILE))?,
            peak_summary: read_optional(&output_dir.join(PEAK_SUMMARY_FILE))?,
            summary: read_table(&output_dir.join(SUMMARY_FILE))?,
            figures,
        })
    }

    pub fn level(&self) -> Option<&str> {
        self.env.as_ref()?.get("level")?.as_str()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bike-sharing dashboard ({})", self.output_dir.display())?;
        writeln!(f, "Level: {}\n", self.level().unwrap_or(NOT_AVAILABLE))?;

        writeln!(f, "== Baseline metrics ==")?;
        match &self.metrics {
            Some(m) => f.write_str(m)?,
            None => writeln!(f, "{NOT_AVAILABLE}")?,
        }
        writeln!(f)?;

        writeln!(f, "== Model comparison ==")?;
        match &self.comparison {
            Some(rows) => {
                writeln!(f, "{:<14} {:>10} {:>8}", "model", "rmse", "r2")?;
                for r in rows {
                    writeln!(f, "{:<14} {:>10.3} {:>8.3}", r.model, r.rmse, r.r2)?;
                }
            }
            None => writeln!(f, "{NOT_AVAILABLE}")?,
        }
        writeln!(f)?;

        writeln!(f, "== Peak hours ==")?;
        match (&self.peak_hours, &self.peak_summary) {
            (PeakView::Table(_), Some(s)) => f.write_str(s)?,
            (PeakView::Note(note), _) => writeln!(f, "{note}")?,
            _ => writeln!(f, "{NOT_AVAILABLE}")?,
        }
        writeln!(f)?;

        writeln!(f, "== Summary ==")?;
        match &self.summary {
            Some(t) => {
                writeln!(f, "{}", t.headers.join("\t"))?;
                for row in &t.rows {
                    writeln!(f, "{}", row.join("\t"))?;
                }
            }
            None => writeln!(f, "{NOT_AVAILABLE}")?,
        }
        writeln!(f)?;

        writeln!(f, "== Figures ==")?;
        for (name, present) in &self.figures {
            let state = if *present { "ok" } else { NOT_AVAILABLE };
            writeln!(f, "{name}: {state}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_directory_renders_not_available() {
        let dir = tempdir().unwrap();
        let dash = Dashboard::load(dir.path()).unwrap();

        assert_eq!(dash.peak_hours, PeakView::Missing);
        assert!(dash.metrics.is_none());
        let text = dash.render();
        assert!(text.contains("Level: not available"));
        assert!(text.contains("fig_timeseries.png: not available"));
    }

    #[test]
    fn test_loads_written_artifacts() {
        let dir = tempdir().unwrap();
        let out = dir.path();
        fs::write(out.join(ENV_FILE), r#"{"level": "hour"}"#).unwrap();
        fs::write(out.join(COMPARISON_FILE), "model,rmse,r2\nRandomForest,40.5,0.93\nRidge,99.1,0.6\n").unwrap();
        fs::write(out.join(PEAK_HOURS_FILE), "_daytype,hr,avg_cnt\nweekend,13,370.5\n").unwrap();
        fs::write(out.join(PEAK_SUMMARY_FILE), "WEEKEND:\n  hr=13  avg_cnt=370.50\n").unwrap();
        fs::write(out.join(charts::HOURLY_FILE), b"png").unwrap();

        let dash = Dashboard::load(out).unwrap();
        assert_eq!(dash.level(), Some("hour"));
        assert_eq!(dash.comparison.as_ref().unwrap()[0].model, "RandomForest");
        assert_eq!(
            dash.peak_hours,
            PeakView::Table(vec![PeakRow {
                day_type: "weekend".into(),
                hr: 13,
                avg_cnt: 370.5,
            }])
        );

        let text = dash.render();
        assert!(text.contains("WEEKEND:"));
        assert!(text.contains("fig_avg_by_hour.png: ok"));
        assert!(text.contains("== Summary ==\nnot available"));
    }

    #[test]
    fn test_day_level_note_is_shown() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(PEAK_HOURS_FILE),
            "note\nNo 'hr' column found (day-level). Peak-hour analysis skipped.\n",
        )
        .unwrap();
        let dash = Dashboard::load(dir.path()).unwrap();
        assert!(matches!(&dash.peak_hours, PeakView::Note(n) if n.starts_with("No 'hr'")));
    }

    #[test]
    fn test_render_lists_every_section_in_order() {
        let dir = tempdir().unwrap();
        let out = dir.path();
        fs::write(out.join(METRICS_FILE), "Dataset level: day\n").unwrap();
        fs::write(out.join(COMPARISON_FILE), "model,rmse,r2\nRidge,2.5,0.5\n").unwrap();
        fs::write(out.join(SUMMARY_FILE), "n,mean,median,std\n0,,,\n").unwrap();

        let text = Dashboard::load(out).unwrap().render();
        let sections: Vec<usize> = [
            "== Baseline metrics ==\nDataset level: day\n\n",
            "== Model comparison ==\nmodel                rmse       r2\nRidge               2.500    0.500\n\n",
            "== Peak hours ==\nnot available\n\n",
            "== Summary ==\nn\tmean\tmedian\tstd\n0\t\t\t\n\n",
            "== Figures ==\n",
        ]
        .iter()
        .map(|s| text.find(s).unwrap_or_else(|| panic!("missing {s:?} in {text}")))
        .collect();
        assert!(sections.windows(2).all(|w| w[0] < w[1]));
        assert!(text.ends_with("fig_avg_by_hour_daytype.png: not available\n"));
    }
}
