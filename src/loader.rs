//! Cleaning of the raw frame and the manifest of optional columns.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::SchemaGap;
use crate::frame::{dtype_of, f64_values, i64_values, is_numeric};
use crate::parser::read_csv;

pub const HOUR_COLUMN: &str = "hr";
pub const MONTH_COLUMN: &str = "mnth";
pub const WEEKDAY_COLUMN: &str = "weekday";
pub const WEEKEND_COLUMN: &str = "is_weekend";
pub const WORKINGDAY_COLUMN: &str = "workingday";
pub const TEMP_COLUMN: &str = "temp";

/// Optional inputs an aggregate, chart or model may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Date column with at least one parsed value.
    DateAxis,
    Hour,
    Month,
    Weekend,
    WorkingDay,
    Category,
    Temperature,
    Target,
}

/// Which optional columns the cleaned frame actually carries, read off its
/// schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnManifest {
    present: BTreeSet<Capability>,
    date_column: String,
    category_column: String,
    target: String,
}

impl ColumnManifest {
    pub fn from_frame(df: &DataFrame, cfg: &PipelineConfig) -> Self {
        let numeric = |name: &str| dtype_of(df, name).is_some_and(|d| is_numeric(&d));

        let mut present = BTreeSet::new();
        let date_axis = df
            .column(&cfg.date_column)
            .is_ok_and(|c| c.dtype() == &DataType::Date && c.null_count() < c.len());
        if date_axis {
            present.insert(Capability::DateAxis);
        }
        for (cap, ok) in [
            (Capability::Hour, numeric(HOUR_COLUMN)),
            (Capability::Month, numeric(MONTH_COLUMN)),
            (Capability::Weekend, numeric(WEEKEND_COLUMN)),
            (Capability::WorkingDay, numeric(WORKINGDAY_COLUMN)),
            (Capability::Category, df.column(&cfg.category_column).is_ok()),
            (Capability::Temperature, numeric(TEMP_COLUMN)),
            (Capability::Target, numeric(&cfg.target)),
        ] {
            if ok {
                present.insert(cap);
            }
        }

        Self {
            present,
            date_column: cfg.date_column.clone(),
            category_column: cfg.category_column.clone(),
            target: cfg.target.clone(),
        }
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.present.contains(&cap)
    }

    pub fn column_name(&self, cap: Capability) -> &str {
        match cap {
            Capability::DateAxis => &self.date_column,
            Capability::Hour => HOUR_COLUMN,
            Capability::Month => MONTH_COLUMN,
            Capability::Weekend => WEEKEND_COLUMN,
            Capability::WorkingDay => WORKINGDAY_COLUMN,
            Capability::Category => &self.category_column,
            Capability::Temperature => TEMP_COLUMN,
            Capability::Target => &self.target,
        }
    }

    /// Checks that every capability in `needs` is present.
    pub fn require(&self, output: &'static str, needs: &[Capability]) -> Result<(), SchemaGap> {
        let missing: Vec<String> = needs
            .iter()
            .filter(|c| !self.has(**c))
            .map(|c| self.column_name(*c).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaGap::new(output, missing))
        }
    }
}

/// The frame after cleaning, ready for aggregation and modeling.
#[derive(Debug, Clone)]
pub struct CleanTable {
    pub frame: DataFrame,
    pub manifest: ColumnManifest,
    /// Non-empty date cells that could not be parsed.
    pub date_parse_failures: usize,
    pub dropped_rows: usize,
}

impl CleanTable {
    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }

    /// Name of the target column when it is present and numeric.
    pub fn target(&self) -> Option<&str> {
        self.manifest
            .has(Capability::Target)
            .then(|| self.manifest.column_name(Capability::Target))
    }
}

/// Reads and cleans a raw CSV.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_clean(path: &Path, cfg: &PipelineConfig) -> Result<CleanTable> {
    let df = read_csv(path)?;
    clean(df, cfg).with_context(|| format!("clean {}", path.display()))
}

/// Parses the date column, normalizes `hr`/`mnth` to integers, derives
/// `is_weekend`, and drops rows whose target is missing. Deterministic for a
/// fixed input.
pub fn clean(mut df: DataFrame, cfg: &PipelineConfig) -> Result<CleanTable> {
    let mut date_parse_failures = 0;
    if dtype_of(&df, &cfg.date_column).is_some_and(|d| d != DataType::Date) {
        let (dates, failures) = parse_dates(&df, &cfg.date_column)?;
        date_parse_failures = failures;
        if failures > 0 {
            warn!(
                column = %cfg.date_column,
                failures,
                "Unparseable dates treated as missing"
            );
        }
        df.with_column(Series::new(cfg.date_column.as_str().into(), dates))?;
    }

    // Non-integral hours or months cannot index a profile.
    for name in [HOUR_COLUMN, MONTH_COLUMN] {
        if dtype_of(&df, name).is_some_and(|d| d.is_float()) {
            let values = i64_values(&df, name)?;
            df.with_column(Series::new(name.into(), values))?;
        }
    }

    if df.column(WEEKDAY_COLUMN).is_ok() {
        let flags: Vec<i64> = f64_values(&df, WEEKDAY_COLUMN)?
            .into_iter()
            .map(|d| i64::from(matches!(d, Some(d) if d == 0.0 || d == 6.0)))
            .collect();
        df.with_column(Series::new(WEEKEND_COLUMN.into(), flags))?;
    }

    let mut dropped_rows = 0;
    if let Some(dtype) = dtype_of(&df, &cfg.target) {
        if dtype == DataType::String {
            warn!(column = %cfg.target, "Target is not numeric, coercing");
            let coerced = df
                .column(&cfg.target)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            df.with_column(coerced)?;
        }

        let before = df.height();
        df = df
            .lazy()
            .filter(col(cfg.target.as_str()).is_not_null())
            .collect()
            .context("drop rows without a target")?;
        dropped_rows = before - df.height();
    }

    let manifest = ColumnManifest::from_frame(&df, cfg);
    info!(
        rows = df.height(),
        cols = df.width(),
        dropped_rows,
        date_axis = manifest.has(Capability::DateAxis),
        hour = manifest.has(Capability::Hour),
        "Frame cleaned"
    );

    Ok(CleanTable {
        frame: df,
        manifest,
        date_parse_failures,
        dropped_rows,
    })
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

fn parse_dates(df: &DataFrame, name: &str) -> PolarsResult<(Vec<Option<NaiveDate>>, usize)> {
    let text = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let mut failures = 0;
    let dates = text
        .str()?
        .into_iter()
        .map(|raw| {
            let raw = raw?.trim();
            if raw.is_empty() {
                return None;
            }
            let parsed = parse_date(raw);
            if parsed.is_none() {
                failures += 1;
            }
            parsed
        })
        .collect();
    Ok((dates, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::date_values;
    use crate::parser::parse_csv;

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn load(csv: &str) -> CleanTable {
        clean(parse_csv(csv.as_bytes()).unwrap(), &cfg()).unwrap()
    }

    #[test]
    fn test_weekend_flag_uses_sunday_zero_convention() {
        let clean = load("weekday,cnt\n0,1\n1,2\n5,3\n6,4\n");
        assert_eq!(
            i64_values(&clean.frame, WEEKEND_COLUMN).unwrap(),
            vec![Some(1), Some(0), Some(0), Some(1)]
        );
        assert!(clean.manifest.has(Capability::Weekend));
    }

    #[test]
    fn test_missing_weekday_means_no_weekend_column() {
        let clean = load("hr,cnt\n0,1\n");
        assert!(clean.frame.column(WEEKEND_COLUMN).is_err());
        assert!(!clean.manifest.has(Capability::Weekend));
    }

    #[test]
    fn test_bad_dates_become_missing_but_rows_stay() {
        let clean = load("dteday,cnt\n2011-01-01,1\nnot-a-date,2\n,3\n");

        assert_eq!(clean.n_rows(), 3);
        assert_eq!(clean.date_parse_failures, 1);
        assert_eq!(
            date_values(&clean.frame, "dteday").unwrap(),
            vec![NaiveDate::from_ymd_opt(2011, 1, 1), None, None]
        );
        assert!(clean.manifest.has(Capability::DateAxis));
    }

    #[test]
    fn test_all_bad_dates_means_no_date_axis() {
        let clean = load("dteday,cnt\nfoo,1\nbar,2\n");
        assert!(!clean.manifest.has(Capability::DateAxis));
    }

    #[test]
    fn test_rows_without_target_are_dropped() {
        let clean = load("hr,cnt\n0,1\n1,\n2,3\n");
        assert_eq!(clean.dropped_rows, 1);
        assert_eq!(
            i64_values(&clean.frame, "hr").unwrap(),
            vec![Some(0), Some(2)]
        );
    }

    #[test]
    fn test_fractional_hours_become_missing() {
        let clean = load("hr,cnt\n1.0,1\n1.5,2\n3,3\n");
        assert_eq!(clean.frame.column("hr").unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            i64_values(&clean.frame, "hr").unwrap(),
            vec![Some(1), None, Some(3)]
        );
    }

    #[test]
    fn test_text_target_is_coerced() {
        let clean = load("cnt\n1\nabc\n3.5\n");
        assert_eq!(
            f64_values(&clean.frame, "cnt").unwrap(),
            vec![Some(1.0), Some(3.5)]
        );
        assert_eq!(clean.target(), Some("cnt"));
    }

    #[test]
    fn test_require_reports_missing_column_names() {
        let clean = load("dteday,season,cnt\n2011-01-01,1,5\n");

        assert!(clean.manifest.require("summary", &[Capability::Category]).is_ok());
        let gap = clean
            .manifest
            .require("peak hours", &[Capability::Hour, Capability::Target])
            .unwrap_err();
        assert_eq!(gap.missing, vec!["hr".to_string()]);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2012, 3, 4);
        assert_eq!(parse_date("2012-03-04"), d);
        assert_eq!(parse_date("2012/03/04"), d);
        assert_eq!(parse_date("03/04/2012"), d);
        assert_eq!(parse_date("2012-03-04 10:00:00"), d);
        assert_eq!(parse_date("yesterday"), None);
    }
}
