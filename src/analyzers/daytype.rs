//! Day-type classification and the peak-hours table.

use polars::prelude::*;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::analyzers::types::{Availability, DayTypeHourMean};
use crate::frame::{f64_values, i64_values};
use crate::loader::{Capability, CleanTable, HOUR_COLUMN, WEEKEND_COLUMN, WORKINGDAY_COLUMN};

pub const PEAK_HOURS_PER_DAY_TYPE: usize = 5;

/// Label column added while grouping by kind of day.
pub const DAYTYPE_COLUMN: &str = "_daytype";
const AVG: &str = "avg_cnt";

/// Three-way split of records by kind of day.
///
/// Variant order matches the lexicographic order of the labels, which is the
/// order categories appear in the peak-hours outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayType {
    NonWorkingday,
    Weekend,
    Workingday,
}

impl DayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::NonWorkingday => "non-workingday",
            DayType::Weekend => "weekend",
            DayType::Workingday => "workingday",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [DayType::NonWorkingday, DayType::Weekend, DayType::Workingday]
            .into_iter()
            .find(|d| d.as_str() == label)
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DayType {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Day-type label of every row.
///
/// With both `is_weekend` and `workingday`: weekend, then non-working weekday
/// (`workingday` = 0 and `is_weekend` = 0), else working day. With only
/// `is_weekend` the split is two-way. Without it every row is a working day.
fn day_type_expr(clean: &CleanTable) -> Expr {
    let m = &clean.manifest;
    if !m.has(Capability::Weekend) {
        return lit(DayType::Workingday.as_str());
    }
    let weekend = when(col(WEEKEND_COLUMN).eq(lit(1))).then(lit(DayType::Weekend.as_str()));
    if !m.has(Capability::WorkingDay) {
        return weekend.otherwise(lit(DayType::Workingday.as_str()));
    }
    weekend
        .when(col(WORKINGDAY_COLUMN).eq(lit(0)).and(col(WEEKEND_COLUMN).eq(lit(0))))
        .then(lit(DayType::NonWorkingday.as_str()))
        .otherwise(lit(DayType::Workingday.as_str()))
}

fn with_day_type(clean: &CleanTable) -> LazyFrame {
    clean
        .frame
        .clone()
        .lazy()
        .with_column(day_type_expr(clean).alias(DAYTYPE_COLUMN))
}

/// Classifies every row.
pub fn classify(clean: &CleanTable) -> PolarsResult<Vec<DayType>> {
    let labels = with_day_type(clean).select([col(DAYTYPE_COLUMN)]).collect()?;
    let labels = labels.column(DAYTYPE_COLUMN)?.as_materialized_series().cast(&DataType::String)?;
    Ok(labels
        .str()?
        .into_iter()
        .map(|l| l.and_then(DayType::from_label).unwrap_or(DayType::Workingday))
        .collect())
}

fn profile_rows(df: &DataFrame) -> PolarsResult<Vec<DayTypeHourMean>> {
    let labels = df.column(DAYTYPE_COLUMN)?.as_materialized_series().cast(&DataType::String)?;
    let rows = labels
        .str()?
        .into_iter()
        .zip(i64_values(df, HOUR_COLUMN)?)
        .zip(f64_values(df, AVG)?)
        .filter_map(|((label, hr), avg_cnt)| {
            Some(DayTypeHourMean {
                day_type: DayType::from_label(label?)?,
                hr: hr?,
                avg_cnt: avg_cnt?,
            })
        })
        .collect();
    Ok(rows)
}

/// Mean target per (day type, hour), ordered by day type then hour.
pub fn day_type_hour_profile(
    clean: &CleanTable,
) -> PolarsResult<Availability<Vec<DayTypeHourMean>>> {
    let m = &clean.manifest;
    if let Err(gap) = m.require("peak hours", &[Capability::Hour, Capability::Target]) {
        return Ok(Availability::Unavailable(gap));
    }
    let target = m.column_name(Capability::Target);

    let out = with_day_type(clean)
        .filter(col(HOUR_COLUMN).is_not_null())
        .group_by([col(DAYTYPE_COLUMN), col(HOUR_COLUMN)])
        .agg([col(target).cast(DataType::Float64).mean().alias(AVG)])
        .sort_by_exprs(
            [col(DAYTYPE_COLUMN), col(HOUR_COLUMN)],
            SortMultipleOptions::default(),
        )
        .collect()?;
    Ok(Availability::Available(profile_rows(&out)?))
}

/// Keeps the `top_n` hours with the highest mean per day type.
///
/// `profile` must be ordered by (day type, hour). The sort keeps input order
/// among equal keys, so hours with exactly equal means stay in ascending-hour
/// order.
pub fn peak_hours(profile: &[DayTypeHourMean], top_n: usize) -> PolarsResult<Vec<DayTypeHourMean>> {
    let labels: Vec<&str> = profile.iter().map(|r| r.day_type.as_str()).collect();
    let hours: Vec<i64> = profile.iter().map(|r| r.hr).collect();
    let means: Vec<f64> = profile.iter().map(|r| r.avg_cnt).collect();
    let df = DataFrame::new(vec![
        Series::new(DAYTYPE_COLUMN.into(), labels).into(),
        Series::new(HOUR_COLUMN.into(), hours).into(),
        Series::new(AVG.into(), means).into(),
    ])?;

    let out = df
        .lazy()
        .sort_by_exprs(
            [col(DAYTYPE_COLUMN), col(AVG)],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, true])
                .with_maintain_order(true),
        )
        .group_by_stable([col(DAYTYPE_COLUMN)])
        .head(Some(top_n))
        .collect()?;
    profile_rows(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::loader::clean;
    use crate::parser::parse_csv;

    fn load(csv: &str) -> CleanTable {
        clean(parse_csv(csv.as_bytes()).unwrap(), &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_three_way_classification() {
        // weekday 6 → weekend; weekday 1 with workingday 0 → holiday
        let c = load("weekday,workingday,hr,cnt\n6,0,0,1\n1,0,0,1\n2,1,0,1\n");
        assert_eq!(
            classify(&c).unwrap(),
            vec![DayType::Weekend, DayType::NonWorkingday, DayType::Workingday]
        );
    }

    #[test]
    fn test_two_way_without_workingday() {
        let c = load("weekday,hr,cnt\n0,0,1\n3,0,1\n");
        assert_eq!(classify(&c).unwrap(), vec![DayType::Weekend, DayType::Workingday]);
    }

    #[test]
    fn test_everything_is_workingday_without_weekend_flag() {
        let c = load("workingday,hr,cnt\n0,0,1\n1,0,1\n");
        assert_eq!(classify(&c).unwrap(), vec![DayType::Workingday; 2]);
    }

    #[test]
    fn test_peak_hours_order_and_ties() {
        let mut csv = String::from("weekday,hr,cnt\n");
        // weekend: hr 0 → 10, hr 1 → 30, hr 2 → 30 (tie)
        for (hr, cnt) in [(0, 10), (1, 30), (2, 30)] {
            csv.push_str(&format!("0,{hr},{cnt}\n"));
        }
        // workingday: hr 0 → 5, hr 1 → 7, hr 2 → 6
        for (hr, cnt) in [(0, 5), (1, 7), (2, 6)] {
            csv.push_str(&format!("3,{hr},{cnt}\n"));
        }
        let c = load(&csv);
        let profile = day_type_hour_profile(&c).unwrap();
        let top = peak_hours(profile.available().unwrap(), 2).unwrap();

        let got: Vec<(DayType, i64, f64)> =
            top.iter().map(|r| (r.day_type, r.hr, r.avg_cnt)).collect();
        assert_eq!(
            got,
            vec![
                (DayType::Weekend, 1, 30.0),
                (DayType::Weekend, 2, 30.0),
                (DayType::Workingday, 1, 7.0),
                (DayType::Workingday, 2, 6.0),
            ]
        );
    }

    #[test]
    fn test_peak_hours_keep_top_n_per_day_type() {
        let mut csv = String::from("weekday,workingday,hr,cnt\n");
        for hr in 0..8 {
            csv.push_str(&format!("3,1,{hr},{}\n", hr * 10));
            csv.push_str(&format!("2,0,{hr},{}\n", 100 - hr));
        }
        let c = load(&csv);
        let profile = day_type_hour_profile(&c).unwrap();
        let top = peak_hours(profile.available().unwrap(), PEAK_HOURS_PER_DAY_TYPE).unwrap();

        assert_eq!(top.len(), 10);
        let holiday: Vec<i64> = top[..5].iter().map(|r| r.hr).collect();
        assert_eq!(holiday, vec![0, 1, 2, 3, 4]);
        assert!(top[..5].iter().all(|r| r.day_type == DayType::NonWorkingday));
        let working: Vec<i64> = top[5..].iter().map(|r| r.hr).collect();
        assert_eq!(working, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_profile_means_per_cell() {
        let c = load("weekday,hr,cnt\n3,8,10\n3,8,20\n3,9,5\n");
        let profile = day_type_hour_profile(&c).unwrap();
        let profile = profile.available().unwrap();
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].hr, 8);
        assert_eq!(profile[0].avg_cnt, 15.0);
    }

    #[test]
    fn test_profile_without_hour_is_a_gap() {
        let c = load("dteday,cnt\n2011-01-01,3\n");
        let profile = day_type_hour_profile(&c).unwrap();
        assert_eq!(profile.gap().unwrap().missing, vec!["hr".to_string()]);
    }
}
