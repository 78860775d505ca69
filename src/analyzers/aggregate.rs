use crate::analyzers::types::{Availability, DailyTotal, HourlyMean, MonthHourGrid};
use crate::frame::{date_values, f64_values, i64_values};
use crate::loader::{Capability, CleanTable, HOUR_COLUMN, MONTH_COLUMN};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const TOTAL: &str = "total";
const AVG: &str = "avg_cnt";

/// Sum of the target per date. Rows without a parsed date are left out.
pub fn daily_totals(clean: &CleanTable) -> PolarsResult<Availability<Vec<DailyTotal>>> {
    let m = &clean.manifest;
    if let Err(gap) = m.require("daily totals", &[Capability::DateAxis, Capability::Target]) {
        return Ok(Availability::Unavailable(gap));
    }
    let date = m.column_name(Capability::DateAxis);
    let target = m.column_name(Capability::Target);

    let out = clean
        .frame
        .clone()
        .lazy()
        .filter(col(date).is_not_null())
        .group_by([col(date)])
        .agg([col(target).cast(DataType::Float64).sum().alias(TOTAL)])
        .sort_by_exprs([col(date)], SortMultipleOptions::default())
        .collect()?;

    let totals = date_values(&out, date)?
        .into_iter()
        .zip(f64_values(&out, TOTAL)?)
        .filter_map(|(date, total)| Some(DailyTotal { date: date?, total: total? }))
        .collect();
    Ok(Availability::Available(totals))
}

/// Mean target per hour of day, ascending by hour.
pub fn hourly_means(clean: &CleanTable) -> PolarsResult<Availability<Vec<HourlyMean>>> {
    let m = &clean.manifest;
    if let Err(gap) = m.require("hourly means", &[Capability::Hour, Capability::Target]) {
        return Ok(Availability::Unavailable(gap));
    }
    let target = m.column_name(Capability::Target);

    let out = clean
        .frame
        .clone()
        .lazy()
        .filter(col(HOUR_COLUMN).is_not_null())
        .group_by([col(HOUR_COLUMN)])
        .agg([col(target).cast(DataType::Float64).mean().alias(AVG)])
        .sort_by_exprs([col(HOUR_COLUMN)], SortMultipleOptions::default())
        .collect()?;

    let means = i64_values(&out, HOUR_COLUMN)?
        .into_iter()
        .zip(f64_values(&out, AVG)?)
        .filter_map(|(hr, avg_cnt)| Some(HourlyMean { hr: hr?, avg_cnt: avg_cnt? }))
        .collect();
    Ok(Availability::Available(means))
}

/// Mean target for every observed (month, hour) pair.
pub fn month_hour_grid(clean: &CleanTable) -> PolarsResult<Availability<MonthHourGrid>> {
    let m = &clean.manifest;
    if let Err(gap) = m.require(
        "month x hour heatmap",
        &[Capability::Month, Capability::Hour, Capability::Target],
    ) {
        return Ok(Availability::Unavailable(gap));
    }
    let target = m.column_name(Capability::Target);

    let out = clean
        .frame
        .clone()
        .lazy()
        .filter(col(MONTH_COLUMN).is_not_null().and(col(HOUR_COLUMN).is_not_null()))
        .group_by([col(MONTH_COLUMN), col(HOUR_COLUMN)])
        .agg([col(target).cast(DataType::Float64).mean().alias(AVG)])
        .collect()?;

    let cells: BTreeMap<(i64, i64), f64> = i64_values(&out, MONTH_COLUMN)?
        .into_iter()
        .zip(i64_values(&out, HOUR_COLUMN)?)
        .zip(f64_values(&out, AVG)?)
        .filter_map(|((m, h), v)| Some(((m?, h?), v?)))
        .collect();

    let months: Vec<i64> = cells
        .keys()
        .map(|(m, _)| *m)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let hours: Vec<i64> = cells
        .keys()
        .map(|(_, h)| *h)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let values = months
        .iter()
        .map(|m| hours.iter().map(|h| cells.get(&(*m, *h)).copied()).collect())
        .collect();

    Ok(Availability::Available(MonthHourGrid {
        months,
        hours,
        values,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::loader::clean;
    use crate::parser::parse_csv;
    use chrono::NaiveDate;

    fn load(csv: &str) -> CleanTable {
        clean(parse_csv(csv.as_bytes()).unwrap(), &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_daily_totals_sum_per_date_and_skip_bad_dates() {
        let c = load("dteday,cnt\n2011-01-02,3\n2011-01-01,4\n2011-01-02,5\nbogus,100\n");
        let totals = daily_totals(&c).unwrap();
        let totals = totals.available().unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].date, NaiveDate::from_ymd_opt(2011, 1, 1).unwrap());
        assert_eq!(totals[0].total, 4.0);
        assert_eq!(totals[1].total, 8.0);
    }

    #[test]
    fn test_daily_totals_need_a_date_axis() {
        let c = load("hr,cnt\n1,3\n");
        let totals = daily_totals(&c).unwrap();
        assert_eq!(totals.gap().unwrap().missing, vec!["dteday"]);
    }

    #[test]
    fn test_hourly_means_sorted_by_hour() {
        let c = load("hr,cnt\n2,4\n0,1\n2,8\n0,3\n");
        let means = hourly_means(&c).unwrap();
        assert_eq!(
            means.available().unwrap(),
            &vec![
                HourlyMean { hr: 0, avg_cnt: 2.0 },
                HourlyMean { hr: 2, avg_cnt: 6.0 },
            ]
        );
    }

    #[test]
    fn test_hourly_means_skip_fractional_hours() {
        let c = load("hr,cnt\n1.5,100\n1,2\n1,4\n");
        let means = hourly_means(&c).unwrap();
        assert_eq!(
            means.available().unwrap(),
            &vec![HourlyMean { hr: 1, avg_cnt: 3.0 }]
        );
    }

    #[test]
    fn test_month_hour_grid_leaves_unobserved_cells_empty() {
        let c = load("mnth,hr,cnt\n1,0,2\n1,1,4\n2,1,6\n2,1,8\n");
        let grid = month_hour_grid(&c).unwrap();
        let grid = grid.available().unwrap();
        assert_eq!(grid.months, vec![1, 2]);
        assert_eq!(grid.hours, vec![0, 1]);
        assert_eq!(grid.values[0], vec![Some(2.0), Some(4.0)]);
        assert_eq!(grid.values[1], vec![None, Some(7.0)]);
        assert_eq!(grid.max(), Some(7.0));
    }
}
