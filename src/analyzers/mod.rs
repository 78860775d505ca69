//! Descriptive aggregates over the cleaned table.
//!
//! Every aggregate declares the columns it needs against the
//! [`ColumnManifest`](crate::loader::ColumnManifest) and comes back as
//! [`Availability::Unavailable`] when they are missing, so a day-level run
//! simply produces fewer outputs.

pub mod aggregate;
pub mod daytype;
pub mod summary;
pub mod types;

use polars::prelude::PolarsResult;
use tracing::info;

use crate::loader::CleanTable;
use daytype::PEAK_HOURS_PER_DAY_TYPE;
use types::{
    Availability, CategorySummary, DailyTotal, DayTypeHourMean, HourlyMean, MonthHourGrid,
};

/// All aggregates of one run.
#[derive(Debug, Clone)]
pub struct Aggregates {
    pub daily: Availability<Vec<DailyTotal>>,
    pub hourly: Availability<Vec<HourlyMean>>,
    pub month_hour: Availability<MonthHourGrid>,
    /// Mean per (day type, hour) over all hours.
    pub day_type_profile: Availability<Vec<DayTypeHourMean>>,
    pub peak_hours: Availability<Vec<DayTypeHourMean>>,
    pub summary: Availability<CategorySummary>,
}

#[tracing::instrument(skip_all, fields(rows = clean.n_rows()))]
pub fn compute_aggregates(clean: &CleanTable) -> PolarsResult<Aggregates> {
    let profile = daytype::day_type_hour_profile(clean)?;
    let peak_hours = match &profile {
        Availability::Available(p) => {
            Availability::Available(daytype::peak_hours(p, PEAK_HOURS_PER_DAY_TYPE)?)
        }
        Availability::Unavailable(gap) => Availability::Unavailable(gap.clone()),
    };

    let aggregates = Aggregates {
        daily: aggregate::daily_totals(clean)?,
        hourly: aggregate::hourly_means(clean)?,
        month_hour: aggregate::month_hour_grid(clean)?,
        day_type_profile: profile,
        peak_hours,
        summary: summary::category_summary(clean)?,
    };

    for gap in [
        aggregates.daily.gap(),
        aggregates.hourly.gap(),
        aggregates.month_hour.gap(),
        aggregates.peak_hours.gap(),
        aggregates.summary.gap(),
    ]
    .into_iter()
    .flatten()
    {
        info!(output = gap.output, missing = ?gap.missing, "{gap}");
    }

    Ok(aggregates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::loader::clean;
    use crate::parser::parse_csv;

    #[test]
    fn test_day_level_columns_only() {
        let csv = "dteday,season,cnt\n2011-01-01,1,5\n2011-01-02,1,7\n";
        let t = parse_csv(csv.as_bytes()).unwrap();
        let c = clean(t, &PipelineConfig::default()).unwrap();
        let a = compute_aggregates(&c).unwrap();

        assert!(a.daily.is_available());
        assert!(a.summary.is_available());
        assert!(!a.hourly.is_available());
        assert!(!a.month_hour.is_available());
        assert_eq!(a.peak_hours.gap().unwrap().missing, vec!["hr".to_string()]);
    }

    #[test]
    fn test_hour_level_produces_everything() {
        let t = parse_csv(
            "dteday,season,mnth,hr,weekday,workingday,cnt\n\
             2011-01-01,1,1,0,6,0,16\n\
             2011-01-01,1,1,1,6,0,40\n\
             2011-01-03,1,1,0,1,1,5\n"
                .as_bytes(),
        )
        .unwrap();
        let c = clean(t, &PipelineConfig::default()).unwrap();
        let a = compute_aggregates(&c).unwrap();

        assert!(a.daily.is_available());
        assert!(a.hourly.is_available());
        assert!(a.month_hour.is_available());
        let peaks = a.peak_hours.available().unwrap();
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].day_type, daytype::DayType::Weekend);
        assert_eq!(peaks[0].hr, 1);
    }
}
