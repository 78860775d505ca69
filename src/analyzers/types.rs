//! Data types produced by the aggregation engine.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzers::daytype::DayType;
use crate::error::SchemaGap;
use crate::frame::Key;

/// Result of an output that depends on optional columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
    Available(T),
    Unavailable(SchemaGap),
}

impl<T> Availability<T> {
    pub fn available(&self) -> Option<&T> {
        match self {
            Availability::Available(v) => Some(v),
            Availability::Unavailable(_) => None,
        }
    }

    pub fn gap(&self) -> Option<&SchemaGap> {
        match self {
            Availability::Available(_) => None,
            Availability::Unavailable(gap) => Some(gap),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }
}

/// Total target per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
}

/// Mean target for one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyMean {
    pub hr: i64,
    pub avg_cnt: f64,
}

/// Mean target for one (day type, hour) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTypeHourMean {
    #[serde(rename = "_daytype")]
    pub day_type: DayType,
    pub hr: i64,
    pub avg_cnt: f64,
}

/// Mean target on a month × hour grid; `None` where no rows fell in a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthHourGrid {
    pub months: Vec<i64>,
    pub hours: Vec<i64>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl MonthHourGrid {
    pub fn max(&self) -> Option<f64> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .copied()
            .reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .copied()
            .reduce(f64::min)
    }
}

/// Descriptive statistics of the target, per category or dataset-wide.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub category: Option<Key>,
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    /// Name of the grouping column, `None` for the dataset-wide row.
    pub column: Option<String>,
    pub rows: Vec<SummaryRow>,
}
