//! Typed views over `polars` columns.
//!
//! Every stage reads cells through these helpers so the Int/Float/Date
//! distinctions the loader establishes are interpreted the same way
//! everywhere.

use chrono::NaiveDate;
use polars::prelude::*;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `NaiveDate::num_days_from_ce` of 1970-01-01, the epoch of polars dates.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// A grouping key. Integral numbers group as `Int`, everything else by text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::Text(s) => f.write_str(s),
        }
    }
}

pub fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

pub fn dtype_of(df: &DataFrame, name: &str) -> Option<DataType> {
    df.column(name).ok().map(|c| c.dtype().clone())
}

/// Numeric view of a column; NaN and unparseable cells become `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Integral view of a numeric column. Non-integral values become `None`.
pub fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    Ok(f64_values(df, name)?
        .into_iter()
        .map(|v| v.filter(|x| x.fract() == 0.0).map(|x| x as i64))
        .collect())
}

pub fn date_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int32)?;
    Ok(series
        .i32()?
        .into_iter()
        .map(|d| d.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_CE_DAYS)))
        .collect())
}

/// Grouping keys of a column, for integer, float and text dtypes alike.
pub fn key_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<Key>>> {
    let dtype = df.column(name)?.dtype().clone();
    if is_numeric(&dtype) {
        return Ok(f64_values(df, name)?
            .into_iter()
            .map(|v| {
                v.map(|x| {
                    if x.fract() == 0.0 {
                        Key::Int(x as i64)
                    } else {
                        Key::Text(x.to_string())
                    }
                })
            })
            .collect());
    }
    if dtype == DataType::Date {
        return Ok(date_values(df, name)?
            .into_iter()
            .map(|d| d.map(|d| Key::Text(d.format(DATE_FORMAT).to_string())))
            .collect());
    }
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|s| s.map(|s| Key::Text(s.to_string())))
        .collect())
}

/// Formats a float the way tabular tools print them: integral values keep a
/// trailing `.0`, NaN renders empty.
pub fn fmt_float(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
