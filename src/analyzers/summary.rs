use crate::analyzers::types::{Availability, CategorySummary, SummaryRow};
use crate::frame::{Key, f64_values, i64_values, key_values};
use crate::loader::{Capability, CleanTable};
use polars::prelude::*;

fn stats(target: &str) -> [Expr; 4] {
    let y = || col(target).cast(DataType::Float64);
    [
        y().count().cast(DataType::Int64).alias("n"),
        y().mean().alias("mean"),
        y().median().alias("median"),
        y().std(1).alias("std"),
    ]
}

/// Descriptive statistics of the target, grouped by the category column when
/// present and dataset-wide otherwise.
///
/// The dataset-wide row is always produced, with `n` = 0 and NaN statistics
/// when no rows survived cleaning.
pub fn category_summary(clean: &CleanTable) -> PolarsResult<Availability<CategorySummary>> {
    let m = &clean.manifest;
    if let Err(gap) = m.require("summary", &[Capability::Target]) {
        return Ok(Availability::Unavailable(gap));
    }
    let target = m.column_name(Capability::Target);
    let frame = clean.frame.clone().lazy();

    if !m.has(Capability::Category) {
        let out = frame.select(stats(target)).collect()?;
        // A select of aggregates yields one row, even over an empty frame.
        let rows = describe(&out, vec![None])?;
        return Ok(Availability::Available(CategorySummary { column: None, rows }));
    }

    let category = m.column_name(Capability::Category);
    let out = frame
        .filter(col(category).is_not_null())
        .group_by([col(category)])
        .agg(stats(target))
        .sort_by_exprs([col(category)], SortMultipleOptions::default())
        .collect()?;
    let keys = key_values(&out, category)?;

    Ok(Availability::Available(CategorySummary {
        column: Some(category.to_string()),
        rows: describe(&out, keys)?,
    }))
}

fn describe(out: &DataFrame, keys: Vec<Option<Key>>) -> PolarsResult<Vec<SummaryRow>> {
    let n = i64_values(out, "n")?;
    let mean = f64_values(out, "mean")?;
    let median = f64_values(out, "median")?;
    let std = f64_values(out, "std")?;

    Ok(keys
        .into_iter()
        .zip(n)
        .zip(mean.into_iter().zip(median).zip(std))
        .map(|((category, n), ((mean, median), std))| {
            let n = n.unwrap_or(0).max(0) as usize;
            SummaryRow {
                category,
                n,
                mean: mean.unwrap_or(f64::NAN),
                median: median.unwrap_or(f64::NAN),
                std: std.filter(|s| n > 1 && s.is_finite()),
            }
        })
        .collect())
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

    fn summarize(csv: &str) -> CategorySummary {
        category_summary(&load(csv)).unwrap().available().unwrap().clone()
    }

    #[test]
    fn test_grouped_by_season() {
        let s = summarize("season,cnt\n2,10\n1,1\n1,3\n2,20\n2,30\n");

        assert_eq!(s.column.as_deref(), Some("season"));
        assert_eq!(s.rows.len(), 2);

        let winter = &s.rows[0];
        assert_eq!(winter.category, Some(Key::Int(1)));
        assert_eq!(winter.n, 2);
        assert_eq!(winter.mean, 2.0);
        assert_eq!(winter.median, 2.0);
        assert!((winter.std.unwrap() - 2.0f64.sqrt()).abs() < 1e-12);

        let spring = &s.rows[1];
        assert_eq!(spring.n, 3);
        assert_eq!(spring.median, 20.0);
        assert!((spring.std.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_row_without_category() {
        let s = summarize("hr,cnt\n0,4\n");
        assert_eq!(s.column, None);
        assert_eq!(s.rows.len(), 1);
        assert_eq!(s.rows[0].n, 1);
        assert_eq!(s.rows[0].std, None);
    }

    #[test]
    fn test_every_target_missing_still_gives_a_row() {
        let c = load("dteday,temp,cnt\n2011-01-01,0.2,\n2011-01-02,0.3,\n");
        assert_eq!(c.n_rows(), 0);

        let s = category_summary(&c).unwrap();
        let s = s.available().unwrap();
        assert_eq!(s.column, None);
        assert_eq!(s.rows.len(), 1);
        assert_eq!(s.rows[0].n, 0);
        assert!(s.rows[0].mean.is_nan());
        assert!(s.rows[0].median.is_nan());
        assert_eq!(s.rows[0].std, None);
    }

    #[test]
    fn test_missing_target_is_a_gap() {
        let c = load("season,hr\n1,0\n");
        let s = category_summary(&c).unwrap();
        assert_eq!(s.gap().unwrap().missing, vec!["cnt".to_string()]);
    }
}
