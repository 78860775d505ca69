//! Feature matrix construction.
//!
//! Integer columns are treated as categorical and one-hot encoded with the
//! categories seen in the training rows; every other numeric column is
//! standardized with training statistics. Categorical blocks come first.

use ndarray::Array2;
use polars::prelude::*;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::{ModelError, ModelResult};
use crate::frame::{f64_values, i64_values};

#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    /// One indicator column per category, ascending. Unseen and missing
    /// values encode as all zeros.
    OneHot { categories: Vec<i64> },
    /// `(x - mean) / scale`; missing cells become the mean.
    Standard { mean: f64, scale: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub column: String,
    pub encoding: Encoding,
}

impl FeatureSpec {
    fn width(&self) -> usize {
        match &self.encoding {
            Encoding::OneHot { categories } => categories.len(),
            Encoding::Standard { .. } => 1,
        }
    }
}

/// Learned preprocessing, applied identically to train and test rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    specs: Vec<FeatureSpec>,
}

/// Columns eligible as model inputs, categorical first then numeric, each in
/// frame order.
pub fn feature_columns<'a>(df: &'a DataFrame, cfg: &PipelineConfig) -> Vec<&'a Column> {
    let mut categorical = Vec::new();
    let mut numeric = Vec::new();
    for col in df.get_columns() {
        let name = col.name().as_str();
        if name == cfg.target || cfg.excluded_features.iter().any(|e| e == name) {
            continue;
        }
        let dtype = col.dtype();
        if dtype.is_integer() {
            categorical.push(col);
        } else if dtype.is_float() {
            numeric.push(col);
        } else {
            warn!(column = %name, %dtype, "Non-numeric column left out of the feature set");
        }
    }
    categorical.extend(numeric);
    categorical
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    df.take(&IdxCa::from_vec("rows".into(), idx))
}

impl Preprocessor {
    pub fn fit(df: &DataFrame, rows: &[usize], cfg: &PipelineConfig) -> ModelResult<Self> {
        if rows.is_empty() {
            return Err(ModelError::Shape {
                expected: "at least one training row".to_string(),
                actual: "0 rows".to_string(),
            });
        }
        let train = take_rows(df, rows)?;

        let specs = feature_columns(&train, cfg)
            .into_iter()
            .map(|col| {
                let name = col.name().as_str();
                let encoding = if col.dtype().is_integer() {
                    let mut categories: Vec<i64> =
                        i64_values(&train, name)?.into_iter().flatten().collect();
                    categories.sort_unstable();
                    categories.dedup();
                    Encoding::OneHot { categories }
                } else {
                    let values = col.as_materialized_series().cast(&DataType::Float64)?;
                    let ca = values.f64()?;
                    let mean = ca.mean().unwrap_or(0.0);
                    let std = ca.std(0).unwrap_or(0.0);
                    Encoding::Standard {
                        mean,
                        scale: if std > 0.0 { std } else { 1.0 },
                    }
                };
                Ok(FeatureSpec {
                    column: name.to_string(),
                    encoding,
                })
            })
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[FeatureSpec] {
        &self.specs
    }

    /// Width of the encoded matrix.
    pub fn n_outputs(&self) -> usize {
        self.specs.iter().map(FeatureSpec::width).sum()
    }

    /// Encoded column names, `col=value` for indicators.
    pub fn output_names(&self) -> Vec<String> {
        self.specs
            .iter()
            .flat_map(|s| match &s.encoding {
                Encoding::OneHot { categories } => categories
                    .iter()
                    .map(|c| format!("{}={c}", s.column))
                    .collect::<Vec<_>>(),
                Encoding::Standard { .. } => vec![s.column.clone()],
            })
            .collect()
    }

    pub fn transform(&self, df: &DataFrame, rows: &[usize]) -> ModelResult<Array2<f64>> {
        let frame = take_rows(df, rows)?;
        let mut x = Array2::zeros((rows.len(), self.n_outputs()));
        let mut offset = 0;

        for spec in &self.specs {
            if frame.column(&spec.column).is_err() {
                return Err(ModelError::Shape {
                    expected: format!("column '{}'", spec.column),
                    actual: "missing".to_string(),
                });
            }

            match &spec.encoding {
                Encoding::OneHot { categories } => {
                    for (i, v) in i64_values(&frame, &spec.column)?.into_iter().enumerate() {
                        if let Some(j) = v.and_then(|v| categories.binary_search(&v).ok()) {
                            x[[i, offset + j]] = 1.0;
                        }
                    }
                }
                Encoding::Standard { mean, scale } => {
                    for (i, v) in f64_values(&frame, &spec.column)?.into_iter().enumerate() {
                        x[[i, offset]] = (v.unwrap_or(*mean) - mean) / scale;
                    }
                }
            }
            offset += spec.width();
        }

        Ok(x)
    }
}
