//! Baseline regressors for the target.
//!
//! Both baselines see the same preprocessed matrices. Ridge is the primary
//! model reported in `metrics.txt`; the comparison table ranks every model by
//! RMSE on the held-out rows.

pub mod features;
pub mod forest;
pub mod metrics;
pub mod ridge;
pub mod split;
pub mod tree;

use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzers::types::Availability;
use crate::config::PipelineConfig;
use crate::error::{ModelError, ModelResult, SchemaGap};
use crate::loader::{Capability, CleanTable};
use crate::frame::f64_values;
use features::Preprocessor;
use forest::RandomForest;
use ridge::Ridge;
use split::{SplitPolicy, train_test_split};

pub trait Regressor: Send + Sync {
    /// Short name used in the comparison table.
    fn name(&self) -> &'static str;
    /// Name with hyper-parameters, for human-readable output.
    fn label(&self) -> String;
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> ModelResult<()>;
    fn predict(&self, x: &Array2<f64>) -> ModelResult<Array1<f64>>;
}

pub(crate) fn check_rows(x: &Array2<f64>, y: &Array1<f64>) -> ModelResult<()> {
    if x.nrows() != y.len() {
        return Err(ModelError::Shape {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub model: String,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineReport {
    pub train_size: usize,
    pub test_size: usize,
    pub policy: SplitPolicy,
    /// Label of the primary model, e.g. `Ridge(alpha=1.0)`.
    pub primary_label: String,
    pub primary: ModelScore,
    /// Every model, ascending by RMSE.
    pub comparison: Vec<ModelScore>,
}

fn target_values(values: &[Option<f64>], name: &str, rows: &[usize]) -> ModelResult<Array1<f64>> {
    rows.iter()
        .map(|&r| {
            values.get(r).copied().flatten().ok_or_else(|| ModelError::Shape {
                expected: format!("numeric '{name}' at row {r}"),
                actual: "missing".to_string(),
            })
        })
        .collect()
}

/// Fits both baselines and scores them on the held-out split.
///
/// Uses a chronological split when the table has a usable date axis and a
/// seeded shuffle otherwise. A missing target or an empty side of the split
/// skips modeling without failing the run.
#[tracing::instrument(skip_all, fields(level = %cfg.level))]
pub fn run_baselines(
    clean: &CleanTable,
    cfg: &PipelineConfig,
) -> ModelResult<Availability<BaselineReport>> {
    const OUTPUT: &str = "baseline models";

    if let Err(gap) = clean.manifest.require(OUTPUT, &[Capability::Target]) {
        info!("{gap}");
        return Ok(Availability::Unavailable(gap));
    }
    let Some(target) = clean.target() else {
        return Ok(Availability::Unavailable(SchemaGap::no_rows(OUTPUT)));
    };

    let mc = &cfg.model;
    let policy = if clean.manifest.has(Capability::DateAxis) {
        SplitPolicy::Chronological
    } else {
        SplitPolicy::Shuffled { seed: mc.seed }
    };
    let split = train_test_split(clean.n_rows(), policy, mc.train_fraction);
    if split.train.is_empty() || split.test.is_empty() {
        warn!(
            train = split.train.len(),
            test = split.test.len(),
            "Not enough rows to train and evaluate, skipping models"
        );
        return Ok(Availability::Unavailable(SchemaGap::no_rows(OUTPUT)));
    }

    let pre = Preprocessor::fit(&clean.frame, &split.train, cfg)?;
    let x_train = pre.transform(&clean.frame, &split.train)?;
    let x_test = pre.transform(&clean.frame, &split.test)?;
    let y = f64_values(&clean.frame, target)?;
    let y_train = target_values(&y, target, &split.train)?;
    let y_test = target_values(&y, target, &split.test)?;
    info!(
        ?policy,
        train = split.train.len(),
        test = split.test.len(),
        features = pre.n_outputs(),
        "Design matrices ready"
    );

    let mut models: Vec<Box<dyn Regressor>> = vec![
        Box::new(Ridge::new(mc.ridge_alpha)),
        Box::new(RandomForest::new(mc.forest_trees, mc.seed).with_max_depth(mc.forest_max_depth)),
    ];

    let mut scores = Vec::with_capacity(models.len());
    for model in models.iter_mut() {
        model.fit(&x_train, &y_train)?;
        let predicted = model.predict(&x_test)?;
        let score = ModelScore {
            model: model.name().to_string(),
            rmse: metrics::rmse(&y_test, &predicted),
            r2: metrics::r2(&y_test, &predicted),
        };
        info!(model = %model.label(), rmse = score.rmse, r2 = score.r2, "Model scored");
        scores.push(score);
    }

    let primary = scores[0].clone();
    let primary_label = models[0].label();
    let mut comparison = scores;
    comparison.sort_by(|a, b| a.rmse.total_cmp(&b.rmse));

    Ok(Availability::Available(BaselineReport {
        train_size: split.train.len(),
        test_size: split.test.len(),
        policy,
        primary_label,
        primary,
        comparison,
    }))
}
