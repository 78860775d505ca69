use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::model::tree::RegressionTree;
use crate::model::{Regressor, check_rows};

/// Bagged regression trees. Every split considers all features.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(n_trees: usize, seed: u64) -> Self {
        Self {
            n_trees,
            max_depth: None,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// `n` row indices drawn uniformly with replacement.
fn bootstrap_sample(seed: u64, n: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

impl Regressor for RandomForest {
    fn name(&self) -> &'static str {
        "RandomForest"
    }

    fn label(&self) -> String {
        format!("RandomForest(n_estimators={})", self.n_trees)
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> ModelResult<()> {
        check_rows(x, y)?;
        let n = x.nrows();
        if n == 0 || self.n_trees == 0 {
            return Err(ModelError::Shape {
                expected: "at least one sample and one tree".to_string(),
                actual: format!("{n} samples, {} trees", self.n_trees),
            });
        }

        // Each tree owns a seed derived from its index, so the result does
        // not depend on how rayon schedules the work.
        let base_seed = self.seed;
        let max_depth = self.max_depth;
        let trees: ModelResult<Vec<RegressionTree>> = (0..self.n_trees)
            .into_par_iter()
            .map(|tree_idx| -> ModelResult<RegressionTree> {
                let samples = bootstrap_sample(base_seed.wrapping_add(tree_idx as u64), n);
                let mut tree = RegressionTree::default().with_max_depth(max_depth);
                tree.fit_samples(x, y, samples)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        debug!(
            trees = self.trees.len(),
            max_depth = self.trees.iter().map(RegressionTree::depth).max(),
            "Forest fitted"
        );
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> ModelResult<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|t| t.predict(x))
            .collect::<ModelResult<_>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for p in &per_tree {
            sum += p;
        }
        Ok(sum / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| if v < 20.0 { 10.0 } else { 50.0 });
        (x, y)
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = data();
        let mut a = RandomForest::new(8, 42);
        let mut b = RandomForest::new(8, 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.trees().len(), 8);
    }

    #[test]
    fn test_learns_a_step() {
        let (x, y) = data();
        let mut forest = RandomForest::new(16, 7);
        forest.fit(&x, &y).unwrap();
        let p = forest.predict(&array![[2.0, 2.0], [35.0, 2.0]]).unwrap();
        assert!((p[0] - 10.0).abs() < 5.0, "low side {}", p[0]);
        assert!((p[1] - 50.0).abs() < 5.0, "high side {}", p[1]);
    }

    #[test]
    fn test_predict_before_fit() {
        let forest = RandomForest::new(4, 1);
        assert!(matches!(
            forest.predict(&array![[1.0]]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_bootstrap_sample_is_seeded_and_in_range() {
        let a = bootstrap_sample(42, 7);
        assert_eq!(a, bootstrap_sample(42, 7));
        assert_ne!(a, bootstrap_sample(43, 7));
        assert!(a.iter().all(|&i| i < 7));
        assert_eq!(bootstrap_sample(9, 1), vec![0]);
    }

    #[test]
    fn test_bootstrap_sample_reaches_every_row() {
        let mut seen = [0usize; 3];
        for seed in 0..200 {
            for i in bootstrap_sample(seed, 3) {
                seen[i] += 1;
            }
        }
        // 600 draws over three rows
        assert!(seen.iter().all(|&c| (150..=250).contains(&c)), "{seen:?}");
    }
}
