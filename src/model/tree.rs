//! CART regression tree with the squared-error criterion.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Nodes live in a flat arena; children are indices into it.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    nodes: Vec<Node>,
    n_features: usize,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            nodes: Vec::new(),
            n_features: 0,
        }
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    /// Sum of squared errors of both children.
    sse: f64,
}

impl RegressionTree {
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Fits on the rows of `x` listed in `samples`; repeated indices act as
    /// sample weights, which is how bootstrap draws are passed in.
    pub fn fit_samples(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        samples: Vec<usize>,
    ) -> ModelResult<()> {
        if x.nrows() != y.len() {
            return Err(ModelError::Shape {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if samples.is_empty() {
            return Err(ModelError::Shape {
                expected: "at least one sample".to_string(),
                actual: "0 samples".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.nodes.clear();
        self.nodes.push(Node::Leaf { value: 0.0 });

        // (node slot, rows reaching it, depth)
        let mut stack = vec![(0usize, samples, 0usize)];
        while let Some((slot, rows, depth)) = stack.pop() {
            let value = rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64;

            let stop = rows.len() < self.min_samples_split
                || self.max_depth.is_some_and(|d| depth >= d)
                || rows.iter().all(|&r| y[r] == y[rows[0]]);
            let best = if stop {
                None
            } else {
                self.best_split(x, y, &rows)
            };

            let Some(best) = best else {
                self.nodes[slot] = Node::Leaf { value };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| x[[r, best.feature]] <= best.threshold);

            let left = self.nodes.len();
            self.nodes.push(Node::Leaf { value });
            let right = self.nodes.len();
            self.nodes.push(Node::Leaf { value });
            self.nodes[slot] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            };

            stack.push((right, right_rows, depth + 1));
            stack.push((left, left_rows, depth + 1));
        }

        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> ModelResult<()> {
        self.fit_samples(x, y, (0..x.nrows()).collect())
    }

    /// Scans every feature with a sorted sweep over running sums. The first
    /// feature wins among equally good splits.
    fn best_split(&self, x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> Option<Candidate> {
        let n = rows.len();
        let total_sum: f64 = rows.iter().map(|&r| y[r]).sum();
        let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<Candidate> = None;
        let mut order: Vec<usize> = rows.to_vec();

        for feature in 0..x.ncols() {
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 0..n - 1 {
                let yi = y[order[i]];
                left_sum += yi;
                left_sq += yi * yi;

                let here = x[[order[i], feature]];
                let next = x[[order[i + 1], feature]];
                if here == next {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);

                if best.as_ref().is_none_or(|b| sse < b.sse) {
                    best = Some(Candidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        sse,
                    });
                }
            }
        }

        best.filter(|b| b.sse < parent_sse - 1e-12 * parent_sse.abs().max(1.0))
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> ModelResult<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ModelError::Shape {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|r| self.predict_row(r)).collect())
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((0usize, 0usize));
        }
        while let Some((i, d)) = stack.pop() {
            deepest = deepest.max(d);
            if let Node::Split { left, right, .. } = &self.nodes[i] {
                stack.push((*left, d + 1));
                stack.push((*right, d + 1));
            }
        }
        deepest
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}
