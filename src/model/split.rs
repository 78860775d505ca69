use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// How rows are divided between training and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Leading rows in file order train, trailing rows test.
    Chronological,
    /// Seeded random permutation.
    Shuffled { seed: u64 },
}

/// Row indices of each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of training rows: `floor(n * train_fraction)`.
pub fn train_len(n: usize, train_fraction: f64) -> usize {
    // Products like 0.8 * n can land just below the integer they denote.
    let raw = (n as f64 * train_fraction.clamp(0.0, 1.0) + 1e-9).floor() as usize;
    raw.min(n)
}

pub fn train_test_split(n: usize, policy: SplitPolicy, train_fraction: f64) -> Split {
    let n_train = train_len(n, train_fraction);
    match policy {
        SplitPolicy::Chronological => Split {
            train: (0..n_train).collect(),
            test: (n_train..n).collect(),
        },
        SplitPolicy::Shuffled { seed } => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut perm: Vec<usize> = (0..n).collect();
            perm.shuffle(&mut rng);
            let test = perm.split_off(n_train);
            Split { train: perm, test }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chronological_takes_leading_rows() {
        for n in [1, 5, 10, 17, 731] {
            let split = train_test_split(n, SplitPolicy::Chronological, 0.8);
            let expected = n * 4 / 5;
            assert_eq!(split.train, (0..expected).collect::<Vec<_>>());
            assert_eq!(split.test, (expected..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_shuffled_is_a_seeded_partition() {
        let a = train_test_split(50, SplitPolicy::Shuffled { seed: 42 }, 0.8);
        let b = train_test_split(50, SplitPolicy::Shuffled { seed: 42 }, 0.8);
        assert_eq!(a, b);
        assert_eq!(a.train.len(), 40);
        assert_eq!(a.test.len(), 10);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_tiny_inputs_can_leave_a_side_empty() {
        let split = train_test_split(1, SplitPolicy::Chronological, 0.8);
        assert!(split.train.is_empty());
        assert_eq!(split.test, vec![0]);
    }
}
