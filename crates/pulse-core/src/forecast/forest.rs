//! Bagged regression trees over a single feature
//!
//! Each tree is grown on a bootstrap sample of the training points until
//! its leaves are pure or hold one distinct x. Splits sit at the midpoint
//! between adjacent distinct x values and minimize the summed squared error
//! of both sides. The ensemble predicts the mean of its trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Regressor;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: f64) -> f64 {
        match self {
            Self::Leaf(value) => *value,
            Self::Split {
                threshold,
                left,
                right,
            } => {
                if x <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn sse(points: &[(f64, f64)]) -> f64 {
    let m = mean(points.iter().map(|p| p.1));
    points.iter().map(|p| (p.1 - m).powi(2)).sum()
}

/// Grow a tree on points sorted by x
fn grow(points: &[(f64, f64)]) -> Node {
    let leaf = Node::Leaf(mean(points.iter().map(|p| p.1)));
    if points.len() <= 1 || points.iter().all(|p| p.1 == points[0].1) {
        return leaf;
    }

    // Candidate cut positions: every boundary between distinct x values
    let mut best: Option<(usize, f64)> = None;
    for cut in 1..points.len() {
        if points[cut].0 == points[cut - 1].0 {
            continue;
        }
        let cost = sse(&points[..cut]) + sse(&points[cut..]);
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((cut, cost));
        }
    }

    match best {
        Some((cut, _)) => Node::Split {
            threshold: (points[cut - 1].0 + points[cut].0) / 2.0,
            left: Box::new(grow(&points[..cut])),
            right: Box::new(grow(&points[cut..])),
        },
        None => leaf,
    }
}

/// Ensemble of bootstrap-trained regression trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Node>,
}

impl RandomForest {
    /// Train `n_estimators` trees on bootstrap samples drawn from a seeded RNG
    pub fn fit(points: &[(f64, f64)], n_estimators: usize, seed: u64) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Computation("cannot train on zero points".into()));
        }
        if n_estimators == 0 {
            return Err(Error::Computation("forest needs at least one tree".into()));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..n_estimators)
            .map(|_| {
                let mut sample: Vec<(f64, f64)> = (0..points.len())
                    .map(|_| points[rng.gen_range(0..points.len())])
                    .collect();
                sample.sort_by(|a, b| a.0.total_cmp(&b.0));
                grow(&sample)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl Regressor for RandomForest {
    fn predict(&self, x: f64) -> f64 {
        mean(self.trees.iter().map(|tree| tree.predict(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> Vec<(f64, f64)> {
        vec![(0.0, 10.0), (1.0, 10.0), (2.0, 50.0), (3.0, 50.0)]
    }

    #[test]
    fn test_single_tree_separates_steps() {
        let tree = grow(&steps());
        assert_eq!(tree.predict(0.5), 10.0);
        assert_eq!(tree.predict(2.5), 50.0);
        assert_eq!(tree.predict(99.0), 50.0);
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let a = RandomForest::fit(&steps(), 100, 42).unwrap();
        let b = RandomForest::fit(&steps(), 100, 42).unwrap();
        assert_eq!(a.len(), 100);
        for x in [0.0, 1.5, 4.0] {
            assert_eq!(a.predict(x), b.predict(x));
        }
    }

    #[test]
    fn test_forest_predictions_stay_within_training_range() {
        let forest = RandomForest::fit(&steps(), 50, 7).unwrap();
        for x in [-1.0, 0.0, 2.0, 10.0] {
            let y = forest.predict(x);
            assert!((10.0..=50.0).contains(&y), "prediction {} out of range", y);
        }
    }

    #[test]
    fn test_constant_target_gives_constant_forest() {
        let points = vec![(0.0, 3.0), (1.0, 3.0), (2.0, 3.0)];
        let forest = RandomForest::fit(&points, 10, 42).unwrap();
        assert_eq!(forest.predict(5.0), 3.0);
    }

    #[test]
    fn test_rejects_empty_inputs() {
        assert!(RandomForest::fit(&[], 10, 42).is_err());
        assert!(RandomForest::fit(&steps(), 0, 42).is_err());
    }
}
