use super::{DirectionGenerator, DirectionSet};

use log::debug;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::{Rng, seq::SliceRandom};
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Randomized lower triangular direction generator (LTMADS).
///
/// For each mesh level a pivot index and a pivot vector `b(l)` are drawn
/// once and memoized for the rest of the run. Each call then draws a fresh
/// lower triangular basis around it and yields `N+1` directions summing
/// to zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LtGenerator {
    dim: usize,
    pivots: HashMap<i32, (usize, Array1<i64>)>,
}

impl LtGenerator {
    /// Generator for `dim`-dimensional directions
    pub fn new(dim: usize) -> Self {
        LtGenerator {
            dim,
            pivots: HashMap::new(),
        }
    }

    /// Memoized pivot index and pivot vector of the given level
    pub fn pivot(&mut self, level: i32, rng: &mut Xoshiro256Plus) -> (usize, Array1<i64>) {
        let dim = self.dim;
        self.pivots
            .entry(level)
            .or_insert_with(|| {
                let scale = 1i64 << level;
                let index = rng.gen_range(0..dim);
                let b = Array1::from_shape_fn(dim, |k| {
                    let magnitude = if k == index { scale } else { scale - 1 };
                    random_sign(rng) * magnitude
                });
                debug!("LT pivot for level {level}: index {index}, b = {b}");
                (index, b)
            })
            .clone()
    }

    /// Random lower triangular `(N-1)x(N-1)` block with permuted rows and columns
    fn triangular_block(&self, level: i32, rng: &mut Xoshiro256Plus) -> Array2<i64> {
        let n = self.dim - 1;
        let scale = 1i64 << level;
        let lower = Array2::from_shape_fn((n, n), |(i, j)| match i.cmp(&j) {
            std::cmp::Ordering::Less => 0,
            std::cmp::Ordering::Equal => random_sign(rng) * scale,
            std::cmp::Ordering::Greater => rng.gen_range(-scale + 1..=scale - 1),
        });
        let mut rows: Vec<usize> = (0..n).collect();
        rows.shuffle(rng);
        let mut cols: Vec<usize> = (0..n).collect();
        cols.shuffle(rng);
        lower.select(Axis(0), &rows).select(Axis(1), &cols)
    }
}

fn random_sign(rng: &mut Xoshiro256Plus) -> i64 {
    if rng.gen_bool(0.5) { 1 } else { -1 }
}

impl DirectionGenerator for LtGenerator {
    fn name(&self) -> &str {
        "LT"
    }

    fn generate(&mut self, level: i32, rng: &mut Xoshiro256Plus) -> DirectionSet {
        let (index, b) = self.pivot(level, rng);
        let block = self.triangular_block(level, rng);
        let skip = |k: usize| if k < index { k } else { k - 1 };
        let basis = Array2::from_shape_fn((self.dim, self.dim), |(k, j)| {
            if k == index {
                b[j]
            } else if j == index {
                0
            } else {
                block[[skip(k), skip(j)]]
            }
        });
        DirectionSet::with_negated_sum(basis)
    }
}
