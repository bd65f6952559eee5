//! # Poll direction generators
//!
//! A generator produces, for a given mesh level, a positive spanning set of
//! integer directions which are scaled by the mesh size by the poll stage.
//!
//! - [`LtGenerator`] - randomized lower triangular basis (LTMADS), `N+1` directions
//! - [`OrthoGenerator`] - Halton seeded Householder basis (OrthoMADS), `2N`
//!   directions or `N+1` with the negative reduction
mod halton;
mod lt;
mod ortho;

pub use halton::*;
pub use lt::*;
pub use ortho::*;

use dyn_clonable::*;
use ndarray::{Array1, Array2, Axis};
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// An unscaled integer step
pub type Direction = Array1<i64>;

/// A trait for poll direction generators.
///
/// Generators may hold state across calls (memoization, counters) and are
/// owned by a single optimization run.
#[clonable]
pub trait DirectionGenerator: Clone + Debug + Send + Sync {
    /// Returns the name of this generator.
    fn name(&self) -> &str;

    /// Directions to poll at mesh level `level`
    fn generate(&mut self, level: i32, rng: &mut Xoshiro256Plus) -> DirectionSet;

    /// Notified when a poll direction got accepted, moving the incumbent
    /// from `previous` to `accepted` (canonical coordinates).
    fn record_success(&mut self, _previous: &Array1<f64>, _accepted: &Array1<f64>) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completion {
    /// Basis followed by the negated sum of its rows
    NegatedSum,
    /// Basis followed by the negation of each of its rows
    Negations,
}

/// A finite sequence of directions produced lazily from a basis given by rows.
///
/// The sequence is consumed once per poll and cannot be restarted.
#[derive(Clone, Debug)]
pub struct DirectionSet {
    basis: Array2<i64>,
    completion: Completion,
    pos: usize,
    sum: Array1<i64>,
}

impl DirectionSet {
    /// The `N` rows of `basis` then their negated sum: `N+1` directions summing to zero
    pub fn with_negated_sum(basis: Array2<i64>) -> Self {
        Self::new(basis, Completion::NegatedSum)
    }

    /// The `N` rows of `basis` then their negations: `2N` directions
    pub fn with_negations(basis: Array2<i64>) -> Self {
        Self::new(basis, Completion::Negations)
    }

    fn new(basis: Array2<i64>, completion: Completion) -> Self {
        let sum = Array1::zeros(basis.ncols());
        DirectionSet {
            basis,
            completion,
            pos: 0,
            sum,
        }
    }

    fn total(&self) -> usize {
        let n = self.basis.nrows();
        match self.completion {
            Completion::NegatedSum => n + 1,
            Completion::Negations => 2 * n,
        }
    }
}

impl Iterator for DirectionSet {
    type Item = Direction;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.basis.nrows();
        let pos = self.pos;
        if pos >= self.total() {
            return None;
        }
        self.pos += 1;
        let dir = if pos < n {
            let row = self.basis.index_axis(Axis(0), pos).to_owned();
            self.sum += &row;
            row
        } else {
            match self.completion {
                Completion::NegatedSum => -&self.sum,
                Completion::Negations => -&self.basis.index_axis(Axis(0), pos - n),
            }
        };
        Some(dir)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DirectionSet {}

/// Direction generator choice, built into a fresh [`DirectionGenerator`] per run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DirectionKind {
    /// See [`LtGenerator`]
    Lt,
    /// See [`OrthoGenerator`]
    Ortho {
        /// Whether the negative reduction is used once a displacement is known
        reduction: bool,
    },
}

impl DirectionKind {
    /// Build a fresh generator for a `dim`-dimensional problem
    pub fn build(&self, dim: usize) -> Box<dyn DirectionGenerator> {
        match self {
            DirectionKind::Lt => Box::new(LtGenerator::new(dim)),
            DirectionKind::Ortho { reduction } => {
                Box::new(OrthoGenerator::new(dim).with_reduction(*reduction))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_direction_set_negated_sum() {
        let basis = array![[1, 2], [3, -1]];
        let dirs: Vec<_> = DirectionSet::with_negated_sum(basis).collect();
        assert_eq!(dirs, vec![array![1, 2], array![3, -1], array![-4, -1]]);
    }

    #[test]
    fn test_direction_set_negations() {
        let basis = array![[1, 2], [3, -1]];
        let set = DirectionSet::with_negations(basis);
        assert_eq!(set.len(), 4);
        let dirs: Vec<_> = set.collect();
        assert_eq!(dirs[2], array![-1, -2]);
        assert_eq!(dirs[3], array![-3, 1]);
    }
}
