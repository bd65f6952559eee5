//! # Search strategies
//!
//! The search stage runs before the poll at every iteration and may propose
//! candidates by any means. When it reports [`Success::Improved`], the poll
//! is skipped for that iteration.
//!
//! - [`NoSearch`] - default, evaluates nothing and leaves the incumbent unchanged
//! - [`RandomSearch`] - evaluates a few random mesh points around the incumbent
//!
//! Strategies are stateless configuration objects stored as
//! `Box<dyn SearchStrategy>` in the solver configuration. They are
//! serialized with `typetag` so that a configured search travels with it.
use crate::acceptance::Acceptance;
use crate::errors::Result;
use crate::types::Success;

use dyn_clonable::*;
use ndarray::Array1;
use ndarray_rand::rand::Rng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Objective access given to search strategies, in canonical coordinates
pub trait Evaluator {
    /// Whether `x` satisfies every constraint
    fn is_feasible(&self, x: &Array1<f64>) -> bool;

    /// Objective value at `x`, counted against the evaluation budget
    fn evaluate(&mut self, x: &Array1<f64>) -> Result<f64>;

    /// Project `x` into the canonical domain
    fn clamp(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Judge the evaluation `(x, y)` against the incumbent, returning the
    /// outcome with the resulting incumbent and its value.
    /// Defaults to the plain strict comparison.
    fn accept(
        &mut self,
        x: &Array1<f64>,
        y: f64,
        incumbent: &Array1<f64>,
        value: f64,
    ) -> Result<(Success, Array1<f64>, f64)> {
        Acceptance::Plain.evaluate(x, y, incumbent, value, 0.)
    }
}

/// A trait for the search stage of a MADS iteration.
#[clonable]
#[typetag::serde(tag = "type_search_strategy")]
pub trait SearchStrategy: Clone + Sync + Send + Debug {
    /// Returns the name of this strategy.
    fn name(&self) -> &str;

    /// Propose a new incumbent.
    ///
    /// Evaluated candidates are judged with [`Evaluator::accept`]. Returns
    /// the resulting incumbent, its value and the outcome code.
    fn search(
        &self,
        evaluator: &mut dyn Evaluator,
        incumbent: &Array1<f64>,
        value: f64,
        mesh_size: f64,
        rng: &mut Xoshiro256Plus,
    ) -> Result<(Array1<f64>, f64, Success)>;
}

/// Search stage doing nothing
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NoSearch;

#[typetag::serde]
impl SearchStrategy for NoSearch {
    fn name(&self) -> &str {
        "NoSearch"
    }

    fn search(
        &self,
        _evaluator: &mut dyn Evaluator,
        incumbent: &Array1<f64>,
        value: f64,
        _mesh_size: f64,
        _rng: &mut Xoshiro256Plus,
    ) -> Result<(Array1<f64>, f64, Success)> {
        Ok((incumbent.to_owned(), value, Success::Neutral))
    }
}

/// Search stage evaluating `n_points` random mesh points within `radius`
/// mesh steps of the incumbent, stopping on the first improvement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomSearch {
    /// Number of trial points per iteration
    pub n_points: usize,
    /// Largest offset along each component, in mesh steps
    pub radius: i64,
}

impl Default for RandomSearch {
    fn default() -> Self {
        RandomSearch {
            n_points: 1,
            radius: 4,
        }
    }
}

impl RandomSearch {
    /// Sets the number of trial points per iteration.
    pub fn n_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    /// Sets the largest offset along each component, in mesh steps.
    pub fn radius(mut self, radius: i64) -> Self {
        self.radius = radius.max(1);
        self
    }
}

#[typetag::serde]
impl SearchStrategy for RandomSearch {
    fn name(&self) -> &str {
        "RandomSearch"
    }

    fn search(
        &self,
        evaluator: &mut dyn Evaluator,
        incumbent: &Array1<f64>,
        value: f64,
        mesh_size: f64,
        rng: &mut Xoshiro256Plus,
    ) -> Result<(Array1<f64>, f64, Success)> {
        let mut current = (incumbent.to_owned(), value);
        let mut outcome = Success::Failed;
        for _ in 0..self.n_points {
            let step = incumbent.mapv(|_| rng.gen_range(-self.radius..=self.radius) as f64);
            let candidate = evaluator.clamp(&(incumbent + &(step * mesh_size)));
            if candidate == *incumbent || !evaluator.is_feasible(&candidate) {
                continue;
            }
            let y = evaluator.evaluate(&candidate)?;
            let (success, x, v) = evaluator.accept(&candidate, y, &current.0, current.1)?;
            if success == Success::Improved {
                return Ok((x, v, success));
            }
            if success == Success::Neutral {
                outcome = Success::Neutral;
            }
            current = (x, v);
        }
        Ok((current.0, current.1, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;

    struct Sphere {
        n_evals: usize,
    }

    impl Evaluator for Sphere {
        fn is_feasible(&self, _x: &Array1<f64>) -> bool {
            true
        }

        fn evaluate(&mut self, x: &Array1<f64>) -> Result<f64> {
            self.n_evals += 1;
            Ok(x.dot(x))
        }

        fn clamp(&self, x: &Array1<f64>) -> Array1<f64> {
            x.mapv(|v| v.clamp(-1., 1.))
        }
    }

    #[test]
    fn test_no_search() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut sphere = Sphere { n_evals: 0 };
        let (x, y, code) = NoSearch
            .search(&mut sphere, &array![0.5, 0.5], 0.5, 0.25, &mut rng)
            .unwrap();
        assert_eq!(x, array![0.5, 0.5]);
        assert_eq!(y, 0.5);
        assert_eq!(code, Success::Neutral);
        assert_eq!(sphere.n_evals, 0);
    }

    #[test]
    fn test_random_search_finds_improvement() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut sphere = Sphere { n_evals: 0 };
        let search = RandomSearch::default().n_points(50).radius(2);
        let (x, y, code) = search
            .search(&mut sphere, &array![0.5, 0.5], 0.5, 0.25, &mut rng)
            .unwrap();
        assert_eq!(code, Success::Improved);
        assert!(y < 0.5);
        assert_eq!(y, x.dot(&x));
        assert!(sphere.n_evals <= 50);
    }

    struct Rejecting {
        n_evals: usize,
        n_judged: usize,
    }

    impl Evaluator for Rejecting {
        fn is_feasible(&self, _x: &Array1<f64>) -> bool {
            true
        }

        fn evaluate(&mut self, _x: &Array1<f64>) -> Result<f64> {
            self.n_evals += 1;
            Ok(0.)
        }

        fn clamp(&self, x: &Array1<f64>) -> Array1<f64> {
            x.mapv(|v| v.clamp(-1., 1.))
        }

        fn accept(
            &mut self,
            _x: &Array1<f64>,
            _y: f64,
            incumbent: &Array1<f64>,
            value: f64,
        ) -> Result<(Success, Array1<f64>, f64)> {
            self.n_judged += 1;
            Ok((Success::Failed, incumbent.to_owned(), value + 1.))
        }
    }

    #[test]
    fn test_random_search_judges_every_evaluation() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut evaluator = Rejecting {
            n_evals: 0,
            n_judged: 0,
        };
        let search = RandomSearch::default().n_points(10);
        let (x, y, code) = search
            .search(&mut evaluator, &array![0.5, 0.5], 1., 0.25, &mut rng)
            .unwrap();
        assert_eq!(code, Success::Failed);
        assert_eq!(x, array![0.5, 0.5]);
        assert!(evaluator.n_evals > 0);
        assert_eq!(evaluator.n_judged, evaluator.n_evals);
        // the incumbent value reported by the rule is carried over
        assert_eq!(y, 1. + evaluator.n_judged as f64);
    }

    #[test]
    fn test_search_strategy_serialization() {
        let search: Box<dyn SearchStrategy> = Box::new(RandomSearch::default().n_points(3));
        let json = serde_json::to_string(&search).unwrap();
        assert!(json.contains("\"type_search_strategy\":\"RandomSearch\""));
        let back: Box<dyn SearchStrategy> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "RandomSearch");
    }
}
